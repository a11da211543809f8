//! Configuration options and the live-reload monitor
//!
//! The options object is consumed, not produced, by this crate: the host
//! deserializes it from whatever configuration source it uses and pushes
//! updates through [`OptionsMonitor::update`]. Cached provider collections
//! are tagged with the monitor generation they were built under and rebuilt
//! once the tag goes stale, which makes the provider sets and the
//! role/permission tables hot-reloadable without a restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{claim_kinds, NameSet};

/// A role definition plus the user identifiers mapped to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleMapping {
    pub name: String,

    /// The user identifiers (subjects) that map users to this role.
    pub users: NameSet,
}

/// A permission granted to any identity holding at least one listed role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionMapping {
    pub name: String,
    pub roles: NameSet,
}

/// The configuration-resident role/permission tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOptions {
    pub permissions: Vec<PermissionMapping>,
    pub roles: Vec<RoleMapping>,
}

/// Windows role provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsRolesOptions {
    /// Keep machine-local/well-known groups (those whose security
    /// identifier has no domain qualifier).
    pub built_in_roles_enabled: bool,

    /// Keep roles prefixed with the local machine name.
    pub machine_roles_enabled: bool,

    pub cache_enabled: bool,

    /// Time-to-live for cached group-to-role translations.
    pub cache_duration: Duration,
}

impl Default for WindowsRolesOptions {
    fn default() -> Self {
        Self {
            built_in_roles_enabled: false,
            machine_roles_enabled: false,
            cache_enabled: false,
            cache_duration: Duration::from_secs(15 * 60),
        }
    }
}

/// Role resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesOptions {
    /// Additional role provider names, layered on top of the defaults.
    pub providers: NameSet,

    /// Role claim kinds skipped by the default claim scan.
    pub excluded_role_claim_kinds: NameSet,

    pub windows: WindowsRolesOptions,
}

impl Default for RolesOptions {
    fn default() -> Self {
        Self {
            providers: NameSet::new(),
            excluded_role_claim_kinds: [claim_kinds::GROUP_SID].into_iter().collect(),
            windows: WindowsRolesOptions::default(),
        }
    }
}

/// Permission resolution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsOptions {
    /// Additional permission provider names, layered on top of the defaults.
    pub providers: NameSet,
}

/// The options object for the whole crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationOptions {
    /// Whether the claims re-materializing middleware is active.
    pub middleware_enabled: bool,

    /// Whether the fallback policy provider synthesizes permission policies
    /// for unknown policy names.
    pub policy_provider_enabled: bool,

    /// Escalate provider configuration failures to the caller instead of
    /// skipping the offending entry.
    pub throw_configuration_exceptions: bool,

    pub name_claim_kind: String,
    pub role_claim_kind: String,
    pub permission_claim_kind: String,

    pub permissions: PermissionsOptions,
    pub roles: RolesOptions,
    pub policy: PolicyOptions,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            middleware_enabled: true,
            policy_provider_enabled: true,
            throw_configuration_exceptions: true,
            name_claim_kind: "name".to_string(),
            role_claim_kind: "role".to_string(),
            permission_claim_kind: "permission".to_string(),
            permissions: PermissionsOptions::default(),
            roles: RolesOptions::default(),
            policy: PolicyOptions::default(),
        }
    }
}

/// Shared handle to the current options plus a generation counter.
///
/// `update` swaps the options and bumps the generation. Consumers that
/// cache anything derived from the options record the generation they read
/// and treat a changed generation as an invalidation signal. A resolution
/// already in flight may finish against the previous options; the crate
/// favors availability over atomicity of a live reload.
#[derive(Clone)]
pub struct OptionsMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    options: std::sync::RwLock<Arc<AuthorizationOptions>>,
    generation: AtomicU64,
}

impl OptionsMonitor {
    pub fn new(options: AuthorizationOptions) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                options: std::sync::RwLock::new(Arc::new(options)),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// The current options. The returned `Arc` stays coherent for the
    /// duration of one computation even if an update lands meanwhile.
    pub fn current(&self) -> Arc<AuthorizationOptions> {
        self.inner
            .options
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The generation of the current options.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Replace the options and invalidate every generation-tagged consumer.
    pub fn update(&self, options: AuthorizationOptions) {
        {
            let mut guard = self
                .inner
                .options
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = Arc::new(options);
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, "authorization options updated");
    }
}

impl Default for OptionsMonitor {
    fn default() -> Self {
        Self::new(AuthorizationOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = AuthorizationOptions::default();

        assert!(options.middleware_enabled);
        assert!(options.policy_provider_enabled);
        assert!(options.throw_configuration_exceptions);
        assert_eq!(options.name_claim_kind, "name");
        assert_eq!(options.role_claim_kind, "role");
        assert_eq!(options.permission_claim_kind, "permission");
        assert!(options.permissions.providers.is_empty());
        assert!(options.roles.providers.is_empty());
        assert!(options
            .roles
            .excluded_role_claim_kinds
            .contains(claim_kinds::GROUP_SID));
        assert!(!options.roles.windows.built_in_roles_enabled);
        assert!(!options.roles.windows.machine_roles_enabled);
        assert!(!options.roles.windows.cache_enabled);
        assert_eq!(
            options.roles.windows.cache_duration,
            Duration::from_secs(900)
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let options: AuthorizationOptions = serde_json::from_value(serde_json::json!({
            "throw_configuration_exceptions": false,
            "roles": {
                "providers": ["windows"]
            },
            "policy": {
                "roles": [
                    { "name": "Operators", "users": ["42"] }
                ]
            }
        }))
        .unwrap();

        assert!(!options.throw_configuration_exceptions);
        assert!(options.roles.providers.contains("Windows"));
        assert!(options
            .roles
            .excluded_role_claim_kinds
            .contains(claim_kinds::GROUP_SID));
        assert_eq!(options.policy.roles.len(), 1);
        assert!(options.policy.roles[0].users.contains("42"));
        assert!(options.policy.permissions.is_empty());
    }

    #[test]
    fn update_bumps_generation_and_swaps_options() {
        let monitor = OptionsMonitor::default();
        assert_eq!(monitor.generation(), 0);

        let mut options = AuthorizationOptions::default();
        options.middleware_enabled = false;
        monitor.update(options);

        assert_eq!(monitor.generation(), 1);
        assert!(!monitor.current().middleware_enabled);
    }
}
