//! OS-group-derived roles with a TTL cache
//!
//! Translates Windows group memberships into role names. Results are
//! cached per identity with a configured time-to-live; the cache is owned
//! outside the provider instance so it survives the provider-collection
//! rebuilds a configuration reload triggers, expiring only by TTL.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::error;

use crate::claims::ClaimsHelper;
use crate::config::{OptionsMonitor, WindowsRolesOptions};
use crate::error::Result;
use crate::platform::{OsIdentity, WindowsGroupService};
use crate::types::{NameSet, Principal};

use super::{claim_roles, RoleProvider};

/// Namespace prefix keeping these keys apart from any other cache user.
const CACHE_KEY_PREFIX: &str = "clearance.windows-role-provider:";

struct CachedRoles {
    roles: NameSet,
    expires_at: Instant,
}

/// Shared TTL cache for resolved Windows roles.
///
/// Keyed by an uppercase-normalized, escape-joined identifier list. A
/// single lock guards the miss-compute-store sequence so concurrent
/// callers for the same identity perform the group translation once.
#[derive(Default)]
pub struct WindowsRoleCache {
    entries: DashMap<String, CachedRoles>,
    lock: Mutex<()>,
}

impl WindowsRoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<NameSet> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.roles.clone())
    }

    fn set(&self, key: String, roles: NameSet, ttl: std::time::Duration) {
        self.entries.insert(
            key,
            CachedRoles {
                roles,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

/// Role provider translating OS group membership into role names.
pub struct WindowsRoleProvider {
    claims_helper: ClaimsHelper,
    monitor: OptionsMonitor,
    group_service: Arc<dyn WindowsGroupService>,
    cache: Arc<WindowsRoleCache>,
}

impl WindowsRoleProvider {
    pub fn new(
        claims_helper: ClaimsHelper,
        monitor: OptionsMonitor,
        group_service: Arc<dyn WindowsGroupService>,
        cache: Arc<WindowsRoleCache>,
    ) -> Self {
        Self {
            claims_helper,
            monitor,
            group_service,
            cache,
        }
    }

    /// Escape an identifier so the joined key cannot collide: `\` and the
    /// `,` separator are `\`-escaped before joining.
    fn escape_identifier(identifier: &str) -> String {
        identifier.replace('\\', "\\\\").replace(',', "\\,")
    }

    fn cache_key(&self, principal: &Principal) -> String {
        let identifiers: Vec<String> = match principal {
            Principal::Windows(windows) => windows
                .identities
                .iter()
                .map(|identity| identity.name.clone())
                .collect(),
            _ => principal
                .claims()
                .map(|claims_principal| {
                    self.claims_helper
                        .user_principal_name_claims(claims_principal)
                        .into_iter()
                        .map(|claim| claim.value)
                        .collect()
                })
                .unwrap_or_default(),
        };

        let joined = identifiers
            .iter()
            .map(|identifier| Self::escape_identifier(identifier))
            .collect::<Vec<_>>()
            .join(",");

        format!("{CACHE_KEY_PREFIX}{joined}").to_uppercase()
    }

    /// Group-to-role translation with the configured filtering rules.
    fn windows_roles(&self, identity: &OsIdentity, options: &WindowsRolesOptions) -> Result<NameSet> {
        let mut groups = identity.groups.clone();

        if !options.built_in_roles_enabled {
            groups.retain(|group| !group.is_built_in());
        }

        let machine_prefix = format!("{}\\", self.group_service.machine_name()).to_lowercase();
        let mut roles = NameSet::new();

        for name in self.group_service.translate(&groups)? {
            if !options.machine_roles_enabled && name.to_lowercase().starts_with(&machine_prefix) {
                continue;
            }
            roles.insert(name);
        }

        Ok(roles)
    }

    fn uncached_roles(&self, principal: &Principal) -> Result<NameSet> {
        let options = self.monitor.current();
        let windows_options = &options.roles.windows;

        if let Principal::Windows(windows) = principal {
            let mut roles = NameSet::new();
            for identity in &windows.identities {
                roles.extend(self.windows_roles(identity, windows_options)?.iter().map(str::to_string));
            }
            return Ok(roles);
        }

        // Not a native OS principal: fall back to the claim-based roles,
        // plus the groups of a fresh OS identity per user-principal-name.
        let mut roles = claim_roles(principal, &options);

        let Some(claims_principal) = principal.claims() else {
            return Ok(roles);
        };

        for claim in self.claims_helper.user_principal_name_claims(claims_principal) {
            let user_principal_name = claim.value.as_str();

            let resolved = self
                .group_service
                .identity_for_user_principal_name(user_principal_name)
                .and_then(|identity| self.windows_roles(&identity, windows_options));

            match resolved {
                Ok(windows_roles) => {
                    roles.extend(windows_roles.iter().map(str::to_string));
                }
                Err(err) => {
                    error!(
                        %err,
                        "Could not get windows-roles for user-principal-name \"{user_principal_name}\"."
                    );
                }
            }
        }

        Ok(roles)
    }
}

#[async_trait]
impl RoleProvider for WindowsRoleProvider {
    async fn roles(&self, principal: &Principal) -> Result<Vec<String>> {
        if principal.claims().is_none() {
            return Ok(Vec::new());
        }

        let options = self.monitor.current();

        if !options.roles.windows.cache_enabled {
            let roles = self.uncached_roles(principal)?;
            return Ok(roles.iter().map(str::to_string).collect());
        }

        let cache_key = self.cache_key(principal);

        let roles = match self.cache.get(&cache_key) {
            Some(roles) => roles,
            None => {
                let _guard = self.cache.lock.lock().await;

                // Another caller may have filled the entry while we waited.
                match self.cache.get(&cache_key) {
                    Some(roles) => roles,
                    None => {
                        let roles = self.uncached_roles(principal).unwrap_or_else(|err| {
                            error!(%err, "Could not get windows-roles for cache-key \"{cache_key}\".");
                            NameSet::new()
                        });

                        self.cache.set(
                            cache_key,
                            roles.clone(),
                            options.roles.windows.cache_duration,
                        );
                        roles
                    }
                }
            }
        };

        Ok(roles.iter().map(str::to_string).collect())
    }
}
