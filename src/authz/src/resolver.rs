//! The authorization resolver
//!
//! Builds the provider collections from configuration, lazily and behind
//! one lock per collection, and assembles a [`Policy`] per principal by
//! unioning provider outputs. Cached collections are tagged with the
//! options generation they were built under; a configuration update bumps
//! the generation, so the next access rebuilds from the new configuration
//! without a restart. A resolution already in flight may finish against
//! the previous collections.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::config::OptionsMonitor;
use crate::error::{AuthzError, Result};
use crate::policy::Policy;
use crate::providers::{PermissionProvider, RoleProvider};
use crate::registry::{
    ProviderContext, ProviderRegistry, DEFAULT_PERMISSION_PROVIDERS, DEFAULT_ROLE_PROVIDERS,
};
use crate::types::{NameSet, Principal};

/// A fully built provider collection, tagged with the options generation
/// it was built under. A stale tag is equivalent to "unbuilt".
struct ProviderSet<P: ?Sized> {
    generation: u64,
    providers: Arc<Vec<Arc<P>>>,
}

/// Resolves roles and permissions for principals.
pub struct AuthorizationResolver {
    monitor: OptionsMonitor,
    registry: ProviderRegistry,
    role_providers: RwLock<Option<ProviderSet<dyn RoleProvider>>>,
    permission_providers: RwLock<Option<ProviderSet<dyn PermissionProvider>>>,
}

impl AuthorizationResolver {
    /// A resolver with the built-in providers for the given context.
    pub fn new(context: &ProviderContext) -> Self {
        Self::with_registry(
            context.monitor.clone(),
            ProviderRegistry::with_built_ins(context),
        )
    }

    /// A resolver over a caller-assembled registry (built-ins plus any
    /// host-registered factories).
    pub fn with_registry(monitor: OptionsMonitor, registry: ProviderRegistry) -> Self {
        Self {
            monitor,
            registry,
            role_providers: RwLock::new(None),
            permission_providers: RwLock::new(None),
        }
    }

    /// Union the default names with the configured ones, defaults first,
    /// deduplicated case-insensitively.
    fn provider_names(defaults: &[&str], configured: &NameSet) -> Vec<String> {
        let mut seen = NameSet::new();
        let mut names = Vec::new();

        for name in defaults.iter().copied().chain(configured.iter()) {
            if seen.insert(name) {
                names.push(name.to_string());
            }
        }

        names
    }

    /// Apply the configuration-error policy to a registry failure: either
    /// escalate or skip the offending entry.
    fn handle_resolution_failure(
        &self,
        collection: &str,
        name: &str,
        err: AuthzError,
    ) -> Result<()> {
        error!(%err, provider = name, "Could not add provider to the {collection} collection.");

        if self.monitor.current().throw_configuration_exceptions {
            return Err(AuthzError::configuration(
                format!("Could not get {collection}."),
                err,
            ));
        }

        Ok(())
    }

    fn build_role_providers(&self) -> Result<Vec<Arc<dyn RoleProvider>>> {
        let options = self.monitor.current();
        let names = Self::provider_names(DEFAULT_ROLE_PROVIDERS, &options.roles.providers);
        let mut providers: Vec<Arc<dyn RoleProvider>> = Vec::with_capacity(names.len());

        for name in &names {
            match self.registry.create_role_provider(name) {
                Ok(provider) => providers.push(provider),
                Err(err) => self.handle_resolution_failure("role-providers", name, err)?,
            }
        }

        Ok(providers)
    }

    fn build_permission_providers(&self) -> Result<Vec<Arc<dyn PermissionProvider>>> {
        let options = self.monitor.current();
        let names =
            Self::provider_names(DEFAULT_PERMISSION_PROVIDERS, &options.permissions.providers);
        let mut providers: Vec<Arc<dyn PermissionProvider>> = Vec::with_capacity(names.len());

        for name in &names {
            match self.registry.create_permission_provider(name) {
                Ok(provider) => providers.push(provider),
                Err(err) => self.handle_resolution_failure("permission-providers", name, err)?,
            }
        }

        Ok(providers)
    }

    /// The current role provider collection, built on first access and
    /// rebuilt after a configuration update. Readers observe either a
    /// fully built, generation-current collection or build one themselves.
    async fn role_providers(&self) -> Result<Arc<Vec<Arc<dyn RoleProvider>>>> {
        let generation = self.monitor.generation();

        {
            let guard = self.role_providers.read().await;
            if let Some(set) = guard.as_ref() {
                if set.generation == generation {
                    return Ok(set.providers.clone());
                }
            }
        }

        let mut guard = self.role_providers.write().await;

        // Re-check under the write lock: another caller may have rebuilt
        // while we waited, and the options may have moved on again.
        let generation = self.monitor.generation();
        if let Some(set) = guard.as_ref() {
            if set.generation == generation {
                return Ok(set.providers.clone());
            }
        }

        debug!(generation, "building role-provider collection");
        let providers = Arc::new(self.build_role_providers()?);
        *guard = Some(ProviderSet {
            generation,
            providers: providers.clone(),
        });

        Ok(providers)
    }

    /// The current permission provider collection; independent of the role
    /// collection, so rebuilds of the two never block each other.
    async fn permission_providers(&self) -> Result<Arc<Vec<Arc<dyn PermissionProvider>>>> {
        let generation = self.monitor.generation();

        {
            let guard = self.permission_providers.read().await;
            if let Some(set) = guard.as_ref() {
                if set.generation == generation {
                    return Ok(set.providers.clone());
                }
            }
        }

        let mut guard = self.permission_providers.write().await;

        let generation = self.monitor.generation();
        if let Some(set) = guard.as_ref() {
            if set.generation == generation {
                return Ok(set.providers.clone());
            }
        }

        debug!(generation, "building permission-provider collection");
        let providers = Arc::new(self.build_permission_providers()?);
        *guard = Some(ProviderSet {
            generation,
            providers: providers.clone(),
        });

        Ok(providers)
    }

    /// Number of currently resolved role providers (building the
    /// collection if needed).
    pub async fn role_provider_count(&self) -> Result<usize> {
        Ok(self.role_providers().await?.len())
    }

    /// Number of currently resolved permission providers.
    pub async fn permission_provider_count(&self) -> Result<usize> {
        Ok(self.permission_providers().await?.len())
    }

    /// Compute the roles and permissions the principal holds.
    ///
    /// Every role provider runs first, in registration order; permission
    /// providers then run with the full resolved role set. A provider that
    /// fails transiently contributes nothing; only an escalated
    /// configuration failure surfaces to the caller, and the caller never
    /// sees a partially constructed policy.
    pub async fn get_policy(&self, principal: &Principal) -> Result<Policy> {
        let role_providers = self.role_providers().await?;
        let permission_providers = self.permission_providers().await?;

        let mut policy = Policy::new();

        for provider in role_providers.iter() {
            match provider.roles(principal).await {
                Ok(roles) => policy.roles.extend(roles),
                Err(err) => {
                    error!(%err, "A role-provider failed; its contribution is skipped.");
                }
            }
        }

        for provider in permission_providers.iter() {
            match provider.permissions(principal, &policy.roles).await {
                Ok(permissions) => policy.permissions.extend(permissions),
                Err(err) => {
                    error!(%err, "A permission-provider failed; its contribution is skipped.");
                }
            }
        }

        Ok(policy)
    }

    /// Whether the principal holds the named permission. Recomputes a full
    /// policy; there is no second-level caching beyond the provider
    /// collections.
    pub async fn has_permission(&self, permission: &str, principal: &Principal) -> Result<bool> {
        if permission.trim().is_empty() {
            return Err(AuthzError::InvalidArgument(
                "permission name must not be blank".to_string(),
            ));
        }

        let policy = self.get_policy(principal).await?;
        Ok(policy.has_permission(permission))
    }

    /// Whether the principal is in the named role.
    pub async fn is_in_role(&self, principal: &Principal, role: &str) -> Result<bool> {
        if role.trim().is_empty() {
            return Err(AuthzError::InvalidArgument(
                "role name must not be blank".to_string(),
            ));
        }

        let policy = self.get_policy(principal).await?;
        Ok(policy.is_in_role(role))
    }
}
