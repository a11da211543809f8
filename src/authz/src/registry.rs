//! Named provider factories
//!
//! The set of constructible providers is a compile-time registry of named
//! factories. Configuration selects from it by name; unknown names fail
//! with a typed error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::claims::ClaimsHelper;
use crate::config::OptionsMonitor;
use crate::error::{AuthzError, ProviderKind, Result};
use crate::platform::WindowsGroupService;
use crate::providers::{
    ConfigurationPermissionProvider, ConfigurationRoleProvider, PermissionProvider, RoleProvider,
    WindowsRoleProvider,
};
use crate::providers::windows::WindowsRoleCache;

/// Role provider names instantiated even when the configured set is empty.
pub const DEFAULT_ROLE_PROVIDERS: &[&str] = &["configuration"];

/// Permission provider names instantiated even when the configured set is
/// empty.
pub const DEFAULT_PERMISSION_PROVIDERS: &[&str] = &["configuration"];

/// Name of the built-in Windows role provider. Registered only when the
/// host supplies a [`WindowsGroupService`].
pub const WINDOWS_ROLE_PROVIDER: &str = "windows";

type RoleFactory = Arc<dyn Fn() -> Arc<dyn RoleProvider> + Send + Sync>;
type PermissionFactory = Arc<dyn Fn() -> Arc<dyn PermissionProvider> + Send + Sync>;

/// Everything the built-in provider factories close over.
#[derive(Clone)]
pub struct ProviderContext {
    pub claims_helper: ClaimsHelper,
    pub monitor: OptionsMonitor,

    /// OS identity services, when the platform has them.
    pub group_service: Option<Arc<dyn WindowsGroupService>>,

    /// Windows role cache, owned here so it outlives provider-collection
    /// rebuilds.
    pub windows_cache: Arc<WindowsRoleCache>,
}

impl ProviderContext {
    pub fn new(monitor: OptionsMonitor) -> Self {
        Self {
            claims_helper: ClaimsHelper::new(),
            monitor,
            group_service: None,
            windows_cache: Arc::new(WindowsRoleCache::new()),
        }
    }

    pub fn with_group_service(mut self, group_service: Arc<dyn WindowsGroupService>) -> Self {
        self.group_service = Some(group_service);
        self
    }
}

/// Case-insensitive registry of named provider factories.
#[derive(Default)]
pub struct ProviderRegistry {
    role: HashMap<String, RoleFactory>,
    permission: HashMap<String, PermissionFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in providers for the given context.
    pub fn with_built_ins(context: &ProviderContext) -> Self {
        let mut registry = Self::new();

        {
            let claims_helper = context.claims_helper.clone();
            let monitor = context.monitor.clone();
            registry.register_role_provider("configuration", move || {
                Arc::new(ConfigurationRoleProvider::new(
                    claims_helper.clone(),
                    monitor.clone(),
                ))
            });
        }

        {
            let monitor = context.monitor.clone();
            registry.register_permission_provider("configuration", move || {
                Arc::new(ConfigurationPermissionProvider::new(monitor.clone()))
            });
        }

        if let Some(group_service) = &context.group_service {
            let claims_helper = context.claims_helper.clone();
            let monitor = context.monitor.clone();
            let group_service = group_service.clone();
            let cache = context.windows_cache.clone();
            registry.register_role_provider(WINDOWS_ROLE_PROVIDER, move || {
                Arc::new(WindowsRoleProvider::new(
                    claims_helper.clone(),
                    monitor.clone(),
                    group_service.clone(),
                    cache.clone(),
                ))
            });
        }

        registry
    }

    pub fn register_role_provider(
        &mut self,
        name: &str,
        factory: impl Fn() -> Arc<dyn RoleProvider> + Send + Sync + 'static,
    ) {
        self.role.insert(name.to_lowercase(), Arc::new(factory));
    }

    pub fn register_permission_provider(
        &mut self,
        name: &str,
        factory: impl Fn() -> Arc<dyn PermissionProvider> + Send + Sync + 'static,
    ) {
        self.permission
            .insert(name.to_lowercase(), Arc::new(factory));
    }

    /// Resolve a configured name to a role provider instance.
    pub fn create_role_provider(&self, name: &str) -> Result<Arc<dyn RoleProvider>> {
        let key = name.to_lowercase();
        match self.role.get(&key) {
            Some(factory) => Ok(factory()),
            None if self.permission.contains_key(&key) => Err(AuthzError::ProviderTypeMismatch {
                name: name.to_string(),
                expected: ProviderKind::Role,
            }),
            None => Err(AuthzError::UnknownProviderType(name.to_string())),
        }
    }

    /// Resolve a configured name to a permission provider instance.
    pub fn create_permission_provider(&self, name: &str) -> Result<Arc<dyn PermissionProvider>> {
        let key = name.to_lowercase();
        match self.permission.get(&key) {
            Some(factory) => Ok(factory()),
            None if self.role.contains_key(&key) => Err(AuthzError::ProviderTypeMismatch {
                name: name.to_string(),
                expected: ProviderKind::Permission,
            }),
            None => Err(AuthzError::UnknownProviderType(name.to_string())),
        }
    }
}
