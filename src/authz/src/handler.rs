//! Permission requirements, their handler, and the fallback policy provider

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::OptionsMonitor;
use crate::error::{AuthzError, Result};
use crate::resolver::AuthorizationResolver;
use crate::types::Principal;

/// A requirement that the current principal holds one named permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequirement {
    pub name: String,
}

impl PermissionRequirement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A named policy: the requirements an access check must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementPolicy {
    pub requirements: Vec<PermissionRequirement>,
}

impl RequirementPolicy {
    pub fn with_requirement(requirement: PermissionRequirement) -> Self {
        Self {
            requirements: vec![requirement],
        }
    }
}

/// Evaluates a [`PermissionRequirement`] against the resolver.
///
/// Succeeds the requirement iff the principal holds the permission;
/// otherwise the requirement is left unsatisfied and the host's access
/// check rejects by default.
pub struct PermissionHandler {
    resolver: Arc<AuthorizationResolver>,
}

impl PermissionHandler {
    pub fn new(resolver: Arc<AuthorizationResolver>) -> Self {
        Self { resolver }
    }

    pub async fn handle(
        &self,
        requirement: &PermissionRequirement,
        principal: &Principal,
    ) -> Result<bool> {
        if requirement.name.trim().is_empty() {
            return Err(AuthzError::InvalidArgument(
                "requirement name must not be blank".to_string(),
            ));
        }

        self.resolver
            .has_permission(&requirement.name, principal)
            .await
    }
}

/// Named-policy lookup with permission fallback.
///
/// Wraps the host's table of named requirement policies. When the base
/// lookup misses and the extended behavior is enabled, a policy requiring
/// just the requested name is synthesized, so attribute-style checks
/// against arbitrary permission names always resolve to some policy.
pub struct PermissionPolicyProvider {
    monitor: OptionsMonitor,
    policies: HashMap<String, RequirementPolicy>,
}

impl PermissionPolicyProvider {
    pub fn new(monitor: OptionsMonitor) -> Self {
        Self {
            monitor,
            policies: HashMap::new(),
        }
    }

    /// Register a host-defined named policy. Names compare
    /// case-insensitively.
    pub fn with_policy(mut self, name: &str, policy: RequirementPolicy) -> Self {
        self.policies.insert(name.to_lowercase(), policy);
        self
    }

    pub fn get_policy(&self, name: &str) -> Option<RequirementPolicy> {
        if let Some(policy) = self.policies.get(&name.to_lowercase()) {
            return Some(policy.clone());
        }

        let options = self.monitor.current();
        if !options.policy_provider_enabled {
            return None;
        }

        debug!(policy = name, "no named policy found; synthesizing a permission requirement");
        Some(RequirementPolicy::with_requirement(PermissionRequirement::new(name)))
    }
}
