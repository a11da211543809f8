//! Providers backed by the configuration tables

use async_trait::async_trait;
use tracing::warn;

use crate::claims::ClaimsHelper;
use crate::config::OptionsMonitor;
use crate::error::Result;
use crate::types::{NameSet, Principal};

use super::{claim_roles, PermissionProvider, RoleProvider};

/// Role provider reading the claim-based roles plus the configured
/// user-to-role table.
pub struct ConfigurationRoleProvider {
    claims_helper: ClaimsHelper,
    monitor: OptionsMonitor,
}

impl ConfigurationRoleProvider {
    pub fn new(claims_helper: ClaimsHelper, monitor: OptionsMonitor) -> Self {
        Self {
            claims_helper,
            monitor,
        }
    }
}

#[async_trait]
impl RoleProvider for ConfigurationRoleProvider {
    async fn roles(&self, principal: &Principal) -> Result<Vec<String>> {
        let options = self.monitor.current();
        let mut roles = claim_roles(principal, &options);

        if let Some(claims_principal) = principal.claims() {
            for claim in self.claims_helper.user_identifier_claims(claims_principal) {
                let user_identifier = claim.value.as_str();

                if user_identifier.trim().is_empty() {
                    warn!(
                        claim_kind = %claim.kind,
                        "The user-identifier value, \"{user_identifier}\", is invalid. The user-identifier is ignored."
                    );
                    continue;
                }

                for role in &options.policy.roles {
                    if role.users.contains(user_identifier) {
                        roles.insert(role.name.clone());
                    }
                }
            }
        }

        Ok(roles.iter().map(str::to_string).collect())
    }
}

/// Permission provider reading the configured role-to-permission table.
///
/// A pure function of (configuration, roles): it never re-derives roles
/// itself.
pub struct ConfigurationPermissionProvider {
    monitor: OptionsMonitor,
}

impl ConfigurationPermissionProvider {
    pub fn new(monitor: OptionsMonitor) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl PermissionProvider for ConfigurationPermissionProvider {
    async fn permissions(&self, principal: &Principal, roles: &NameSet) -> Result<Vec<String>> {
        if principal.claims().is_none() {
            return Ok(Vec::new());
        }

        let options = self.monitor.current();
        let mut permissions = NameSet::new();

        for permission in &options.policy.permissions {
            if permission.roles.iter().any(|role| roles.contains(role)) {
                permissions.insert(permission.name.clone());
            }
        }

        Ok(permissions.iter().map(str::to_string).collect())
    }
}
