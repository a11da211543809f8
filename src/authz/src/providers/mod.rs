//! Provider capabilities and the shared claim-based role scan
//!
//! Each provider exposes exactly one operation. Providers must not share
//! mutable state with each other; the resolver may invoke them
//! concurrently for different principals without extra synchronization.

pub mod configuration;
pub mod windows;

pub use configuration::{ConfigurationPermissionProvider, ConfigurationRoleProvider};
pub use windows::WindowsRoleProvider;

use async_trait::async_trait;

use crate::config::AuthorizationOptions;
use crate::error::Result;
use crate::types::{NameSet, Principal};

/// Produces role names for a principal.
#[async_trait]
pub trait RoleProvider: Send + Sync {
    async fn roles(&self, principal: &Principal) -> Result<Vec<String>>;
}

/// Produces permission names for a principal, given the roles already
/// resolved for it.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn permissions(&self, principal: &Principal, roles: &NameSet) -> Result<Vec<String>>;
}

/// The default role scan shared by the role providers: collect every value
/// under each identity's role claim kind, skipping identities whose role
/// claim kind is excluded by configuration.
///
/// Non-claims-capable principals yield an empty set.
pub fn claim_roles(principal: &Principal, options: &AuthorizationOptions) -> NameSet {
    let mut roles = NameSet::new();

    let Some(claims_principal) = principal.claims() else {
        return roles;
    };

    for identity in &claims_principal.identities {
        if options
            .roles
            .excluded_role_claim_kinds
            .contains(&identity.role_claim_kind)
        {
            continue;
        }

        for claim in identity.find_all(&identity.role_claim_kind) {
            roles.insert(claim.value.clone());
        }
    }

    roles
}
