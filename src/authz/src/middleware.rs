//! Claims re-materialization at the request boundary
//!
//! Re-expresses a resolved [`Policy`](crate::policy::Policy) as claims on
//! the principal, so downstream per-request checks that only understand
//! claims see the centrally resolved roles and permissions.

use std::sync::Arc;

use tracing::debug;

use crate::config::OptionsMonitor;
use crate::error::Result;
use crate::resolver::AuthorizationResolver;
use crate::types::{Claim, ClaimsIdentity, Principal};

/// Authentication-type marker on the identity this middleware appends.
/// Its presence is also the skip guard: a principal restored from a
/// cached session ticket already carries the identity and is left alone.
pub const AUTHENTICATION_TYPE: &str = "clearance.middleware";

/// Appends resolved roles and permissions to a principal as a new
/// claims identity.
pub struct AuthorizationMiddleware {
    resolver: Arc<AuthorizationResolver>,
    monitor: OptionsMonitor,
}

impl AuthorizationMiddleware {
    pub fn new(resolver: Arc<AuthorizationResolver>, monitor: OptionsMonitor) -> Self {
        Self { resolver, monitor }
    }

    /// Resolve the policy for the principal and append it as claims.
    ///
    /// No-op for unauthenticated or non-claims principals, when disabled
    /// by configuration, or when the extended identity is already present.
    pub async fn apply(&self, principal: &mut Principal) -> Result<()> {
        let options = self.monitor.current();

        if !options.middleware_enabled {
            debug!("authorization middleware is not enabled");
            return Ok(());
        }

        if !principal.is_authenticated() {
            return Ok(());
        }

        let Some(claims_principal) = principal.claims() else {
            return Ok(());
        };

        let already_extended = claims_principal.identities.iter().any(|identity| {
            identity.authentication_type.as_deref() == Some(AUTHENTICATION_TYPE)
        });
        if already_extended {
            debug!("principal already carries resolved authorization claims");
            return Ok(());
        }

        // Claim kinds follow the first existing identity when it has any,
        // falling back to the configured kinds.
        let first = claims_principal.identities.first();
        let name_claim_kind = first
            .map(|identity| identity.name_claim_kind.clone())
            .unwrap_or_else(|| options.name_claim_kind.clone());
        let role_claim_kind = first
            .map(|identity| identity.role_claim_kind.clone())
            .unwrap_or_else(|| options.role_claim_kind.clone());

        let policy = self.resolver.get_policy(principal).await?;

        let mut identity = ClaimsIdentity::new(Some(AUTHENTICATION_TYPE.to_string()));
        identity.name_claim_kind = name_claim_kind;
        identity.role_claim_kind = role_claim_kind.clone();

        for permission in policy.permissions.iter() {
            identity
                .claims
                .push(Claim::new(options.permission_claim_kind.clone(), permission));
        }
        for role in policy.roles.iter() {
            identity
                .claims
                .push(Claim::new(role_claim_kind.clone(), role));
        }

        debug!(
            permissions = policy.permissions.len(),
            roles = policy.roles.len(),
            "appending resolved authorization claims"
        );

        if let Some(claims_principal) = principal.claims_mut() {
            claims_principal.add_identity(identity);
        }

        Ok(())
    }
}
