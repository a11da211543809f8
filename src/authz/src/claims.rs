//! Claims extraction helper
//!
//! Finds user identifiers and user-principal-names in a claims principal.
//! More than one match is legal but suspicious (it usually indicates an
//! ambiguous identity), so multiple matches are logged.

use tracing::warn;

use crate::types::{claim_kinds, Claim, ClaimsPrincipal};

/// Claim kinds tried, in order, when looking for a user identifier.
const USER_IDENTIFIER_CLAIM_KINDS: &[&str] =
    &[claim_kinds::NAME_IDENTIFIER, claim_kinds::SUBJECT];

/// Claim kinds tried, in order, when looking for a user-principal-name.
const USER_PRINCIPAL_NAME_CLAIM_KINDS: &[&str] = &[claim_kinds::UPN, claim_kinds::UPN_SHORT];

/// Extracts identifier claims from principals for the providers.
#[derive(Debug, Clone, Default)]
pub struct ClaimsHelper;

impl ClaimsHelper {
    pub fn new() -> Self {
        Self
    }

    /// Every claim matching any of the given kinds, scanning kinds in
    /// order and identities in order within each kind.
    pub fn get_claims(&self, principal: &ClaimsPrincipal, kinds: &[&str]) -> Vec<Claim> {
        let mut claims = Vec::new();

        for kind in kinds {
            for identity in &principal.identities {
                claims.extend(identity.find_all(kind).cloned());
            }
        }

        if claims.len() > 1 {
            let found = claims
                .iter()
                .map(|claim| format!("{}: {}", claim.kind, claim.value))
                .collect::<Vec<_>>()
                .join(", ");
            warn!("Multiple claims were found. The following claims were found: {found}");
        }

        claims
    }

    /// User-identifier claims (name-identifier, then JWT subject).
    pub fn user_identifier_claims(&self, principal: &ClaimsPrincipal) -> Vec<Claim> {
        self.get_claims(principal, USER_IDENTIFIER_CLAIM_KINDS)
    }

    /// User-principal-name claims.
    pub fn user_principal_name_claims(&self, principal: &ClaimsPrincipal) -> Vec<Claim> {
        self.get_claims(principal, USER_PRINCIPAL_NAME_CLAIM_KINDS)
    }
}
