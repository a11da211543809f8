//! OS identity services behind a narrow capability trait
//!
//! The Windows role provider only ever talks to [`WindowsGroupService`].
//! On hosts with native identity services the host supplies an
//! implementation backed by them; everywhere else the provider is simply
//! not registered. [`StaticGroupDirectory`] is an in-memory implementation
//! for tests and fixed-directory deployments.

use std::collections::HashMap;

use crate::error::{AuthzError, Result};

/// An OS security identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityId {
    /// The raw identifier value (SID string).
    pub value: String,

    /// The account-domain part of the identifier. `None` marks a
    /// machine-local/well-known (built-in) group.
    pub domain: Option<String>,
}

impl SecurityId {
    pub fn new(value: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            value: value.into(),
            domain,
        }
    }

    pub fn is_built_in(&self) -> bool {
        self.domain.is_none()
    }
}

/// A native OS identity: an account name plus its group memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsIdentity {
    pub name: String,
    pub groups: Vec<SecurityId>,
}

impl OsIdentity {
    pub fn new(name: impl Into<String>, groups: Vec<SecurityId>) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }
}

/// The OS identity operations the Windows role provider needs.
pub trait WindowsGroupService: Send + Sync {
    /// Construct a fresh OS identity from a user-principal-name.
    fn identity_for_user_principal_name(&self, user_principal_name: &str) -> Result<OsIdentity>;

    /// Translate security identifiers to account display names
    /// (`DOMAIN\Name` shaped).
    fn translate(&self, ids: &[SecurityId]) -> Result<Vec<String>>;

    /// The local machine name, used to recognize machine-local accounts.
    fn machine_name(&self) -> &str;
}

/// In-memory [`WindowsGroupService`] backed by static tables.
#[derive(Debug, Clone, Default)]
pub struct StaticGroupDirectory {
    machine_name: String,
    identities: HashMap<String, OsIdentity>,
    account_names: HashMap<String, String>,
}

impl StaticGroupDirectory {
    pub fn new(machine_name: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            identities: HashMap::new(),
            account_names: HashMap::new(),
        }
    }

    /// Register an identity, keyed case-insensitively by user-principal-name.
    pub fn with_identity(mut self, user_principal_name: &str, identity: OsIdentity) -> Self {
        self.identities
            .insert(user_principal_name.to_lowercase(), identity);
        self
    }

    /// Register a SID-to-account-name translation.
    pub fn with_account_name(mut self, sid: &str, account_name: &str) -> Self {
        self.account_names
            .insert(sid.to_string(), account_name.to_string());
        self
    }
}

impl WindowsGroupService for StaticGroupDirectory {
    fn identity_for_user_principal_name(&self, user_principal_name: &str) -> Result<OsIdentity> {
        self.identities
            .get(&user_principal_name.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                AuthzError::ProviderComputation(format!(
                    "no OS identity for user-principal-name \"{user_principal_name}\""
                ))
            })
    }

    fn translate(&self, ids: &[SecurityId]) -> Result<Vec<String>> {
        ids.iter()
            .map(|id| {
                self.account_names.get(&id.value).cloned().ok_or_else(|| {
                    AuthzError::ProviderComputation(format!(
                        "security identifier \"{}\" cannot be translated",
                        id.value
                    ))
                })
            })
            .collect()
    }

    fn machine_name(&self) -> &str {
        &self.machine_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_upn_is_a_provider_computation_error() {
        let directory = StaticGroupDirectory::new("HOST");
        let error = directory
            .identity_for_user_principal_name("ghost@corp.example")
            .unwrap_err();
        assert!(matches!(error, AuthzError::ProviderComputation(_)));
    }

    #[test]
    fn translate_resolves_registered_sids() {
        let directory = StaticGroupDirectory::new("HOST")
            .with_account_name("S-1-5-21-1", "CORP\\Operators");

        let names = directory
            .translate(&[SecurityId::new("S-1-5-21-1", Some("S-1-5-21".to_string()))])
            .unwrap();
        assert_eq!(names, vec!["CORP\\Operators"]);
    }

    #[test]
    fn upn_lookup_ignores_case() {
        let directory = StaticGroupDirectory::new("HOST")
            .with_identity("alice@corp.example", OsIdentity::new("CORP\\alice", vec![]));

        assert!(directory
            .identity_for_user_principal_name("Alice@CORP.example")
            .is_ok());
    }
}
