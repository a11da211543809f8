//! Identity and claim types consumed by the providers
//!
//! The resolver does not authenticate anybody; it receives an
//! already-authenticated [`Principal`] from the host and only reads
//! claims (and, for Windows principals, OS identities) out of it.

use serde::{Deserialize, Serialize};

use crate::platform::OsIdentity;

/// Well-known claim kinds.
pub mod claim_kinds {
    /// SOAP-style name-identifier claim kind.
    pub const NAME_IDENTIFIER: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";

    /// JWT subject claim kind.
    pub const SUBJECT: &str = "sub";

    /// SOAP-style user-principal-name claim kind.
    pub const UPN: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/upn";

    /// Short user-principal-name claim kind.
    pub const UPN_SHORT: &str = "upn";

    /// OS group-SID claim kind. Group SIDs are machine noise, not
    /// human-meaningful roles, so this kind is excluded from the default
    /// role scan.
    pub const GROUP_SID: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/groupsid";
}

/// A single name/value claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub kind: String,
    pub value: String,
}

impl Claim {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// One authenticated identity: a bag of claims plus the claim kinds that
/// carry its name and roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsIdentity {
    /// How this identity was authenticated. `None` means unauthenticated.
    pub authentication_type: Option<String>,

    /// Claim kind holding this identity's display name.
    pub name_claim_kind: String,

    /// Claim kind holding this identity's roles.
    pub role_claim_kind: String,

    pub claims: Vec<Claim>,
}

impl ClaimsIdentity {
    /// Default claim kinds, matching the JWT short names.
    pub const DEFAULT_NAME_CLAIM_KIND: &'static str = "name";
    pub const DEFAULT_ROLE_CLAIM_KIND: &'static str = "role";

    pub fn new(authentication_type: Option<String>) -> Self {
        Self {
            authentication_type,
            name_claim_kind: Self::DEFAULT_NAME_CLAIM_KIND.to_string(),
            role_claim_kind: Self::DEFAULT_ROLE_CLAIM_KIND.to_string(),
            claims: Vec::new(),
        }
    }

    pub fn with_claim(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push(Claim::new(kind, value));
        self
    }

    /// All claims of the given kind, in insertion order.
    pub fn find_all<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Claim> + 'a {
        self.claims.iter().filter(move |claim| claim.kind == kind)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication_type.is_some()
    }

    /// This identity's name, read from its name claim kind.
    pub fn name(&self) -> Option<&str> {
        self.find_all(&self.name_claim_kind)
            .next()
            .map(|claim| claim.value.as_str())
    }
}

/// A claims-capable principal: one or more identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsPrincipal {
    pub identities: Vec<ClaimsIdentity>,
}

impl ClaimsPrincipal {
    pub fn new(identities: Vec<ClaimsIdentity>) -> Self {
        Self { identities }
    }

    pub fn single(identity: ClaimsIdentity) -> Self {
        Self {
            identities: vec![identity],
        }
    }

    pub fn add_identity(&mut self, identity: ClaimsIdentity) {
        self.identities.push(identity);
    }

    /// Authenticated iff any identity is.
    pub fn is_authenticated(&self) -> bool {
        self.identities
            .iter()
            .any(ClaimsIdentity::is_authenticated)
    }
}

/// A claims principal backed by native OS identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsPrincipal {
    pub principal: ClaimsPrincipal,
    pub identities: Vec<OsIdentity>,
}

/// Any principal-like value a host may hand to the resolver.
///
/// Providers treat a non-claims-capable principal as having no roles and
/// no permissions; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// A claims-capable principal.
    Claims(ClaimsPrincipal),

    /// A claims-capable principal carrying native OS identities.
    Windows(WindowsPrincipal),

    /// A bare, non-claims-capable principal.
    Plain { name: Option<String> },
}

impl Principal {
    /// The claims-capable view of this principal, if it has one.
    pub fn claims(&self) -> Option<&ClaimsPrincipal> {
        match self {
            Principal::Claims(principal) => Some(principal),
            Principal::Windows(windows) => Some(&windows.principal),
            Principal::Plain { .. } => None,
        }
    }

    pub fn claims_mut(&mut self) -> Option<&mut ClaimsPrincipal> {
        match self {
            Principal::Claims(principal) => Some(principal),
            Principal::Windows(windows) => Some(&mut windows.principal),
            Principal::Plain { .. } => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims().is_some_and(ClaimsPrincipal::is_authenticated)
    }
}

/// Case-insensitive unique name collection with deterministic,
/// lexicographic (by case-insensitive key) enumeration order.
///
/// The first-seen casing of a name is preserved; later insertions that
/// differ only by case are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameSet {
    entries: std::collections::BTreeMap<String, String>,
}

impl NameSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Insert a name. Returns false when an equal (ignoring case) name is
    /// already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let key = Self::key(&name);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::key(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in lexicographic order of their case-insensitive key.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.insert(name);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for NameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = NameSet::new();
        set.extend(iter);
        set
    }
}

impl Serialize for NameSet {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for NameSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_set_deduplicates_case_insensitively() {
        let mut set = NameSet::new();
        assert!(set.insert("Admin"));
        assert!(!set.insert("admin"));
        assert!(!set.insert("ADMIN"));

        assert_eq!(set.len(), 1);
        assert!(set.contains("aDmIn"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["Admin"]);
    }

    #[test]
    fn name_set_iterates_sorted() {
        let set: NameSet = ["banana", "Apple", "cherry"].into_iter().collect();
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec!["Apple", "banana", "cherry"]
        );
    }

    #[test]
    fn find_all_filters_by_kind() {
        let identity = ClaimsIdentity::new(Some("test".to_string()))
            .with_claim("role", "admin")
            .with_claim("name", "alice")
            .with_claim("role", "operator");

        let roles: Vec<_> = identity
            .find_all("role")
            .map(|claim| claim.value.as_str())
            .collect();
        assert_eq!(roles, vec!["admin", "operator"]);
    }

    #[test]
    fn plain_principal_is_not_claims_capable() {
        let principal = Principal::Plain {
            name: Some("machine".to_string()),
        };
        assert!(principal.claims().is_none());
        assert!(!principal.is_authenticated());
    }

    #[test]
    fn authenticated_requires_authentication_type() {
        let anonymous = Principal::Claims(ClaimsPrincipal::single(ClaimsIdentity::new(None)));
        assert!(!anonymous.is_authenticated());

        let authenticated = Principal::Claims(ClaimsPrincipal::single(ClaimsIdentity::new(
            Some("cookie".to_string()),
        )));
        assert!(authenticated.is_authenticated());
    }
}
