//! The resolved policy value returned by the resolver

use serde::Serialize;

use crate::types::NameSet;

/// The roles and permissions one identity holds at one point in time.
///
/// A `Policy` is assembled fresh per resolution call and never mutated
/// after the resolver returns it; the caller owns it exclusively. Both
/// collections are case-insensitive and enumerate in deterministic
/// lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Policy {
    pub roles: NameSet,
    pub permissions: NameSet,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive role membership test.
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Case-insensitive permission test.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_tests_ignore_case() {
        let mut policy = Policy::new();
        policy.roles.insert("Administrators");
        policy.permissions.insert("Orders.Read");

        assert!(policy.is_in_role("administrators"));
        assert!(policy.has_permission("ORDERS.READ"));
        assert!(!policy.has_permission("orders.write"));
    }
}
