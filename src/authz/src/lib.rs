//! # Clearance
//!
//! Extended role/permission authorization for authenticated identities.
//!
//! For a given principal the [`AuthorizationResolver`] aggregates the
//! outputs of a configured, pluggable set of providers into a [`Policy`]:
//! the case-insensitive sets of roles and permissions that identity holds.
//! Providers are selected by name from a compile-time
//! [`registry`](crate::registry::ProviderRegistry) of factories and are
//! hot-reloadable: updating the options through the [`OptionsMonitor`]
//! invalidates the cached provider collections without a restart.
//!
//! ## Built-in providers
//!
//! - **configuration** (role + permission, default): claim-based roles,
//!   a user-to-role table, and a role-to-permission table, all read from
//!   the options.
//! - **windows** (role): OS group membership translated to role names
//!   behind the [`platform::WindowsGroupService`] capability, with a TTL
//!   cache. Registered only when the host supplies the capability.
//!
//! ## Example
//!
//! ```rust
//! use clearance::{
//!     AuthorizationOptions, AuthorizationResolver, ClaimsIdentity, ClaimsPrincipal,
//!     OptionsMonitor, Principal, ProviderContext, claim_kinds,
//! };
//! use clearance::config::RoleMapping;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut options = AuthorizationOptions::default();
//! options.policy.roles.push(RoleMapping {
//!     name: "Operators".to_string(),
//!     users: ["42"].into_iter().collect(),
//! });
//!
//! let monitor = OptionsMonitor::new(options);
//! let resolver = AuthorizationResolver::new(&ProviderContext::new(monitor.clone()));
//!
//! let principal = Principal::Claims(ClaimsPrincipal::single(
//!     ClaimsIdentity::new(Some("cookie".to_string()))
//!         .with_claim(claim_kinds::NAME_IDENTIFIER, "42"),
//! ));
//!
//! let policy = resolver.get_policy(&principal).await?;
//! assert!(policy.is_in_role("Operators"));
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod platform;
pub mod policy;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use claims::ClaimsHelper;
pub use config::{AuthorizationOptions, OptionsMonitor};
pub use error::{AuthzError, ProviderKind, Result};
pub use handler::{PermissionHandler, PermissionPolicyProvider, PermissionRequirement, RequirementPolicy};
pub use middleware::AuthorizationMiddleware;
pub use policy::Policy;
pub use providers::{PermissionProvider, RoleProvider};
pub use registry::{ProviderContext, ProviderRegistry};
pub use resolver::AuthorizationResolver;
pub use types::{claim_kinds, Claim, ClaimsIdentity, ClaimsPrincipal, NameSet, Principal, WindowsPrincipal};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
