//! Error types for the authorization resolver

use thiserror::Error;

/// The two provider capabilities a configured name can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Role,
    Permission,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Role => write!(f, "role"),
            ProviderKind::Permission => write!(f, "permission"),
        }
    }
}

/// Authorization resolver errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid input (blank permission/role/requirement names)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A configured provider name matches no registered factory
    #[error("No provider is registered under the name \"{0}\"")]
    UnknownProviderType(String),

    /// A configured provider name is registered under the other capability
    #[error("Provider \"{name}\" is not a {expected} provider")]
    ProviderTypeMismatch {
        name: String,
        expected: ProviderKind,
    },

    /// Escalated configuration failure, raised only when
    /// `throw_configuration_exceptions` is enabled
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<Box<AuthzError>>,
    },

    /// Transient provider computation failure (e.g. an OS identity lookup).
    /// Always caught at the provider boundary and degraded to an empty
    /// contribution, never surfaced from `get_policy`.
    #[error("Provider computation failed: {0}")]
    ProviderComputation(String),
}

impl AuthzError {
    /// Wrap an error as an escalated configuration failure.
    pub fn configuration(message: impl Into<String>, source: AuthzError) -> Self {
        AuthzError::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
