//! Error types for discovery domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing discovery domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryDomainError {
    /// The endpoint URL is empty after trimming.
    #[error("endpoint URL must not be empty")]
    EmptyUrl,

    /// The plugin name is empty after trimming.
    #[error("plugin name must not be empty")]
    EmptyPluginName,

    /// The plugin name is not a module identifier.
    #[error(
        "plugin name '{0}' must start with a letter and contain only letters, digits and underscores"
    )]
    InvalidPluginName(String),

    /// A rejected-URL pattern is not a valid regular expression.
    #[error("invalid rejected URL pattern '{pattern}': {reason}")]
    InvalidRejectPattern {
        /// The pattern as configured.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

/// Error returned while parsing a query state from its string form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown query state: {0}")]
pub struct ParseQueryStateError(pub String);
