//! Configuration for a discovery session.

use crate::discovery::domain::{QueryOptions, SecurityConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while loading or validating a [`DiscoveryConfig`].
#[derive(Debug, Error)]
pub enum DiscoveryConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid discovery configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A concurrency limit of zero would never run a query.
    #[error("max_concurrent_queries must be greater than 0")]
    ZeroConcurrency,
}

/// Settings for one orchestrator session.
///
/// # Examples
///
/// ```
/// use gridscout::discovery::services::DiscoveryConfig;
///
/// let config = DiscoveryConfig::from_json_str(
///     r#"{ "one_success_suffices": true, "options": { "rejected_urls": ["\\.example\\.org"] } }"#,
/// )
/// .expect("valid configuration");
/// assert!(config.one_success_suffices);
/// assert!(config.options.is_recursive());
/// assert_eq!(config.max_concurrent_queries, None);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Credential bundle handed to every plugin call.
    pub security: SecurityConfig,
    /// Plugin selection and recursion options.
    pub options: QueryOptions,
    /// Complete the session at the first successful query.
    pub one_success_suffices: bool,
    /// Upper bound on concurrently running plugin calls; `None` is unbounded.
    pub max_concurrent_queries: Option<usize>,
}

impl DiscoveryConfig {
    /// Creates the default configuration: wait for all, unbounded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryConfigError::Parse`] for malformed JSON or invalid
    /// rejected-URL patterns, and validation errors from
    /// [`DiscoveryConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, DiscoveryConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the security bundle.
    #[must_use]
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Sets the query options.
    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Enables or disables completing at the first success.
    #[must_use]
    pub const fn with_one_success_suffices(mut self, one_success_suffices: bool) -> Self {
        self.one_success_suffices = one_success_suffices;
        self
    }

    /// Bounds the number of concurrently running plugin calls.
    #[must_use]
    pub const fn with_max_concurrent_queries(mut self, limit: usize) -> Self {
        self.max_concurrent_queries = Some(limit);
        self
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryConfigError::ZeroConcurrency`] when the concurrency
    /// limit is zero.
    pub fn validate(&self) -> Result<(), DiscoveryConfigError> {
        if matches!(self.max_concurrent_queries, Some(0)) {
            return Err(DiscoveryConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}
