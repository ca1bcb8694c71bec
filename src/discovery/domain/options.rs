//! Options steering plugin selection and recursion.

use super::{DiscoveryDomainError, Endpoint, InterfaceName};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Compiled URL patterns for endpoints that must never be queried.
///
/// Serialised as the list of source patterns; deserialisation compiles them
/// and fails on the first invalid expression.
#[derive(Debug, Clone, Default)]
pub struct RejectedUrls(Vec<Regex>);

impl RejectedUrls {
    /// Compiles a list of regular expressions.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryDomainError::InvalidRejectPattern`] for the first
    /// pattern that does not compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, DiscoveryDomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|pattern| {
                let source = pattern.as_ref().trim();
                Regex::new(source).map_err(|err| DiscoveryDomainError::InvalidRejectPattern {
                    pattern: source.to_owned(),
                    reason: err.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Returns `true` when any pattern matches `url`.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.0.iter().any(|pattern| pattern.is_match(url))
    }

    /// Returns the number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no pattern is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RejectedUrls {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(Regex::as_str))
    }
}

impl<'de> Deserialize<'de> for RejectedUrls {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let patterns = Vec::<String>::deserialize(deserializer)?;
        Self::new(patterns).map_err(serde::de::Error::custom)
    }
}

/// Per-session query options, also handed to every plugin call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    preferred_interfaces: Vec<InterfaceName>,
    rejected_urls: RejectedUrls,
    recursive: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            preferred_interfaces: Vec::new(),
            rejected_urls: RejectedUrls::default(),
            recursive: true,
        }
    }
}

impl QueryOptions {
    /// Creates default options: recursive, nothing preferred or rejected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets interfaces to try first for endpoints with no declared interface.
    #[must_use]
    pub fn with_preferred_interfaces<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<InterfaceName>,
    {
        self.preferred_interfaces = interfaces.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the rejected URL patterns.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryDomainError::InvalidRejectPattern`] when a pattern
    /// does not compile.
    pub fn with_rejected_url_patterns<I, S>(
        mut self,
        patterns: I,
    ) -> Result<Self, DiscoveryDomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rejected_urls = RejectedUrls::new(patterns)?;
        Ok(self)
    }

    /// Enables or disables following nested endpoints.
    #[must_use]
    pub const fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Returns the preferred interfaces in priority order.
    #[must_use]
    pub fn preferred_interfaces(&self) -> &[InterfaceName] {
        &self.preferred_interfaces
    }

    /// Returns `true` when `interface` is preferred.
    #[must_use]
    pub fn is_preferred(&self, interface: &InterfaceName) -> bool {
        self.preferred_interfaces.contains(interface)
    }

    /// Returns `true` when the endpoint URL matches a rejected pattern.
    #[must_use]
    pub fn is_rejected(&self, endpoint: &Endpoint) -> bool {
        self.rejected_urls.matches(endpoint.url())
    }

    /// Returns the rejected URL patterns.
    #[must_use]
    pub const fn rejected_urls(&self) -> &RejectedUrls {
        &self.rejected_urls
    }

    /// Returns `true` when nested endpoints are followed.
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }
}
