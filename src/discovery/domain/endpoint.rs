//! Endpoint identity.

use super::{DiscoveryDomainError, InterfaceName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Addressable information source, identified by URL and declared interface.
///
/// Two endpoints are equal exactly when both the URL and the interface name
/// match, so the same URL reached through two interfaces is queried twice.
/// Ordering follows the same pair, URL first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    url: String,
    interface: InterfaceName,
}

impl Endpoint {
    /// Creates an endpoint with a declared interface.
    ///
    /// Both parts are trimmed; an empty interface means "unspecified".
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryDomainError::EmptyUrl`] when the URL is empty after
    /// trimming.
    pub fn new(
        url: impl Into<String>,
        interface: impl Into<InterfaceName>,
    ) -> Result<Self, DiscoveryDomainError> {
        let raw = url.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DiscoveryDomainError::EmptyUrl);
        }
        Ok(Self {
            url: trimmed.to_owned(),
            interface: interface.into(),
        })
    }

    /// Creates an endpoint whose interface is unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryDomainError::EmptyUrl`] when the URL is empty after
    /// trimming.
    pub fn unspecified(url: impl Into<String>) -> Result<Self, DiscoveryDomainError> {
        Self::new(url, InterfaceName::unspecified())
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the declared interface.
    #[must_use]
    pub const fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    /// Returns `true` when no interface was declared.
    #[must_use]
    pub fn has_unspecified_interface(&self) -> bool {
        self.interface.is_unspecified()
    }

    /// Returns the lowercased URL scheme, if the URL carries one.
    #[must_use]
    pub fn scheme(&self) -> Option<String> {
        self.url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
    }

    /// Returns a copy of this endpoint bound to another interface.
    #[must_use]
    pub fn with_interface(&self, interface: InterfaceName) -> Self {
        Self {
            url: self.url.clone(),
            interface,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.interface.is_unspecified() {
            f.write_str(&self.url)
        } else {
            write!(f, "{} ({})", self.url, self.interface)
        }
    }
}
