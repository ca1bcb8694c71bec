//! Declared endpoint interface names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol interface an endpoint declares, e.g. `org.nordugrid.ldapng`.
///
/// An empty name is meaningful: it marks an endpoint whose interface is
/// unspecified, which any plugin willing to query unknown endpoints may try.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceName(String);

impl InterfaceName {
    /// Creates an interface name, trimming surrounding whitespace.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let raw = value.into();
        Self(raw.trim().to_owned())
    }

    /// Returns the empty, unspecified interface name.
    #[must_use]
    pub const fn unspecified() -> Self {
        Self(String::new())
    }

    /// Returns `true` when no interface was declared.
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the interface name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InterfaceName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for InterfaceName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for InterfaceName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unspecified() {
            f.write_str("<unspecified>")
        } else {
            f.write_str(&self.0)
        }
    }
}
