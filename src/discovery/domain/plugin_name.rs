//! Query plugin names.

use super::DiscoveryDomainError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Name under which a query plugin module is registered and loaded.
///
/// Names follow module identifier rules: a letter first, then letters,
/// digits or underscores (`ldap_glue2`, `rest_emies`). Lookup is
/// case-insensitive, so names are stored lowercased. Deserialization goes
/// through the same validation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PluginName(String);

impl PluginName {
    /// Parses a plugin name, trimming and lowercasing it.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryDomainError::EmptyPluginName`] for a blank value
    /// and [`DiscoveryDomainError::InvalidPluginName`] when it is not a
    /// module identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, DiscoveryDomainError> {
        let raw = value.into();
        let name = raw.trim().to_ascii_lowercase();
        let mut chars = name.chars();
        match chars.next() {
            None => Err(DiscoveryDomainError::EmptyPluginName),
            Some(first)
                if first.is_ascii_lowercase()
                    && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') =>
            {
                Ok(Self(name))
            }
            Some(_) => Err(DiscoveryDomainError::InvalidPluginName(raw)),
        }
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PluginName {
    type Err = DiscoveryDomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for PluginName {
    type Error = DiscoveryDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PluginName> for String {
    fn from(name: PluginName) -> Self {
        name.0
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
