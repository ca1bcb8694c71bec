//! Credential and transport settings handed to plugins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-query timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Opaque security bundle passed unchanged into every plugin call.
///
/// The orchestrator never reads these fields; they exist for plugins that
/// need credential material or a network timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Client certificate in PEM form.
    pub certificate_path: Option<PathBuf>,
    /// Private key matching the client certificate.
    pub key_path: Option<PathBuf>,
    /// Proxy credential, used instead of certificate and key when set.
    pub proxy_path: Option<PathBuf>,
    /// Directory of trusted CA certificates.
    pub ca_certificates_dir: Option<PathBuf>,
    /// Per-query network timeout in seconds.
    pub timeout_secs: u64,
    /// Plugin-specific settings.
    pub extra: BTreeMap<String, String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            certificate_path: None,
            key_path: None,
            proxy_path: None,
            ca_certificates_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            extra: BTreeMap::new(),
        }
    }
}

impl SecurityConfig {
    /// Returns the per-query timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sets the per-query timeout in seconds.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the proxy credential path.
    #[must_use]
    pub fn with_proxy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.proxy_path = Some(path.into());
        self
    }

    /// Adds a plugin-specific setting, replacing any previous value.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns a plugin-specific setting.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}
