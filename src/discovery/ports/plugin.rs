//! Query plugin port.
//!
//! One plugin per endpoint protocol. The orchestrator selects a plugin from
//! the endpoint's declared interface and awaits its [`QueryPlugin::query`];
//! everything protocol-specific (connection set-up, document parsing,
//! attribute extraction) stays behind that call.

use crate::discovery::domain::{
    Endpoint, InterfaceName, PluginName, QueryOptions, QueryResponse, SecurityConfig,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Protocol-specific query capability.
///
/// Implementations are shared across tasks and may be called concurrently
/// for distinct endpoints. A call may await network I/O for an unbounded
/// time; the orchestrator neither times it out nor cancels it.
#[async_trait]
pub trait QueryPlugin<T>: Send + Sync
where
    T: Send + 'static,
{
    /// Returns the plugin's registry name.
    fn name(&self) -> PluginName;

    /// Returns the interface names this plugin can query.
    ///
    /// The first entry is used when the plugin is tried for an endpoint with
    /// no declared interface and none of its interfaces is preferred.
    fn supported_interfaces(&self) -> Vec<InterfaceName>;

    /// Returns `true` when the plugin can rule the endpoint out up front,
    /// typically from its URL scheme.
    fn is_endpoint_not_supported(&self, _endpoint: &Endpoint) -> bool {
        false
    }

    /// Queries one endpoint.
    async fn query(
        &self,
        security: &SecurityConfig,
        endpoint: &Endpoint,
        options: &QueryOptions,
    ) -> QueryResponse<T>;

    /// Returns the endpoint a description points at, when it names one.
    ///
    /// Index plugins return the next endpoint to query; resource plugins
    /// keep the default.
    fn nested_endpoint(&self, _entity: &T) -> Option<Endpoint> {
        None
    }

    /// Returns `false` for descriptions that must not reach consumers.
    ///
    /// Nested endpoints are followed either way, so an index plugin can hide
    /// pure referrals while still walking them.
    fn is_deliverable(&self, _entity: &T) -> bool {
        true
    }
}

/// Lazily invoked plugin constructor.
///
/// Stands in for locating and loading an installed plugin module; a factory
/// failure is reported as a load error, never a panic.
pub type PluginFactory<T> = Arc<
    dyn Fn() -> Result<Arc<dyn QueryPlugin<T>>, Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync,
>;
