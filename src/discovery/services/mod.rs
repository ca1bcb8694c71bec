//! Application services for endpoint discovery.
//!
//! The orchestrator owns one of each of the other services per session:
//! status table, plugin registry, completion barrier, consumer registry and
//! liveness token. Each guards its own state.

mod barrier;
mod config;
mod consumers;
mod liveness;
mod orchestrator;
mod plugin_registry;
mod status_table;

pub use barrier::{BarrierHandle, CompletionBarrier};
pub use config::{DiscoveryConfig, DiscoveryConfigError};
pub use consumers::ConsumerRegistry;
pub use liveness::{LivenessGuard, LivenessToken};
pub use orchestrator::{DiscoveryError, DiscoveryOrchestrator, DiscoveryResult};
pub use plugin_registry::{PluginRegistryError, PluginRegistryResult, QueryPluginRegistry};
pub use status_table::EndpointStatusTable;
