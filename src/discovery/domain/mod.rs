//! Domain model for endpoint discovery.
//!
//! Endpoints, their per-query status, plugin outcomes and the options that
//! steer a discovery session. Nothing here touches threads, locks or I/O.

mod endpoint;
mod error;
mod ids;
mod interface;
mod options;
mod outcome;
mod plugin_name;
mod security;
mod status;

pub use endpoint::Endpoint;
pub use error::{DiscoveryDomainError, ParseQueryStateError};
pub use ids::SessionId;
pub use interface::InterfaceName;
pub use options::{QueryOptions, RejectedUrls};
pub use outcome::{QueryOutcome, QueryResponse};
pub use plugin_name::PluginName;
pub use security::SecurityConfig;
pub use status::{QueryState, QueryStatus};
