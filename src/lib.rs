//! Gridscout: concurrent, recursive discovery of grid service endpoints.
//!
//! Starting from a handful of index or registry endpoints, the crate walks
//! the index graph, queries every endpoint it reaches exactly once, and
//! streams the resource descriptions it finds to caller-supplied consumers.
//!
//! # Architecture
//!
//! Gridscout follows hexagonal architecture principles:
//!
//! - **Domain**: Endpoints, statuses and plugin outcomes, free of I/O
//! - **Ports**: Trait contracts for query plugins and result consumers
//! - **Adapters**: Concrete implementations of ports
//! - **Services**: The orchestrator and the shared state it coordinates
//!
//! # Modules
//!
//! - [`discovery`]: Endpoint discovery orchestration
//!
//! # Logging
//!
//! Diagnostics are emitted through [`tracing`]; install a subscriber to see
//! them.

pub mod discovery;
