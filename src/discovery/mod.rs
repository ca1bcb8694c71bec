//! Recursive endpoint discovery for grid information systems.
//!
//! Callers hand the orchestrator endpoints (a URL plus the interface the
//! endpoint speaks). Each endpoint is queried once per session by the plugin
//! registered for its interface; the resource descriptions it returns are
//! published to every registered consumer, and descriptions that point at
//! further endpoints are queried in turn. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
