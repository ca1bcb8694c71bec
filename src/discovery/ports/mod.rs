//! Port contracts for endpoint discovery.
//!
//! Ports define the two external collaborators the orchestrator talks to:
//! protocol-specific query plugins and result consumers.

pub mod consumer;
pub mod plugin;

pub use consumer::EntityConsumer;
pub use plugin::{PluginFactory, QueryPlugin};

#[cfg(test)]
pub use consumer::MockEntityConsumer;
