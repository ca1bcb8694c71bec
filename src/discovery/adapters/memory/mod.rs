//! In-memory adapters for discovery.
//!
//! [`EntityContainer`] collects delivered descriptions; [`ScriptedQueryPlugin`]
//! answers queries from canned responses. Both back the test suites and
//! serve as reference implementations of the ports.

mod container;
mod scripted_plugin;

pub use container::EntityContainer;
pub use scripted_plugin::ScriptedQueryPlugin;
