//! Consumer port for discovered resource descriptions.

/// Sink receiving resource descriptions as they are discovered.
///
/// Delivery is an unordered stream, possibly interleaved across endpoints
/// and called from several tasks at once. Implementations must not block
/// for long: the publishing task waits for every consumer in turn, and
/// closing the session waits for publications already running. Callbacks
/// may call back into the orchestrator, except to close it or to drop its
/// last handle: either waits for the callback itself and deadlocks.
#[cfg_attr(test, mockall::automock)]
pub trait EntityConsumer<T: Send + Sync + 'static>: Send + Sync {
    /// Receives one resource description.
    fn on_resource_description(&self, entity: &T);
}
