//! Thread-safe list of result sinks.

use crate::discovery::ports::EntityConsumer;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Registered consumers of one discovery session.
///
/// Guarded by its own lock, separate from the status table, so a task
/// publishing results and a caller editing the consumer list never wait on
/// each other's locks in opposite order.
pub struct ConsumerRegistry<T: Send + Sync + 'static> {
    consumers: RwLock<Vec<Arc<dyn EntityConsumer<T>>>>,
}

impl<T: Send + Sync + 'static> Default for ConsumerRegistry<T> {
    fn default() -> Self {
        Self {
            consumers: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Send + Sync + 'static> ConsumerRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer. It receives descriptions published from now on.
    pub fn add(&self, consumer: Arc<dyn EntityConsumer<T>>) {
        self.consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(consumer);
    }

    /// Unregisters a consumer, matched by pointer identity.
    ///
    /// Returns `false` when the consumer was not registered. A publication
    /// already in flight may still reach it once.
    pub fn remove(&self, consumer: &Arc<dyn EntityConsumer<T>>) -> bool {
        let mut consumers = self
            .consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = consumers.len();
        consumers.retain(|registered| !Arc::ptr_eq(registered, consumer));
        consumers.len() != before
    }

    /// Delivers `entity` to a snapshot of the registered consumers.
    ///
    /// The lock is released before any consumer runs. Returns the number of
    /// consumers that received the description.
    pub fn publish(&self, entity: &T) -> usize {
        let snapshot: Vec<Arc<dyn EntityConsumer<T>>> = self
            .consumers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for consumer in &snapshot {
            consumer.on_resource_description(entity);
        }
        if snapshot.is_empty() {
            debug!("no consumers registered, description dropped");
        }
        snapshot.len()
    }

    /// Returns the number of registered consumers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.consumers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no consumer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
