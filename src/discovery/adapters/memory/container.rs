//! Consumer that keeps every description it receives.

use std::sync::{Mutex, PoisonError};

use crate::discovery::ports::EntityConsumer;

/// Thread-safe collecting consumer.
///
/// Stores a clone of each delivered description in arrival order.
#[derive(Debug, Default)]
pub struct EntityContainer<T> {
    entities: Mutex<Vec<T>>,
}

impl<T> EntityContainer<T> {
    /// Creates an empty container.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entities: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of descriptions received so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing has been received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes and returns everything received so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<T>> {
        self.entities.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> EntityContainer<T> {
    /// Returns a copy of everything received so far.
    #[must_use]
    pub fn entities(&self) -> Vec<T> {
        self.lock().clone()
    }
}

impl<T> EntityConsumer<T> for EntityContainer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn on_resource_description(&self, entity: &T) {
        self.lock().push(entity.clone());
    }
}
