//! Shared completion counter for outstanding query tasks.
//!
//! Every scheduled query holds one [`BarrierHandle`]. Waiters resolve when
//! the count of live handles reaches zero, or, in "first success is enough"
//! mode, as soon as one handle is released as successful.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

struct BarrierState {
    one_success_suffices: bool,
    outstanding: watch::Sender<usize>,
}

impl BarrierState {
    fn finish(&self, succeeded: bool) {
        let force = self.one_success_suffices && succeeded;
        self.outstanding.send_modify(|count| {
            if force {
                *count = 0;
            } else {
                *count = count.saturating_sub(1);
            }
        });
        if force {
            debug!("first successful query completed the barrier");
        }
    }
}

/// Reference-counted completion barrier.
///
/// Clones share one counter. The counter lives as long as any clone or any
/// handle, so releasing the last handle still wakes waiters after the
/// orchestrator that created the barrier is gone.
#[derive(Clone)]
pub struct CompletionBarrier {
    state: Arc<BarrierState>,
}

impl CompletionBarrier {
    /// Creates a barrier with no outstanding work.
    ///
    /// With `one_success_suffices` the first successful release completes
    /// the barrier regardless of how many handles remain.
    #[must_use]
    pub fn new(one_success_suffices: bool) -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            state: Arc::new(BarrierState {
                one_success_suffices,
                outstanding,
            }),
        }
    }

    /// Registers one unit of outstanding work.
    #[must_use = "dropping the handle immediately releases it as a failure"]
    pub fn acquire(&self) -> BarrierHandle {
        self.state.outstanding.send_modify(|count| *count += 1);
        BarrierHandle {
            state: Some(Arc::clone(&self.state)),
        }
    }

    /// Returns the number of unreleased handles, zero once forced complete.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.state.outstanding.borrow()
    }

    /// Returns `true` when no work is outstanding. Never blocks.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.outstanding() == 0
    }

    /// Returns `true` when the first success completes the barrier.
    #[must_use]
    pub fn one_success_suffices(&self) -> bool {
        self.state.one_success_suffices
    }

    /// Waits until no work is outstanding or `timeout` elapses.
    ///
    /// `None` waits indefinitely. Returns `true` when the barrier completed
    /// and `false` on timeout.
    ///
    /// # Panics
    ///
    /// A `Some` timeout needs the Tokio time driver of the runtime polling
    /// this future and panics without it. `None` never touches the timer.
    pub async fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut outstanding = self.state.outstanding.subscribe();
        let completed = async move { outstanding.wait_for(|count| *count == 0).await.is_ok() };
        match timeout {
            None => completed.await,
            Some(limit) => tokio::time::timeout(limit, completed)
                .await
                .unwrap_or(false),
        }
    }
}

/// One unit of outstanding work on a [`CompletionBarrier`].
///
/// Releasing consumes the handle, so a handle cannot be released twice. A
/// handle dropped without an explicit release counts as a failed query.
pub struct BarrierHandle {
    state: Option<Arc<BarrierState>>,
}

impl BarrierHandle {
    /// Marks the work finished.
    pub fn release(mut self, succeeded: bool) {
        if let Some(state) = self.state.take() {
            state.finish(succeeded);
        }
    }
}

impl Drop for BarrierHandle {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.finish(false);
        }
    }
}
