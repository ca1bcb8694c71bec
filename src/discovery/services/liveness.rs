//! Session liveness token shared by background query tasks.
//!
//! Tasks outlive the orchestrator that spawned them. Before touching shared
//! session state a task takes a [`LivenessGuard`]; once the token is
//! invalidated no guard is handed out and the task must stop mutating.

use crate::discovery::domain::SessionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::info;

/// Validity flag of one discovery session.
///
/// The flag itself is atomic, so [`LivenessToken::is_valid`] never touches
/// the lock and stays callable from inside a guarded section, consumer
/// callbacks included. Guards share the read side of the lock; invalidation
/// clears the flag first, then takes the write side to wait for sections
/// already running. No section starts afterwards. The transition is one-way.
#[derive(Clone)]
pub struct LivenessToken {
    session: SessionId,
    state: Arc<LivenessState>,
}

struct LivenessState {
    valid: AtomicBool,
    sections: RwLock<()>,
}

/// Proof that the session was valid when the guard was taken.
///
/// Holding it blocks invalidation. Never hold one across an `.await`.
pub struct LivenessGuard<'a> {
    _section: RwLockReadGuard<'a, ()>,
}

impl LivenessToken {
    /// Creates a valid token for `session`.
    #[must_use]
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            state: Arc::new(LivenessState {
                valid: AtomicBool::new(true),
                sections: RwLock::new(()),
            }),
        }
    }

    /// Returns the session this token belongs to.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Returns a guard while the session is valid, `None` once invalidated.
    ///
    /// Once invalidation has begun this returns `None` without waiting on
    /// the lock.
    #[must_use]
    pub fn guard(&self) -> Option<LivenessGuard<'_>> {
        if !self.is_valid() {
            return None;
        }
        let section = self
            .state
            .sections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        // Invalidation may have completed while we waited for the lock.
        self.is_valid().then_some(LivenessGuard { _section: section })
    }

    /// Returns `true` until the token is invalidated. Never blocks.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state.valid.load(Ordering::Acquire)
    }

    /// Invalidates the token and waits for running guarded sections.
    ///
    /// Returns `true` for the call that performed the transition and `false`
    /// for every later call. Calling it while holding a guard on the same
    /// thread deadlocks.
    pub fn invalidate(&self) -> bool {
        let was_valid = self.state.valid.swap(false, Ordering::AcqRel);
        drop(
            self.state
                .sections
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if was_valid {
            info!(session = %self.session, "discovery session invalidated");
        }
        was_valid
    }
}
