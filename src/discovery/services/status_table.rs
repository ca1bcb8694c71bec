//! Thread-safe map from endpoint identity to query status.
//!
//! The table is the single dedup gate of a discovery session: every
//! endpoint, whether added by the caller or found by a plugin, must win
//! [`EndpointStatusTable::try_claim`] before a query is dispatched for it.

use crate::discovery::domain::{Endpoint, QueryState, QueryStatus};
use mockable::Clock;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Endpoint status map guarded by one lock.
///
/// Every operation is a map lookup or insert under that lock and never
/// blocks on I/O.
pub struct EndpointStatusTable<C>
where
    C: Clock + Send + Sync,
{
    statuses: Mutex<HashMap<Endpoint, QueryStatus>>,
    clock: Arc<C>,
}

impl<C> EndpointStatusTable<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty table stamping statuses with `clock`.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Endpoint, QueryStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the status of `endpoint`, or `Unknown` when it was never seen.
    #[must_use]
    pub fn status(&self, endpoint: &Endpoint) -> QueryStatus {
        self.entries()
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| QueryStatus::unknown(self.clock.utc()))
    }

    /// Claims `endpoint` for querying.
    ///
    /// Inserts it as `InProgress` if and only if it is absent. Returns `false`
    /// when the identity is already known in any state.
    pub fn try_claim(&self, endpoint: &Endpoint) -> bool {
        match self.entries().entry(endpoint.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(QueryStatus::in_progress(self.clock.utc()));
                debug!(endpoint = %endpoint, "claimed endpoint");
                true
            }
            Entry::Occupied(_) => {
                debug!(endpoint = %endpoint, "endpoint already registered, ignoring");
                false
            }
        }
    }

    /// Records `status` unless a terminal status already exists.
    ///
    /// Returns `true` when the status was stored. A final status is written
    /// at most once through this method.
    pub fn try_set_status(&self, endpoint: &Endpoint, status: QueryStatus) -> bool {
        let mut entries = self.entries();
        if entries.get(endpoint).is_some_and(QueryStatus::is_terminal) {
            debug!(endpoint = %endpoint, rejected = %status, "status already final");
            return false;
        }
        debug!(endpoint = %endpoint, status = %status, "setting status");
        entries.insert(endpoint.clone(), status);
        true
    }

    /// Records `status`, overwriting any existing entry when `force` is set.
    ///
    /// Without `force` the status is stored only for an unseen endpoint.
    /// Intended for status polling outside a discovery run; the orchestrator
    /// itself never forces.
    pub fn set_status(&self, endpoint: &Endpoint, status: QueryStatus, force: bool) -> bool {
        let mut entries = self.entries();
        if !force && entries.contains_key(endpoint) {
            return false;
        }
        debug!(endpoint = %endpoint, status = %status, force, "setting status");
        entries.insert(endpoint.clone(), status);
        true
    }

    /// Finalises `endpoint` as successful.
    pub fn mark_successful(&self, endpoint: &Endpoint) -> bool {
        self.try_set_status(endpoint, QueryStatus::successful(self.clock.utc()))
    }

    /// Finalises `endpoint` as failed with `detail`.
    pub fn mark_failed(&self, endpoint: &Endpoint, detail: impl Into<String>) -> bool {
        self.try_set_status(endpoint, QueryStatus::failed(self.clock.utc(), detail))
    }

    /// Returns a copy of every recorded status, ordered by endpoint.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<Endpoint, QueryStatus> {
        self.entries()
            .iter()
            .map(|(endpoint, status)| (endpoint.clone(), status.clone()))
            .collect()
    }

    /// Returns the endpoints currently in `state`, ordered.
    #[must_use]
    pub fn endpoints_with_state(&self, state: QueryState) -> Vec<Endpoint> {
        let mut matching: Vec<Endpoint> = self
            .entries()
            .iter()
            .filter(|(_, status)| status.state() == state)
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        matching.sort();
        matching
    }

    /// Removes a finished endpoint so it can be claimed again.
    ///
    /// Returns `false` when the endpoint is unknown or still in progress.
    pub fn forget(&self, endpoint: &Endpoint) -> bool {
        let mut entries = self.entries();
        match entries.get(endpoint) {
            Some(status) if status.is_terminal() => {
                entries.remove(endpoint);
                debug!(endpoint = %endpoint, "forgot endpoint status");
                true
            }
            _ => false,
        }
    }

    /// Removes every finished endpoint, returning how many were dropped.
    pub fn clear_finished(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, status| !status.is_terminal());
        before - entries.len()
    }

    /// Returns the number of known endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` when no endpoint has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
