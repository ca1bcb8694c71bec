//! Discovery orchestrator.
//!
//! Provides [`DiscoveryOrchestrator`], which accepts endpoints, dispatches
//! one query task per endpoint, follows nested endpoints recursively and
//! publishes every discovered description to the registered consumers.
//!
//! Each endpoint moves through `Unclaimed -> InProgress -> {Successful,
//! Failed}`. Claims go through the status table, so an identity is queried
//! at most once per session and cyclic index graphs terminate.

use crate::discovery::{
    domain::{
        Endpoint, InterfaceName, QueryOptions, QueryOutcome, QueryResponse, QueryState,
        QueryStatus, SecurityConfig, SessionId,
    },
    ports::{EntityConsumer, QueryPlugin},
    services::{
        BarrierHandle, CompletionBarrier, ConsumerRegistry, DiscoveryConfig,
        DiscoveryConfigError, EndpointStatusTable, LivenessToken, PluginRegistryError,
        QueryPluginRegistry,
    },
};
use mockable::{Clock, DefaultClock};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Errors produced by a discovery session.
///
/// Per-endpoint variants never reach the caller directly: they are recorded
/// as the `Failed` status detail of the endpoint concerned.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No usable plugin could be found for the endpoint's interface.
    #[error("plugin not found for interface '{interface}'")]
    PluginNotFound {
        /// Interface that could not be resolved.
        interface: InterfaceName,
        /// Registry lookup failure.
        #[source]
        source: PluginRegistryError,
    },

    /// Every plugin tried declined the endpoint's interface.
    #[error("no plugin accepted the interface of endpoint {endpoint}")]
    WrongInterface {
        /// Endpoint that was declined.
        endpoint: Endpoint,
    },

    /// The plugin reported a protocol or network failure.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// The orchestrator was closed while the query was in flight.
    #[error("discovery session was closed")]
    Invalidated,

    /// The orchestrator was constructed outside a Tokio runtime.
    #[error("discovery requires a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] DiscoveryConfigError),
}

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

type Resolved<T> = (Arc<dyn QueryPlugin<T>>, Vec<T>);

struct SessionState<T, C>
where
    T: Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    statuses: EndpointStatusTable<C>,
    consumers: ConsumerRegistry<T>,
    plugins: QueryPluginRegistry<T>,
    security: SecurityConfig,
    options: QueryOptions,
    permits: Option<Semaphore>,
}

/// Everything a query task needs; cloned into every spawned task.
struct Dispatcher<T, C>
where
    T: Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    state: Arc<SessionState<T, C>>,
    liveness: LivenessToken,
    barrier: CompletionBarrier,
    runtime: Handle,
}

impl<T, C> Clone for Dispatcher<T, C>
where
    T: Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            liveness: self.liveness.clone(),
            barrier: self.barrier.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T, C> Dispatcher<T, C>
where
    T: Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn session(&self) -> SessionId {
        self.liveness.session()
    }

    /// Claims `endpoint` and spawns its query task. Never blocks.
    fn dispatch(&self, endpoint: Endpoint) -> bool {
        if !self.state.statuses.try_claim(&endpoint) {
            return false;
        }
        let handle = self.barrier.acquire();
        debug!(session = %self.session(), endpoint = %endpoint, "starting task to query endpoint");
        self.runtime.spawn(self.clone().query_endpoint(endpoint, handle));
        true
    }

    async fn query_endpoint(self, endpoint: Endpoint, handle: BarrierHandle) {
        let succeeded = self.run_query(&endpoint).await;
        handle.release(succeeded);
    }

    async fn run_query(&self, endpoint: &Endpoint) -> bool {
        if !self.liveness.is_valid() {
            debug!(session = %self.session(), endpoint = %endpoint, "session closed before query started");
            return false;
        }

        let resolved = if endpoint.has_unspecified_interface() {
            self.query_unspecified(endpoint).await
        } else {
            self.query_declared(endpoint).await
        };

        match resolved {
            Ok((plugin, entities)) => self.deliver(endpoint, plugin.as_ref(), &entities),
            Err(DiscoveryError::Invalidated) => {
                debug!(session = %self.session(), endpoint = %endpoint, "session closed during query");
                false
            }
            Err(err) => {
                self.record_failure(endpoint, &err);
                false
            }
        }
    }

    async fn query_declared(&self, endpoint: &Endpoint) -> DiscoveryResult<Resolved<T>> {
        let plugins = &self.state.plugins;
        let plugin = plugins
            .resolve_for_interface(endpoint.interface())
            .and_then(|name| plugins.load(&name))
            .map_err(|source| DiscoveryError::PluginNotFound {
                interface: endpoint.interface().clone(),
                source,
            })?;

        let (outcome, entities) = self.call_plugin(plugin.as_ref(), endpoint).await.into_parts();
        match outcome {
            QueryOutcome::Successful => Ok((plugin, entities)),
            QueryOutcome::Failed(detail) => Err(DiscoveryError::QueryFailed(detail)),
            QueryOutcome::WrongInterface => Err(DiscoveryError::WrongInterface {
                endpoint: endpoint.clone(),
            }),
        }
    }

    /// Tries candidate plugins one after another until one does not decline.
    async fn query_unspecified(&self, endpoint: &Endpoint) -> DiscoveryResult<Resolved<T>> {
        let candidates = self
            .state
            .plugins
            .candidates_for_unspecified(endpoint, &self.state.options);
        if candidates.is_empty() {
            let interface = InterfaceName::unspecified();
            return Err(DiscoveryError::PluginNotFound {
                source: PluginRegistryError::NoPluginForInterface(interface.clone()),
                interface,
            });
        }
        debug!(
            session = %self.session(),
            endpoint = %endpoint,
            candidates = candidates.len(),
            "interface unspecified, trying all possible plugins"
        );

        for (plugin, interface) in candidates {
            if !self.liveness.is_valid() {
                return Err(DiscoveryError::Invalidated);
            }
            let attempt = endpoint.with_interface(interface);
            let (outcome, entities) = self.call_plugin(plugin.as_ref(), &attempt).await.into_parts();
            match outcome {
                QueryOutcome::Successful => return Ok((plugin, entities)),
                QueryOutcome::Failed(detail) => return Err(DiscoveryError::QueryFailed(detail)),
                QueryOutcome::WrongInterface => {
                    debug!(endpoint = %attempt, plugin = %plugin.name(), "plugin declined interface");
                }
            }
        }

        Err(DiscoveryError::WrongInterface {
            endpoint: endpoint.clone(),
        })
    }

    async fn call_plugin(
        &self,
        plugin: &dyn QueryPlugin<T>,
        endpoint: &Endpoint,
    ) -> QueryResponse<T> {
        let _permit = match &self.state.permits {
            Some(permits) => permits.acquire().await.ok(),
            None => None,
        };
        debug!(
            session = %self.session(),
            endpoint = %endpoint,
            plugin = %plugin.name(),
            "calling plugin to query endpoint"
        );
        plugin
            .query(&self.state.security, endpoint, &self.state.options)
            .await
    }

    /// Publishes results and follows nested endpoints. Returns whether the
    /// endpoint was finalised as successful.
    fn deliver(&self, endpoint: &Endpoint, plugin: &dyn QueryPlugin<T>, entities: &[T]) -> bool {
        for entity in entities {
            let Some(_guard) = self.liveness.guard() else {
                debug!(session = %self.session(), endpoint = %endpoint, "session closed, dropping remaining results");
                return false;
            };
            let referral = plugin.nested_endpoint(entity);
            if let Some(rejected) = referral
                .as_ref()
                .filter(|candidate| self.state.options.is_rejected(candidate))
            {
                debug!(parent = %endpoint, endpoint = %rejected, "nested endpoint is rejected, dropping description");
                continue;
            }
            if plugin.is_deliverable(entity) {
                self.state.consumers.publish(entity);
            }
            if let Some(nested) = referral {
                self.follow(endpoint, nested);
            }
        }

        let Some(_guard) = self.liveness.guard() else {
            return false;
        };
        self.state.statuses.mark_successful(endpoint);
        debug!(
            session = %self.session(),
            endpoint = %endpoint,
            entities = entities.len(),
            "endpoint queried successfully"
        );
        true
    }

    fn follow(&self, parent: &Endpoint, nested: Endpoint) {
        if !self.state.options.is_recursive() {
            return;
        }
        debug!(parent = %parent, endpoint = %nested, "found nested endpoint, querying it recursively");
        self.dispatch(nested);
    }

    fn record_failure(&self, endpoint: &Endpoint, err: &DiscoveryError) {
        let Some(_guard) = self.liveness.guard() else {
            return;
        };
        warn!(session = %self.session(), endpoint = %endpoint, error = %err, "endpoint query failed");
        self.state.statuses.mark_failed(endpoint, err.to_string());
    }
}

/// Recursive, concurrent endpoint discovery session.
///
/// Queries run on the Tokio runtime captured at construction. Dropping the
/// orchestrator closes the session; tasks still blocked inside a plugin call
/// are not interrupted, they merely stop touching session state once they
/// resume.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use gridscout::discovery::{
///     adapters::memory::{EntityContainer, ScriptedQueryPlugin},
///     domain::{Endpoint, QueryResponse, QueryState},
///     services::{DiscoveryConfig, DiscoveryOrchestrator, QueryPluginRegistry},
/// };
/// use mockable::DefaultClock;
///
/// # #[tokio::main(flavor = "multi_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let plugin = ScriptedQueryPlugin::<String>::new("rest_info", ["org.ogf.glue.emies.resourceinfo"])?
///     .with_response("https://ce.example.org", QueryResponse::successful(["ce01".to_owned()]));
///
/// let mut registry = QueryPluginRegistry::<String>::new();
/// registry.register(Arc::new(plugin));
///
/// let orchestrator =
///     DiscoveryOrchestrator::new(DiscoveryConfig::default(), registry, Arc::new(DefaultClock))?;
/// let container = Arc::new(EntityContainer::<String>::new());
/// orchestrator.add_consumer(container.clone());
///
/// let ce = Endpoint::new("https://ce.example.org", "org.ogf.glue.emies.resourceinfo")?;
/// assert!(orchestrator.add_endpoint(ce.clone()));
/// assert!(orchestrator.wait(None).await);
///
/// assert_eq!(orchestrator.status(&ce).state(), QueryState::Successful);
/// assert_eq!(container.entities(), vec!["ce01".to_owned()]);
/// # Ok(())
/// # }
/// ```
pub struct DiscoveryOrchestrator<T, C = DefaultClock>
where
    T: Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    dispatcher: Dispatcher<T, C>,
}

impl<T, C> DiscoveryOrchestrator<T, C>
where
    T: Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a session on the current Tokio runtime.
    ///
    /// The registry is indexed here; plugins that fail to load are logged
    /// and left out.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NoRuntime`] when called outside a Tokio
    /// runtime, or [`DiscoveryError::Config`] when the configuration is
    /// invalid.
    pub fn new(
        config: DiscoveryConfig,
        plugins: QueryPluginRegistry<T>,
        clock: Arc<C>,
    ) -> DiscoveryResult<Self> {
        let runtime = Handle::try_current()?;
        Self::with_runtime(config, plugins, clock, runtime)
    }

    /// Creates a session spawning its tasks on `runtime`.
    ///
    /// Query tasks need no timer, so any runtime will do. Timed waits need
    /// the time driver wherever [`DiscoveryOrchestrator::wait`] is polled.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Config`] when the configuration is invalid.
    pub fn with_runtime(
        config: DiscoveryConfig,
        mut plugins: QueryPluginRegistry<T>,
        clock: Arc<C>,
        runtime: Handle,
    ) -> DiscoveryResult<Self> {
        config.validate()?;
        let DiscoveryConfig {
            security,
            options,
            one_success_suffices,
            max_concurrent_queries,
        } = config;

        let usable = plugins.index_interfaces();
        let session = SessionId::new();
        info!(
            session = %session,
            plugins = usable,
            one_success_suffices,
            max_concurrent_queries,
            "discovery session started"
        );

        let state = SessionState {
            statuses: EndpointStatusTable::new(clock),
            consumers: ConsumerRegistry::new(),
            plugins,
            security,
            options,
            permits: max_concurrent_queries.map(Semaphore::new),
        };
        Ok(Self {
            dispatcher: Dispatcher {
                state: Arc::new(state),
                liveness: LivenessToken::new(session),
                barrier: CompletionBarrier::new(one_success_suffices),
                runtime,
            },
        })
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.dispatcher.session()
    }

    /// Starts querying `endpoint` in the background.
    ///
    /// Returns `false` without doing anything when the endpoint was already
    /// registered in this session or the session is closed.
    pub fn add_endpoint(&self, endpoint: Endpoint) -> bool {
        if !self.dispatcher.liveness.is_valid() {
            debug!(session = %self.session(), endpoint = %endpoint, "session closed, ignoring endpoint");
            return false;
        }
        self.dispatcher.dispatch(endpoint)
    }

    /// Starts querying every endpoint, returning how many were accepted.
    pub fn add_endpoints(&self, endpoints: impl IntoIterator<Item = Endpoint>) -> usize {
        endpoints
            .into_iter()
            .map(|endpoint| self.add_endpoint(endpoint))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Registers a consumer for descriptions published from now on.
    pub fn add_consumer(&self, consumer: Arc<dyn EntityConsumer<T>>) {
        self.dispatcher.state.consumers.add(consumer);
    }

    /// Unregisters a consumer. Past deliveries are not revoked.
    pub fn remove_consumer(&self, consumer: &Arc<dyn EntityConsumer<T>>) -> bool {
        self.dispatcher.state.consumers.remove(consumer)
    }

    /// Waits until every query finished, or the first success when so
    /// configured, or until `timeout` elapses.
    ///
    /// Returns `false` only on timeout.
    ///
    /// # Panics
    ///
    /// Panics when given a timeout on a runtime built without the time
    /// driver.
    pub async fn wait(&self, timeout: Option<Duration>) -> bool {
        self.dispatcher.barrier.wait(timeout).await
    }

    /// Returns `true` when the session is complete. Never blocks.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.dispatcher.barrier.is_done()
    }

    /// Returns a handle on the session's completion barrier.
    ///
    /// The handle stays usable after the orchestrator is dropped.
    #[must_use]
    pub fn completion(&self) -> CompletionBarrier {
        self.dispatcher.barrier.clone()
    }

    /// Returns the status of `endpoint`; `Unknown` when never seen.
    #[must_use]
    pub fn status(&self, endpoint: &Endpoint) -> QueryStatus {
        self.dispatcher.state.statuses.status(endpoint)
    }

    /// Records a status obtained outside this session's queries.
    ///
    /// Without `force` only unseen endpoints are written.
    pub fn set_status(&self, endpoint: &Endpoint, status: QueryStatus, force: bool) -> bool {
        self.dispatcher
            .state
            .statuses
            .set_status(endpoint, status, force)
    }

    /// Returns a snapshot of every endpoint status.
    ///
    /// Call after [`DiscoveryOrchestrator::wait`] for the final map.
    #[must_use]
    pub fn statuses(&self) -> BTreeMap<Endpoint, QueryStatus> {
        self.dispatcher.state.statuses.snapshot()
    }

    /// Returns the endpoints currently in `state`.
    #[must_use]
    pub fn endpoints_with_state(&self, state: QueryState) -> Vec<Endpoint> {
        self.dispatcher.state.statuses.endpoints_with_state(state)
    }

    /// Drops the final status of `endpoint` so it can be added again.
    ///
    /// Returns `false` when the endpoint is unknown or still in progress.
    pub fn forget_endpoint(&self, endpoint: &Endpoint) -> bool {
        self.dispatcher.state.statuses.forget(endpoint)
    }

    /// Drops every final status, returning how many were removed.
    pub fn clear_finished_statuses(&self) -> usize {
        self.dispatcher.state.statuses.clear_finished()
    }

    /// Closes the session.
    ///
    /// Waits for publications already running, so it must not be called
    /// from a consumer callback. Background tasks stop touching session
    /// state at their next check. Returns `true` for the call that closed
    /// the session.
    pub fn close(&self) -> bool {
        self.dispatcher.liveness.invalidate()
    }

    /// Returns `true` once the session is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.dispatcher.liveness.is_valid()
    }
}

impl<T, C> Drop for DiscoveryOrchestrator<T, C>
where
    T: Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.close();
    }
}
