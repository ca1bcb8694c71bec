//! Query plugin answering from canned responses.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Notify, Semaphore};
use tracing::debug;

use crate::discovery::{
    domain::{
        DiscoveryDomainError, Endpoint, InterfaceName, PluginName, QueryOptions, QueryResponse,
        SecurityConfig,
    },
    ports::QueryPlugin,
};

type NestedExtractor<T> = Arc<dyn Fn(&T) -> Option<Endpoint> + Send + Sync>;

/// Scripted query plugin.
///
/// Responses are keyed by endpoint URL. An endpoint whose interface is not
/// among the plugin's interfaces gets [`QueryResponse::wrong_interface`];
/// an unscripted URL gets the fallback response, a failure by default.
///
/// A gate semaphore, when set, must yield one permit per call before the
/// call answers, which lets tests hold queries in flight.
pub struct ScriptedQueryPlugin<T> {
    name: PluginName,
    interfaces: Vec<InterfaceName>,
    responses: HashMap<String, QueryResponse<T>>,
    fallback: QueryResponse<T>,
    nested: Option<NestedExtractor<T>>,
    hide_referrals: bool,
    schemes: Vec<String>,
    gate: Option<Arc<Semaphore>>,
    started: Option<Arc<Notify>>,
    calls: Mutex<Vec<Endpoint>>,
}

impl<T> ScriptedQueryPlugin<T> {
    /// Creates a plugin serving `interfaces`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryDomainError`] when `name` is not a valid plugin
    /// name.
    pub fn new<I, S>(name: impl Into<String>, interfaces: I) -> Result<Self, DiscoveryDomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<InterfaceName>,
    {
        Ok(Self {
            name: PluginName::new(name)?,
            interfaces: interfaces.into_iter().map(Into::into).collect(),
            responses: HashMap::new(),
            fallback: QueryResponse::failed("no scripted response"),
            nested: None,
            hide_referrals: false,
            schemes: Vec::new(),
            gate: None,
            started: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Scripts the response for `url`.
    #[must_use]
    pub fn with_response(mut self, url: impl Into<String>, response: QueryResponse<T>) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    /// Replaces the response for unscripted URLs.
    #[must_use]
    pub fn with_fallback(mut self, response: QueryResponse<T>) -> Self {
        self.fallback = response;
        self
    }

    /// Sets how nested endpoints are read from descriptions.
    #[must_use]
    pub fn with_nested_endpoints(
        mut self,
        extractor: impl Fn(&T) -> Option<Endpoint> + Send + Sync + 'static,
    ) -> Self {
        self.nested = Some(Arc::new(extractor));
        self
    }

    /// Stops descriptions that name a nested endpoint from being delivered.
    #[must_use]
    pub const fn with_hidden_referrals(mut self) -> Self {
        self.hide_referrals = true;
        self
    }

    /// Restricts the plugin to URLs with one of `schemes`.
    ///
    /// Other endpoints are reported as not supported before any query.
    #[must_use]
    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.schemes = schemes
            .into_iter()
            .map(|scheme| scheme.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// Makes every call wait for a permit from `gate` before answering.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Notifies `started` whenever a call begins.
    #[must_use]
    pub fn with_started_signal(mut self, started: Arc<Notify>) -> Self {
        self.started = Some(started);
        self
    }

    /// Returns every endpoint queried so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many times `url` was queried.
    #[must_use]
    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|endpoint| endpoint.url() == url)
            .count()
    }

    fn record_call(&self, endpoint: &Endpoint) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(endpoint.clone());
        if let Some(started) = &self.started {
            started.notify_one();
        }
    }
}

#[async_trait]
impl<T> QueryPlugin<T> for ScriptedQueryPlugin<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> PluginName {
        self.name.clone()
    }

    fn supported_interfaces(&self) -> Vec<InterfaceName> {
        self.interfaces.clone()
    }

    fn is_endpoint_not_supported(&self, endpoint: &Endpoint) -> bool {
        if self.schemes.is_empty() {
            return false;
        }
        endpoint
            .scheme()
            .is_none_or(|scheme| !self.schemes.contains(&scheme))
    }

    async fn query(
        &self,
        _security: &SecurityConfig,
        endpoint: &Endpoint,
        _options: &QueryOptions,
    ) -> QueryResponse<T> {
        self.record_call(endpoint);

        if let Some(gate) = &self.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return QueryResponse::failed("gate closed"),
            }
        }

        if !self.interfaces.contains(endpoint.interface()) {
            debug!(plugin = %self.name, endpoint = %endpoint, "interface not served");
            return QueryResponse::wrong_interface();
        }

        let response = self
            .responses
            .get(endpoint.url())
            .unwrap_or(&self.fallback)
            .clone();
        debug!(
            plugin = %self.name,
            endpoint = %endpoint,
            outcome = %response.outcome(),
            "answering scripted query"
        );
        response
    }

    fn nested_endpoint(&self, entity: &T) -> Option<Endpoint> {
        self.nested.as_ref().and_then(|extract| extract(entity))
    }

    fn is_deliverable(&self, entity: &T) -> bool {
        !(self.hide_referrals && self.nested_endpoint(entity).is_some())
    }
}
