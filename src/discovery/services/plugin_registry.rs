//! Query plugin registry.
//!
//! Maps plugin names to lazily invoked factories, caches loaded instances,
//! and maps declared interface names to the plugin that queries them.
//!
//! # Invariants
//!
//! - A factory runs at most once; later loads return the cached instance
//! - Registration order is preserved and drives unspecified-interface probing
//! - When two plugins declare the same interface, the later one wins

use crate::discovery::{
    domain::{Endpoint, InterfaceName, PluginName, QueryOptions},
    ports::{PluginFactory, QueryPlugin},
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned while loading or resolving query plugins.
#[derive(Debug, Clone, Error)]
pub enum PluginRegistryError {
    /// No plugin is registered under the name.
    #[error("query plugin not found: {0}")]
    NotFound(PluginName),

    /// No loaded plugin declares the interface.
    #[error("no query plugin registered for interface '{0}'")]
    NoPluginForInterface(InterfaceName),

    /// The plugin factory failed.
    #[error("failed to load query plugin {name}: {reason}")]
    LoadFailed {
        /// Plugin name.
        name: PluginName,
        /// Factory error.
        reason: Arc<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for plugin registry operations.
pub type PluginRegistryResult<T> = Result<T, PluginRegistryError>;

/// Registry of protocol-specific query plugins.
///
/// Populated at start-up, indexed once with
/// [`QueryPluginRegistry::index_interfaces`], then used read-only by query
/// tasks.
pub struct QueryPluginRegistry<T: Send + 'static> {
    factories: Vec<(PluginName, PluginFactory<T>)>,
    loaded: RwLock<HashMap<PluginName, Arc<dyn QueryPlugin<T>>>>,
    interfaces: HashMap<InterfaceName, PluginName>,
    usable: Vec<PluginName>,
}

impl<T: Send + 'static> Default for QueryPluginRegistry<T> {
    fn default() -> Self {
        Self {
            factories: Vec::new(),
            loaded: RwLock::new(HashMap::new()),
            interfaces: HashMap::new(),
            usable: Vec::new(),
        }
    }
}

impl<T: Send + 'static> QueryPluginRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already constructed plugin under its own name.
    pub fn register(&mut self, plugin: Arc<dyn QueryPlugin<T>>) {
        let name = plugin.name();
        self.loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::clone(&plugin));
        let factory: PluginFactory<T> = Arc::new(move || Ok(Arc::clone(&plugin)));
        self.insert_factory(name, factory);
    }

    /// Registers a factory constructing the plugin on first load.
    pub fn register_factory(&mut self, name: PluginName, factory: PluginFactory<T>) {
        self.loaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name);
        self.insert_factory(name, factory);
    }

    fn insert_factory(&mut self, name: PluginName, factory: PluginFactory<T>) {
        if let Some(slot) = self
            .factories
            .iter_mut()
            .find(|(registered, _)| *registered == name)
        {
            debug!(plugin = %name, "replacing query plugin registration");
            slot.1 = factory;
        } else {
            debug!(plugin = %name, "registered query plugin");
            self.factories.push((name, factory));
        }
    }

    /// Returns the cached plugin, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`PluginRegistryError::NotFound`] when nothing is registered
    /// under `name`, or [`PluginRegistryError::LoadFailed`] when the factory
    /// fails. Both are logged.
    pub fn load(&self, name: &PluginName) -> PluginRegistryResult<Arc<dyn QueryPlugin<T>>> {
        if let Some(plugin) = self
            .loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(plugin));
        }

        let Some((_, factory)) = self
            .factories
            .iter()
            .find(|(registered, _)| registered == name)
        else {
            warn!(plugin = %name, "query plugin not found");
            return Err(PluginRegistryError::NotFound(name.clone()));
        };

        let mut loaded = self.loaded.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(plugin) = loaded.get(name) {
            return Ok(Arc::clone(plugin));
        }
        let plugin = factory().map_err(|err| {
            warn!(plugin = %name, error = %err, "failed to load query plugin");
            PluginRegistryError::LoadFailed {
                name: name.clone(),
                reason: Arc::from(err),
            }
        })?;
        loaded.insert(name.clone(), Arc::clone(&plugin));
        Ok(plugin)
    }

    /// Loads every registered plugin and maps its interfaces to it.
    ///
    /// Plugins that fail to load, declare no interface, or declare an empty
    /// first interface are left out. Returns the number of usable plugins.
    pub fn index_interfaces(&mut self) -> usize {
        let mut interfaces = HashMap::new();
        let mut usable = Vec::new();

        for (name, _) in &self.factories {
            let Ok(plugin) = self.load(name) else {
                continue;
            };
            let supported = plugin.supported_interfaces();
            let Some(first) = supported.first() else {
                debug!(plugin = %name, "plugin supports no interfaces, skipping it");
                continue;
            };
            if first.is_unspecified() {
                debug!(plugin = %name, "first supported interface is empty, skipping plugin");
                continue;
            }
            for interface in supported.into_iter().filter(|i| !i.is_unspecified()) {
                interfaces.insert(interface, name.clone());
            }
            usable.push(name.clone());
        }

        info!(
            plugins = usable.len(),
            interfaces = interfaces.len(),
            "indexed query plugins"
        );
        self.interfaces = interfaces;
        self.usable = usable;
        self.usable.len()
    }

    /// Returns the plugin configured for `interface`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginRegistryError::NoPluginForInterface`] when no usable
    /// plugin declares the interface, including the unspecified one.
    pub fn resolve_for_interface(
        &self,
        interface: &InterfaceName,
    ) -> PluginRegistryResult<PluginName> {
        self.interfaces
            .get(interface)
            .cloned()
            .ok_or_else(|| PluginRegistryError::NoPluginForInterface(interface.clone()))
    }

    /// Returns the plugins to try, in order, for an endpoint with no declared
    /// interface, each paired with the interface to query it through.
    ///
    /// Plugins ruling the endpoint out are skipped. Plugins supporting a
    /// preferred interface come first; registration order is kept within
    /// each group.
    #[must_use]
    pub fn candidates_for_unspecified(
        &self,
        endpoint: &Endpoint,
        options: &QueryOptions,
    ) -> Vec<(Arc<dyn QueryPlugin<T>>, InterfaceName)> {
        let mut preferred = Vec::new();
        let mut others = Vec::new();

        for name in &self.usable {
            let Ok(plugin) = self.load(name) else {
                debug!(plugin = %name, "problem loading plugin, skipping it");
                continue;
            };
            if plugin.is_endpoint_not_supported(endpoint) {
                debug!(endpoint = %endpoint, plugin = %name, "endpoint not supported by plugin");
                continue;
            }
            let supported = plugin.supported_interfaces();
            if let Some(interface) = supported.iter().find(|i| options.is_preferred(i)) {
                preferred.push((plugin, interface.clone()));
            } else if let Some(first) = supported.into_iter().next() {
                others.push((plugin, first));
            }
        }

        preferred.extend(others);
        preferred
    }

    /// Returns the usable plugin names in registration order.
    #[must_use]
    pub fn plugin_names(&self) -> &[PluginName] {
        &self.usable
    }

    /// Returns the number of registered plugins, usable or not.
    #[must_use]
    pub fn registered_len(&self) -> usize {
        self.factories.len()
    }
}
