use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, error};

use gthulhu_core::{PluginError, SchedConfig};

use crate::context::PluginContext;
use crate::contract::CustomScheduler;
use crate::{gthulhu, simple};

/// Constructor for one policy mode.
pub type PluginFactory = Arc<
    dyn Fn(&PluginContext, &SchedConfig) -> Result<Box<dyn CustomScheduler>, PluginError> + Send + Sync,
>;

/// Maps a mode name to the constructor of its policy.
/// Thread-safe; lookups and registrations may race from any thread.
pub struct PluginRegistry {
    factories: RwLock<HashMap<String, PluginFactory>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// A registry pre-populated with the built-in policies.
    pub fn with_builtins() -> Result<Self, PluginError> {
        let registry = Self::new();
        register_builtin_plugins(&registry)?;
        Ok(registry)
    }

    /// Process-wide registry holding the built-in policies.
    pub fn global() -> &'static PluginRegistry {
        static GLOBAL: OnceLock<PluginRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let registry = PluginRegistry::new();
            if let Err(e) = register_builtin_plugins(&registry) {
                error!(error = %e, "failed to register built-in plugins");
            }
            registry
        })
    }

    /// Register a constructor. Returns error if `mode` is empty or taken.
    pub fn register<F>(&self, mode: &str, factory: F) -> Result<(), PluginError>
    where
        F: Fn(&PluginContext, &SchedConfig) -> Result<Box<dyn CustomScheduler>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        if mode.is_empty() {
            return Err(PluginError::InvalidArgument("plugin mode cannot be empty".into()));
        }

        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(mode) {
            return Err(PluginError::AlreadyRegistered(mode.to_string()));
        }
        factories.insert(mode.to_string(), Arc::new(factory));
        debug!(mode, "registered plugin");
        Ok(())
    }

    /// Build the policy named by `config.mode`. Constructor errors are
    /// returned unchanged.
    pub fn create(
        &self,
        ctx: &PluginContext,
        config: &SchedConfig,
    ) -> Result<Box<dyn CustomScheduler>, PluginError> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&config.mode)
            .cloned()
            .ok_or_else(|| PluginError::NotFound(config.mode.clone()))?;
        factory(ctx, config)
    }

    /// Registered mode names, in no particular order.
    pub fn registered_modes(&self) -> Vec<String> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn contains(&self, mode: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(mode)
    }

    pub fn len(&self) -> usize {
        self.factories.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register `simple`, `simple-fifo` and `gthulhu`.
pub fn register_builtin_plugins(registry: &PluginRegistry) -> Result<(), PluginError> {
    simple::register(registry)?;
    gthulhu::register(registry)
}
