//! Scheduling core: task pools, ordering policies, strategy overrides and
//! the registry that builds a policy from its mode name.

pub mod context;
pub mod contract;
pub mod gthulhu;
pub mod pool;
pub mod refresher;
pub mod registry;
pub mod simple;
pub mod store;

#[cfg(test)]
mod testing;

pub use context::PluginContext;
pub use contract::{CustomScheduler, Sched};
pub use gthulhu::GthulhuPlugin;
pub use pool::{HeapPool, OrderedPool, PoolEntry, TaskPool};
pub use refresher::{refresh_once, run_refresher, spawn_refresher, RefreshOutcome};
pub use registry::{register_builtin_plugins, PluginFactory, PluginRegistry};
pub use simple::{PoolStats, SimplePlugin};
pub use store::StrategyStore;
