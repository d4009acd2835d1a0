//! Deadline-ordered policy with externally supplied strategy overrides.
//!
//! Tasks are keyed by a deadline derived from their virtual time plus the
//! runtime the kernel side already observed, and held in a min-heap. A
//! strategy override for the task's thread group replaces that computation:
//! priority targets are keyed at 0 and run first. Overrides are also
//! consulted per pid when choosing a time slice.
//!
//! The fairness clock here moves on admission only, and forced-priority keys
//! stay at 0. Both differ from the weighted-vtime policy on purpose.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use gthulhu_api::{HttpStrategySource, JwtClient, MetricsPusher, StrategySource};
use gthulhu_core::config::DEFAULT_TASK_POOL_SIZE;
use gthulhu_core::vtime::{non_zero, saturating_sub};
use gthulhu_core::{BssData, PluginError, QueuedTask, SchedConfig, SchedulingStrategy};

use crate::context::PluginContext;
use crate::contract::{CustomScheduler, Sched};
use crate::pool::{capacity_for, HeapPool, PoolEntry, TaskPool};
use crate::refresher::spawn_refresher;
use crate::registry::PluginRegistry;
use crate::store::StrategyStore;

pub const MODE: &str = "gthulhu";

/// 5 ms.
pub const DEFAULT_SLICE_NS: u64 = 5_000_000;
/// 0.5 ms.
pub const DEFAULT_SLICE_MIN_NS: u64 = 500_000;

struct DeadlineState {
    heap: HeapPool,
    /// Zero until the first non-overridden admission.
    min_vruntime: u64,
}

struct MetricsSink {
    pusher: Arc<MetricsPusher>,
    runtime: Handle,
}

pub struct GthulhuPlugin {
    slice_default: AtomicU64,
    slice_min: AtomicU64,
    state: Mutex<DeadlineState>,
    strategies: Arc<StrategyStore>,
    metrics: Option<MetricsSink>,
    refresher: Option<JoinHandle<()>>,
}

impl GthulhuPlugin {
    /// Zero for either slice keeps its default.
    pub fn new(slice_ns_default: u64, slice_ns_min: u64) -> Self {
        Self::with_pool_size(slice_ns_default, slice_ns_min, DEFAULT_TASK_POOL_SIZE)
    }

    pub fn with_pool_size(slice_ns_default: u64, slice_ns_min: u64, pool_size: usize) -> Self {
        let plugin = Self {
            slice_default: AtomicU64::new(DEFAULT_SLICE_NS),
            slice_min: AtomicU64::new(DEFAULT_SLICE_MIN_NS),
            state: Mutex::new(DeadlineState {
                heap: HeapPool::new(capacity_for(pool_size)),
                min_vruntime: 0,
            }),
            strategies: Arc::new(StrategyStore::new()),
            metrics: None,
            refresher: None,
        };
        plugin.set_scheduler_config(slice_ns_default, slice_ns_min);
        plugin
    }

    /// Forward `send_metrics` payloads to `pusher` on `runtime`.
    pub fn with_metrics(mut self, pusher: Arc<MetricsPusher>, runtime: Handle) -> Self {
        self.metrics = Some(MetricsSink { pusher, runtime });
        self
    }

    /// `(slice_ns_default, slice_ns_min)`.
    pub fn scheduler_config(&self) -> (u64, u64) {
        (
            self.slice_default.load(Ordering::Relaxed),
            self.slice_min.load(Ordering::Relaxed),
        )
    }

    /// Zero leaves the current value in place.
    pub fn set_scheduler_config(&self, slice_ns_default: u64, slice_ns_min: u64) {
        if slice_ns_default > 0 {
            self.slice_default.store(slice_ns_default, Ordering::Relaxed);
        }
        if slice_ns_min > 0 {
            self.slice_min.store(slice_ns_min, Ordering::Relaxed);
        }
    }

    pub fn min_vruntime(&self) -> u64 {
        self.state().min_vruntime
    }

    /// Shared handle to the override store, for a refresher to write into.
    pub fn strategy_store(&self) -> Arc<StrategyStore> {
        Arc::clone(&self.strategies)
    }

    pub fn update_strategy_map(&self, strategies: Vec<SchedulingStrategy>) {
        self.strategies.replace(strategies);
    }

    fn state(&self) -> MutexGuard<'_, DeadlineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compute the deadline key and rewrite `task.vtime` to it.
    fn admit(&self, state: &mut DeadlineState, task: &mut QueuedTask) -> u64 {
        if let Some(strategy) = self.strategies.get(task.tgid) {
            // overrides leave the clock alone apart from initializing it
            state.min_vruntime = non_zero(state.min_vruntime);
            if strategy.priority {
                task.vtime = 0;
            }
            return task.vtime;
        }

        let slice = self.slice_default.load(Ordering::Relaxed);
        let weight = task.effective_weight();

        state.min_vruntime = non_zero(state.min_vruntime.max(task.vtime));
        let floor = saturating_sub(state.min_vruntime, slice);

        let base = if task.vtime == 0 {
            floor.saturating_add(slice.saturating_mul(100) / weight)
        } else {
            task.vtime.max(floor)
        };
        let charged = task.observed_runtime().saturating_mul(weight) / 100;

        task.vtime = non_zero(base.saturating_add(charged));
        task.vtime
    }
}

impl Drop for GthulhuPlugin {
    fn drop(&mut self) {
        if let Some(handle) = self.refresher.take() {
            handle.abort();
        }
    }
}

impl CustomScheduler for GthulhuPlugin {
    fn name(&self) -> &str {
        MODE
    }

    fn drain_queued_tasks(&self, source: &mut dyn Sched) -> usize {
        let mut count = 0;
        loop {
            if self.state().heap.is_full() {
                break;
            }
            let mut task = source.dequeue_task();
            if !task.is_valid() {
                break;
            }

            let mut state = self.state();
            let key = self.admit(&mut state, &mut task);
            if state.heap.insert(PoolEntry::new(task, key, task.start_ts)).is_err() {
                break;
            }
            count += 1;
        }
        if count > 0 {
            debug!(policy = MODE, admitted = count, "drained queued tasks");
        }
        count
    }

    fn select_queued_task(&self, _source: &mut dyn Sched) -> Option<QueuedTask> {
        self.state().heap.pop().map(|entry| entry.task)
    }

    fn select_cpu(&self, source: &mut dyn Sched, task: &QueuedTask) -> Result<i32, PluginError> {
        source.default_select_cpu(task)
    }

    fn determine_time_slice(&self, _source: &mut dyn Sched, task: &QueuedTask) -> u64 {
        self.strategies
            .get(task.pid)
            .map(|s| s.execution_time)
            .unwrap_or(0)
    }

    fn pool_count(&self) -> u64 {
        self.state().heap.len() as u64
    }

    fn send_metrics(&self, data: BssData) {
        match &self.metrics {
            Some(sink) => sink.pusher.push_detached(&sink.runtime, data),
            None => debug!("no metrics sink configured, dropping payload"),
        }
    }

    fn changed_strategies(&self) -> (Vec<SchedulingStrategy>, Vec<SchedulingStrategy>) {
        self.strategies.changed_since_last_report()
    }
}

fn build(ctx: &PluginContext, config: &SchedConfig) -> Result<GthulhuPlugin, PluginError> {
    let mut plugin = GthulhuPlugin::with_pool_size(
        config.scheduler.slice_ns_default,
        config.scheduler.slice_ns_min,
        config.scheduler.task_pool_size,
    );

    let api = &config.api_config;
    if !api.is_configured() {
        return Ok(plugin);
    }

    let runtime = ctx.runtime.clone().ok_or_else(|| {
        PluginError::Config("strategy refresh requires a tokio runtime in the plugin context".into())
    })?;

    let client = Arc::new(JwtClient::new(
        &api.public_key_path,
        &api.base_url,
        api.auth_enabled,
        &api.mtls,
    )?);
    let pusher = Arc::new(MetricsPusher::new(Arc::clone(&client)));
    let source: Arc<dyn StrategySource> = Arc::new(HttpStrategySource::new(Arc::clone(&client)));

    info!(
        base_url = %api.base_url,
        auth_enabled = client.auth_enabled(),
        interval_secs = api.poll_interval().as_secs(),
        "starting strategy refresher"
    );
    plugin.refresher = Some(spawn_refresher(
        &runtime,
        source,
        plugin.strategy_store(),
        api.poll_interval(),
        ctx.shutdown.clone(),
    ));

    Ok(plugin.with_metrics(pusher, runtime))
}

/// Register `gthulhu`.
pub fn register(registry: &PluginRegistry) -> Result<(), PluginError> {
    registry.register(MODE, |ctx: &PluginContext, config: &SchedConfig| {
        build(ctx, config).map(|p| Box::new(p) as Box<dyn CustomScheduler>)
    })
}
