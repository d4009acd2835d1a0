//! Weighted virtual-time and FIFO policies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use gthulhu_core::config::DEFAULT_TASK_POOL_SIZE;
use gthulhu_core::vtime::{non_zero, saturating_sub};
use gthulhu_core::{PluginError, QueuedTask, SchedConfig};

use crate::context::PluginContext;
use crate::contract::{CustomScheduler, Sched};
use crate::pool::{capacity_for, OrderedPool, PoolEntry, TaskPool};
use crate::registry::PluginRegistry;

pub const MODE_WEIGHTED: &str = "simple";
pub const MODE_FIFO: &str = "simple-fifo";

/// 0.5 ms.
pub const DEFAULT_SLICE_NS: u64 = 500_000;

/// Admission and selection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub drained: u64,
    pub dispatched: u64,
}

#[derive(Debug)]
struct SimpleState {
    pool: OrderedPool,
    vtime_now: u64,
    arrivals: u64,
    stats: PoolStats,
}

/// Pool ordered by clamped vtime, or by arrival in FIFO mode.
#[derive(Debug)]
pub struct SimplePlugin {
    fifo: bool,
    slice_default: AtomicU64,
    state: Mutex<SimpleState>,
}

impl SimplePlugin {
    pub fn new(fifo: bool, slice_default: u64) -> Self {
        Self::with_pool_size(fifo, slice_default, DEFAULT_TASK_POOL_SIZE)
    }

    pub fn with_pool_size(fifo: bool, slice_default: u64, pool_size: usize) -> Self {
        let slice_default = if slice_default > 0 { slice_default } else { DEFAULT_SLICE_NS };
        Self {
            fifo,
            slice_default: AtomicU64::new(slice_default),
            state: Mutex::new(SimpleState {
                pool: OrderedPool::new(capacity_for(pool_size), fifo),
                vtime_now: 1,
                arrivals: 0,
                stats: PoolStats::default(),
            }),
        }
    }

    pub fn is_fifo(&self) -> bool {
        self.fifo
    }

    pub fn slice_default(&self) -> u64 {
        self.slice_default.load(Ordering::Relaxed)
    }

    pub fn set_slice_default(&self, slice_ns: u64) {
        self.slice_default.store(slice_ns, Ordering::Relaxed);
    }

    /// Global fairness clock.
    pub fn vtime_now(&self) -> u64 {
        self.state().vtime_now
    }

    pub fn stats(&self) -> PoolStats {
        self.state().stats
    }

    pub fn reset_stats(&self) {
        self.state().stats = PoolStats::default();
    }

    /// Charge `exec_ns` of runtime to the task, scaled by the inverse of its
    /// weight. The key never decreases. No-op in FIFO mode.
    pub fn update_stopping_task(&self, task: &mut QueuedTask, exec_ns: u64) {
        if self.fifo {
            return;
        }
        let charge = exec_ns.saturating_mul(100) / task.effective_weight();
        task.vtime = non_zero(task.vtime.saturating_add(charge));
    }

    fn state(&self) -> MutexGuard<'_, SimpleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admission_key(&self, state: &mut SimpleState, task: &QueuedTask) -> u64 {
        state.arrivals += 1;
        if self.fifo {
            return state.arrivals;
        }
        // an idle task may claim at most one slice of credit
        let floor = saturating_sub(state.vtime_now, self.slice_default());
        non_zero(task.vtime.max(floor))
    }
}

impl CustomScheduler for SimplePlugin {
    fn name(&self) -> &str {
        if self.fifo { MODE_FIFO } else { MODE_WEIGHTED }
    }

    fn drain_queued_tasks(&self, source: &mut dyn Sched) -> usize {
        let mut count = 0;
        loop {
            if self.state().pool.is_full() {
                break;
            }
            let task = source.dequeue_task();
            if task.is_sentinel() {
                break;
            }
            if !task.is_valid() {
                continue;
            }

            let mut state = self.state();
            let key = self.admission_key(&mut state, &task);
            if state.pool.insert(PoolEntry::new(task, key, task.start_ts)).is_err() {
                break;
            }
            state.stats.drained += 1;
            count += 1;
        }
        if count > 0 {
            debug!(policy = self.name(), admitted = count, "drained queued tasks");
        }
        count
    }

    fn select_queued_task(&self, _source: &mut dyn Sched) -> Option<QueuedTask> {
        let mut state = self.state();
        let entry = state.pool.pop()?;
        state.stats.dispatched += 1;

        let mut task = entry.task;
        if !self.fifo {
            task.vtime = non_zero(task.vtime);
            state.vtime_now = non_zero(state.vtime_now.max(entry.key));
        }
        Some(task)
    }

    fn select_cpu(&self, source: &mut dyn Sched, task: &QueuedTask) -> Result<i32, PluginError> {
        source.default_select_cpu(task)
    }

    fn determine_time_slice(&self, _source: &mut dyn Sched, _task: &QueuedTask) -> u64 {
        self.slice_default()
    }

    fn pool_count(&self) -> u64 {
        self.state().pool.len() as u64
    }

    fn on_task_stopped(&self, task: &mut QueuedTask, exec_ns: u64) {
        self.update_stopping_task(task, exec_ns);
    }
}

fn build(fifo: bool, config: &SchedConfig) -> SimplePlugin {
    SimplePlugin::with_pool_size(
        fifo,
        config.scheduler.slice_ns_default,
        config.scheduler.task_pool_size,
    )
}

/// Register `simple` and `simple-fifo`.
pub fn register(registry: &PluginRegistry) -> Result<(), PluginError> {
    registry.register(MODE_WEIGHTED, |_ctx: &PluginContext, config: &SchedConfig| {
        Ok(Box::new(build(false, config)) as Box<dyn CustomScheduler>)
    })?;
    registry.register(MODE_FIFO, |_ctx: &PluginContext, config: &SchedConfig| {
        Ok(Box::new(build(true, config)) as Box<dyn CustomScheduler>)
    })
}
