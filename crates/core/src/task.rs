use serde::{Deserialize, Serialize};

/// Pid reported by the task source when no runnable task is available.
pub const SENTINEL_PID: i32 = -1;

/// A task the kernel side has marked runnable, as handed over by the task source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTask {
    /// Process id; [`SENTINEL_PID`] means "no task".
    pub pid: i32,
    /// CPU the task last ran on.
    pub cpu: i32,
    /// Cardinality of the task's CPU affinity mask.
    pub nr_cpus_allowed: u64,
    /// Enqueue flags.
    pub flags: u64,
    /// Timestamp of the last time the task was scheduled on a CPU.
    pub start_ts: u64,
    /// Timestamp of the last time the task released a CPU.
    pub stop_ts: u64,
    /// Cumulative consumed CPU time.
    pub sum_exec_runtime: u64,
    /// Static weight. Zero is never used as a divisor.
    pub weight: u64,
    /// Current virtual time.
    pub vtime: u64,
    /// Thread-group id.
    pub tgid: i32,
}

impl QueuedTask {
    /// The "no task available" marker.
    pub fn sentinel() -> Self {
        Self {
            pid: SENTINEL_PID,
            ..Self::default()
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.pid == SENTINEL_PID
    }

    /// Only tasks with a positive pid may be admitted into a pool.
    pub fn is_valid(&self) -> bool {
        self.pid > 0
    }

    /// Weight clamped away from zero for use as a divisor.
    pub fn effective_weight(&self) -> u64 {
        self.weight.max(1)
    }

    /// Runtime the kernel side observed between the last start and stop.
    pub fn observed_runtime(&self) -> u64 {
        self.stop_ts.saturating_sub(self.start_ts)
    }
}
