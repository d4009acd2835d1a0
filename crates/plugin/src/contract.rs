use gthulhu_core::{BssData, PluginError, QueuedTask, SchedulingStrategy};

/// The kernel-side task source a policy drains from and delegates CPU
/// selection to.
pub trait Sched {
    /// Next runnable task, or [`QueuedTask::sentinel()`] when none is pending.
    fn dequeue_task(&mut self) -> QueuedTask;

    /// CPU assignment picked by the source itself.
    fn default_select_cpu(&mut self, task: &QueuedTask) -> Result<i32, PluginError>;

    /// Tasks still pending at the source.
    fn nr_queued(&self) -> u64;
}

/// Uniform policy contract driven by the dispatch loop.
///
/// A loop iteration is: drain, select, determine the slice, select a CPU,
/// dispatch, then report completion through [`on_task_stopped`].
/// Implementations keep all mutable state behind their own locks so a
/// background refresh path can touch it while the loop runs.
///
/// [`on_task_stopped`]: CustomScheduler::on_task_stopped
pub trait CustomScheduler: Send + Sync {
    /// Registered mode name of this policy.
    fn name(&self) -> &str;

    /// Admit tasks from `source` until it is empty or the pool is full.
    /// Returns the number of tasks admitted.
    fn drain_queued_tasks(&self, source: &mut dyn Sched) -> usize;

    /// Remove and return the most eligible resident task.
    fn select_queued_task(&self, source: &mut dyn Sched) -> Option<QueuedTask>;

    fn select_cpu(&self, source: &mut dyn Sched, task: &QueuedTask) -> Result<i32, PluginError>;

    /// Time slice in nanoseconds. Zero means the policy has no opinion and
    /// the caller applies its own default.
    fn determine_time_slice(&self, source: &mut dyn Sched, task: &QueuedTask) -> u64;

    fn pool_count(&self) -> u64;

    /// Accept a metrics payload. Policies without a metrics sink drop it.
    fn send_metrics(&self, _data: BssData) {}

    /// Strategy overrides `(added, removed)` since the previous call.
    fn changed_strategies(&self) -> (Vec<SchedulingStrategy>, Vec<SchedulingStrategy>) {
        (Vec::new(), Vec::new())
    }

    /// Charge a finished run of `exec_ns` nanoseconds back to the task.
    fn on_task_stopped(&self, _task: &mut QueuedTask, _exec_ns: u64) {}
}
