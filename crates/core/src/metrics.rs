use serde::{Deserialize, Serialize};

/// Scheduler counters pushed to the monitoring API.
///
/// Field names match the API server's JSON schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BssData {
    /// Timestamp of the last userspace scheduler run.
    pub usersched_last_run_at: u64,
    /// Tasks queued in the userspace scheduler.
    pub nr_queued: u64,
    /// Tasks scheduled by the userspace scheduler.
    pub nr_scheduled: u64,
    /// Tasks currently running.
    pub nr_running: u64,
    pub nr_online_cpus: u64,
    pub nr_user_dispatches: u64,
    pub nr_kernel_dispatches: u64,
    pub nr_cancel_dispatches: u64,
    pub nr_bounce_dispatches: u64,
    pub nr_failed_dispatches: u64,
    /// Times the scheduler was congested.
    pub nr_sched_congested: u64,
}
