//! The host-side dispatch loop.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use gthulhu_core::vtime::{calc_avg, now_ns};
use gthulhu_core::{BssData, PluginError};
use gthulhu_plugin::{CustomScheduler, PluginContext, Sched};

use crate::source::SyntheticSource;

#[derive(Debug, Default)]
pub struct DispatchSummary {
    pub rounds: u64,
    pub dispatched: u64,
    pub cpu_failures: u64,
    /// Dispatches whose slice came from the policy rather than the fallback.
    pub policy_slices: u64,
    /// Moving average of the slices handed out.
    pub avg_slice_ns: u64,
    pub per_cpu: HashMap<i32, u64>,
}

pub struct Driver<'a> {
    policy: &'a dyn CustomScheduler,
    source: SyntheticSource,
    slice_default: u64,
    tick: Duration,
}

impl<'a> Driver<'a> {
    pub fn new(
        policy: &'a dyn CustomScheduler,
        source: SyntheticSource,
        slice_default: u64,
    ) -> Self {
        Self {
            policy,
            source,
            slice_default: slice_default.max(1),
            tick: Duration::ZERO,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Slice the host applies when the policy has no opinion.
    fn fallback_slice(&self) -> u64 {
        let waiting = self.policy.pool_count() + self.source.nr_queued();
        self.slice_default / waiting.max(1)
    }

    /// Run up to `rounds` rounds, stopping early once `ctx` is cancelled.
    pub async fn run(
        &mut self,
        rounds: u64,
        ctx: &PluginContext,
    ) -> Result<DispatchSummary, PluginError> {
        let mut summary = DispatchSummary::default();

        for round in 0..rounds {
            if ctx.is_cancelled() {
                info!(round, "shutdown requested, stopping dispatch loop");
                break;
            }

            let admitted = self.policy.drain_queued_tasks(&mut self.source);
            self.dispatch_pool(&mut summary)?;
            summary.rounds += 1;

            self.report(&summary, admitted as u64);
            if !self.tick.is_zero() {
                tokio::time::sleep(self.tick).await;
            } else {
                tokio::task::yield_now().await;
            }
        }

        Ok(summary)
    }

    fn dispatch_pool(&mut self, summary: &mut DispatchSummary) -> Result<(), PluginError> {
        while let Some(mut task) = self.policy.select_queued_task(&mut self.source) {
            let mut slice = self.policy.determine_time_slice(&mut self.source, &task);
            if slice == 0 {
                slice = self.fallback_slice();
            } else {
                summary.policy_slices += 1;
            }
            summary.avg_slice_ns = calc_avg(summary.avg_slice_ns, slice);

            let cpu = match self.policy.select_cpu(&mut self.source, &task) {
                Ok(cpu) => cpu,
                Err(e) if e.is_transient() => {
                    warn!(pid = task.pid, error = %e, "CPU selection failed, retrying next round");
                    summary.cpu_failures += 1;
                    self.source.requeue(task);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let exec_ns = self.source.run_for(slice);
            self.policy.on_task_stopped(&mut task, exec_ns);
            self.source.complete(task, cpu, exec_ns);

            summary.dispatched += 1;
            *summary.per_cpu.entry(cpu).or_default() += 1;
        }
        Ok(())
    }

    fn report(&self, summary: &DispatchSummary, admitted: u64) {
        self.policy.send_metrics(BssData {
            usersched_last_run_at: now_ns(),
            nr_queued: self.source.nr_queued(),
            nr_scheduled: self.policy.pool_count(),
            nr_online_cpus: summary.per_cpu.len() as u64,
            nr_user_dispatches: summary.dispatched,
            nr_failed_dispatches: summary.cpu_failures,
            ..Default::default()
        });

        let (added, removed) = self.policy.changed_strategies();
        if !added.is_empty() || !removed.is_empty() {
            info!(added = added.len(), removed = removed.len(), "scheduling strategies changed");
        }
        debug!(
            round = summary.rounds,
            admitted,
            dispatched = summary.dispatched,
            sim_ns = self.source.now_ns(),
            "round complete"
        );
    }
}
