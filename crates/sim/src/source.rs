use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gthulhu_core::{PluginError, QueuedTask};
use gthulhu_plugin::Sched;

const FIRST_PID: i32 = 1000;

/// Stand-in for the kernel side: hands out generated runnable tasks and
/// takes them back once they have run.
pub struct SyntheticSource {
    pending: VecDeque<QueuedTask>,
    nr_cpus: u32,
    next_cpu: u32,
    now_ns: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(tasks: usize, nr_cpus: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let pending = (0..tasks)
            .map(|i| {
                let pid = FIRST_PID + i as i32;
                // a few threads share a group with their predecessor
                let tgid = if i > 0 && rng.gen_bool(0.2) { pid - 1 } else { pid };
                let vtime = if rng.gen_bool(0.1) { 0 } else { rng.gen_range(1..5_000_000) };
                QueuedTask {
                    pid,
                    tgid,
                    cpu: -1,
                    nr_cpus_allowed: u64::from(nr_cpus.max(1)),
                    weight: rng.gen_range(1..=1_000),
                    vtime,
                    ..Default::default()
                }
            })
            .collect();

        Self {
            pending,
            nr_cpus,
            next_cpu: 0,
            now_ns: 1,
            rng,
        }
    }

    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    /// Simulated runtime for a slice: between a quarter and all of it.
    pub fn run_for(&mut self, slice_ns: u64) -> u64 {
        let slice_ns = slice_ns.max(4);
        self.rng.gen_range(slice_ns / 4..=slice_ns)
    }

    /// Put a task back after it ran for `exec_ns` on `cpu`.
    pub fn complete(&mut self, mut task: QueuedTask, cpu: i32, exec_ns: u64) {
        task.cpu = cpu;
        task.start_ts = self.now_ns;
        self.now_ns = self.now_ns.saturating_add(exec_ns);
        task.stop_ts = self.now_ns;
        task.sum_exec_runtime = task.sum_exec_runtime.saturating_add(exec_ns);
        self.pending.push_back(task);
    }

    /// Put a task back untouched, e.g. after CPU selection failed.
    pub fn requeue(&mut self, task: QueuedTask) {
        self.pending.push_back(task);
    }
}

impl Sched for SyntheticSource {
    fn dequeue_task(&mut self) -> QueuedTask {
        self.pending.pop_front().unwrap_or_else(QueuedTask::sentinel)
    }

    fn default_select_cpu(&mut self, task: &QueuedTask) -> Result<i32, PluginError> {
        if self.nr_cpus == 0 {
            return Err(PluginError::SourceUnavailable(format!(
                "no online CPU for pid {}",
                task.pid
            )));
        }
        let cpu = self.next_cpu;
        self.next_cpu = (self.next_cpu + 1) % self.nr_cpus;
        Ok(cpu as i32)
    }

    fn nr_queued(&self) -> u64 {
        self.pending.len() as u64
    }
}
