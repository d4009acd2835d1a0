use std::collections::VecDeque;

use gthulhu_core::{PluginError, QueuedTask};

use crate::contract::Sched;

/// Task source replaying a fixed queue.
pub(crate) struct VecSource {
    tasks: VecDeque<QueuedTask>,
    cpu: Option<i32>,
}

impl VecSource {
    pub(crate) fn new(tasks: impl IntoIterator<Item = QueuedTask>) -> Self {
        Self {
            tasks: tasks.into_iter().collect(),
            cpu: Some(0),
        }
    }

    pub(crate) fn with_cpu(mut self, cpu: i32) -> Self {
        self.cpu = Some(cpu);
        self
    }

    /// CPU selection always fails.
    pub(crate) fn without_cpus(mut self) -> Self {
        self.cpu = None;
        self
    }

    pub(crate) fn push(&mut self, task: QueuedTask) {
        self.tasks.push_back(task);
    }
}

impl Sched for VecSource {
    fn dequeue_task(&mut self) -> QueuedTask {
        self.tasks.pop_front().unwrap_or_else(QueuedTask::sentinel)
    }

    fn default_select_cpu(&mut self, task: &QueuedTask) -> Result<i32, PluginError> {
        self.cpu
            .ok_or_else(|| PluginError::SourceUnavailable(format!("no idle CPU for pid {}", task.pid)))
    }

    fn nr_queued(&self) -> u64 {
        self.tasks.len() as u64
    }
}
