use serde::{Deserialize, Serialize};

/// An externally supplied per-task scheduling override.
///
/// `pid` is matched against the thread-group id on admission and against the
/// process id when picking a time slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchedulingStrategy {
    /// Force the task to the most eligible priority key.
    #[serde(default)]
    pub priority: bool,
    /// Explicit time slice in nanoseconds; 0 means no override.
    #[serde(default)]
    pub execution_time: u64,
    pub pid: i32,
}

/// Envelope returned by the strategy endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulingStrategiesResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub scheduling: Vec<SchedulingStrategy>,
}
