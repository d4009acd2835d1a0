pub mod config;
pub mod error;
pub mod metrics;
pub mod strategy;
pub mod task;
pub mod vtime;

pub use config::{ApiConfig, MtlsConfig, SchedConfig, SchedulerConfig};
pub use error::PluginError;
pub use metrics::BssData;
pub use strategy::{SchedulingStrategiesResponse, SchedulingStrategy};
pub use task::{QueuedTask, SENTINEL_PID};
