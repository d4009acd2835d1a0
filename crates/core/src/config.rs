use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_opt(key).and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_opt(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Default number of pool slots; one slot stays reserved.
pub const DEFAULT_TASK_POOL_SIZE: usize = 4096;

// ── Top-level config ──────────────────────────────────────────

/// Configuration bundle handed to a policy constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedConfig {
    /// Registered policy name, e.g. "gthulhu", "simple", "simple-fifo".
    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Consumed only by the strategy/metrics API channel.
    #[serde(default)]
    pub api_config: ApiConfig,
}

impl SchedConfig {
    /// Config for a policy with every other setting at its default.
    pub fn for_mode(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, PluginError> {
        serde_yaml::from_str(yaml).map_err(|e| PluginError::Config(format!("invalid YAML: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
            .map_err(|e| PluginError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `GTHULHU_*` environment overrides on top of file values
    /// (call `load_dotenv()` first).
    pub fn apply_env_overrides(&mut self) {
        if let Some(mode) = env_opt("GTHULHU_MODE") {
            self.mode = mode;
        }
        if let Some(v) = env_u64("GTHULHU_SLICE_NS_DEFAULT") {
            self.scheduler.slice_ns_default = v;
        }
        if let Some(v) = env_u64("GTHULHU_SLICE_NS_MIN") {
            self.scheduler.slice_ns_min = v;
        }
        if let Some(url) = env_opt("GTHULHU_API_BASE_URL") {
            self.api_config.base_url = url;
        }
        if let Some(v) = env_u64("GTHULHU_API_INTERVAL") {
            self.api_config.interval = v;
        }
        if let Some(v) = env_bool("GTHULHU_API_ENABLED") {
            self.api_config.enabled = v;
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (mode: {}):", self.mode);
        tracing::info!(
            "  scheduler: slice_ns_default={}, slice_ns_min={}, task_pool_size={}",
            self.scheduler.slice_ns_default,
            self.scheduler.slice_ns_min,
            self.scheduler.task_pool_size
        );
        tracing::info!(
            "  api:       enabled={}, base_url={}, interval={}s, auth={}, mtls={}",
            self.api_config.enabled,
            if self.api_config.base_url.is_empty() { "(none)" } else { self.api_config.base_url.as_str() },
            self.api_config.interval,
            self.api_config.auth_enabled,
            self.api_config.mtls.enable
        );
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// Time-slice parameters. Zero means "use the policy default".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub slice_ns_default: u64,
    #[serde(default)]
    pub slice_ns_min: u64,
    #[serde(default = "default_task_pool_size")]
    pub task_pool_size: usize,
}

fn default_task_pool_size() -> usize {
    DEFAULT_TASK_POOL_SIZE
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            slice_ns_default: 0,
            slice_ns_min: 0,
            task_pool_size: default_task_pool_size(),
        }
    }
}

// ── API channel ───────────────────────────────────────────────

/// Mutual TLS material for plugin → API server traffic. `cert_pem`/`key_pem`
/// are the plugin's own identity, `ca_pem` the private CA that signed the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MtlsConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub cert_pem: String,
    #[serde(default)]
    pub key_pem: String,
    #[serde(default)]
    pub ca_pem: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub public_key_path: String,
    #[serde(default)]
    pub base_url: String,
    /// Strategy poll interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub auth_enabled: bool,
    #[serde(default)]
    pub mtls: MtlsConfig,
}

fn default_interval() -> u64 {
    5
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            public_key_path: String::new(),
            base_url: String::new(),
            interval: default_interval(),
            enabled: false,
            auth_enabled: false,
            mtls: MtlsConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Whether the strategy refresher and metrics pusher should be wired up.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.base_url.is_empty()
    }

    /// Poll interval, never shorter than one second.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval.max(1))
    }
}
