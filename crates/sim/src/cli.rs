use clap::Parser;

/// Drive a scheduling policy with a synthetic workload.
///
/// Builds the policy through the plugin registry exactly as a real host
/// would, then runs drain/select/dispatch rounds against generated tasks.
#[derive(Parser, Debug)]
#[command(name = "gthulhu-sim", version, about)]
pub struct CliArgs {
    /// Path to the YAML scheduler config (defaults apply when omitted)
    #[arg(long, env = "GTHULHU_CONFIG")]
    pub config: Option<String>,

    /// Policy mode override (simple, simple-fifo, gthulhu, ...)
    #[arg(long)]
    pub mode: Option<String>,

    /// Number of synthetic tasks
    #[arg(long, default_value_t = 64)]
    pub tasks: usize,

    /// Dispatch rounds to run
    #[arg(long, default_value_t = 100)]
    pub rounds: u64,

    /// Simulated CPUs; 0 makes every CPU selection fail
    #[arg(long, default_value_t = 4)]
    pub cpus: u32,

    /// RNG seed for reproducible workloads
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Pause between rounds in milliseconds
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,
}
