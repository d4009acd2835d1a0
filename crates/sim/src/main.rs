//! gthulhu-sim: run a registered scheduling policy against a synthetic
//! workload.

mod cli;
mod driver;
mod source;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use gthulhu_core::config::load_dotenv;
use gthulhu_core::SchedConfig;
use gthulhu_plugin::{PluginContext, PluginRegistry};

use crate::cli::CliArgs;
use crate::driver::Driver;
use crate::source::SyntheticSource;

fn load_config(args: &CliArgs) -> Result<SchedConfig> {
    load_dotenv();

    let mut config = match &args.config {
        Some(path) => SchedConfig::from_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => {
            info!("no config file given, using defaults");
            SchedConfig::for_mode(gthulhu_plugin::gthulhu::MODE)
        }
    };
    config.apply_env_overrides();
    if let Some(mode) = &args.mode {
        config.mode = mode.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    config.log_summary();

    let registry = PluginRegistry::global();
    let mut modes = registry.registered_modes();
    modes.sort();
    info!(modes = ?modes, "registered plugin modes");

    let (ctx, shutdown) = PluginContext::with_runtime(tokio::runtime::Handle::current());
    let policy = registry
        .create(&ctx, &config)
        .with_context(|| format!("failed to create scheduler for mode '{}'", config.mode))?;
    info!(mode = policy.name(), "scheduler created");

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        info!("Ctrl-C received, shutting down");
        shutdown.send(true).ok();
    });

    let slice_default = match config.scheduler.slice_ns_default {
        0 => gthulhu_plugin::gthulhu::DEFAULT_SLICE_NS,
        ns => ns,
    };
    let source = SyntheticSource::new(args.tasks, args.cpus, args.seed);
    let mut driver = Driver::new(policy.as_ref(), source, slice_default)
        .with_tick(Duration::from_millis(args.tick_ms));

    let summary = driver.run(args.rounds, &ctx).await?;

    let mut per_cpu: Vec<_> = summary.per_cpu.iter().collect();
    per_cpu.sort();
    info!(
        rounds = summary.rounds,
        dispatched = summary.dispatched,
        cpu_failures = summary.cpu_failures,
        policy_slices = summary.policy_slices,
        avg_slice_ns = summary.avg_slice_ns,
        per_cpu = ?per_cpu,
        "dispatch summary"
    );

    Ok(())
}
