//! Background loop keeping a [`StrategyStore`] in sync with a strategy source.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use gthulhu_api::StrategySource;
use gthulhu_core::PluginError;

use crate::store::StrategyStore;

/// Result of one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot replaced with this many targets.
    Replaced(usize),
    /// Source answered without a snapshot; the store is untouched.
    Skipped,
    /// Fetch failed; the store is untouched.
    Failed,
}

/// Fetch once and apply the result to `store`.
pub async fn refresh_once(source: &dyn StrategySource, store: &StrategyStore) -> RefreshOutcome {
    match source.fetch().await {
        Ok(Some(strategies)) => RefreshOutcome::Replaced(store.replace(strategies)),
        Ok(None) => {
            debug!(source = %source.describe(), "no strategy snapshot returned");
            RefreshOutcome::Skipped
        }
        Err(e) => {
            let err = PluginError::from(e);
            warn!(source = %source.describe(), error = %err, "failed to fetch scheduling strategies");
            RefreshOutcome::Failed
        }
    }
}

/// Fetch immediately, then once per `interval`, until `shutdown` becomes
/// `true` or its sender goes away.
pub async fn run_refresher(
    source: Arc<dyn StrategySource>,
    store: Arc<StrategyStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(source = %source.describe(), interval_secs = interval.as_secs(), "strategy refresher started");

    // interval() rejects a zero period
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => break,
            // first tick completes immediately
            _ = ticker.tick() => {
                // an in-flight fetch must not hold up cancellation
                tokio::select! {
                    biased;
                    _ = cancelled(&mut shutdown) => break,
                    _ = refresh_once(source.as_ref(), &store) => {}
                }
            }
        }
    }

    info!(source = %source.describe(), "strategy refresher stopped");
}

/// Resolves once `shutdown` reads `true` or its sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

pub fn spawn_refresher(
    runtime: &Handle,
    source: Arc<dyn StrategySource>,
    store: Arc<StrategyStore>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    runtime.spawn(run_refresher(source, store, interval, shutdown))
}
