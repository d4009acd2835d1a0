//! Rate-limited push of scheduler counters to the API server.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use gthulhu_core::BssData;

use crate::auth::JwtClient;
use crate::error::ApiError;

pub const METRICS_PATH: &str = "/api/v1/metrics";
const MIN_SEND_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of a push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    /// Dropped because the previous successful push was too recent.
    Throttled,
}

pub struct MetricsPusher {
    client: Arc<JwtClient>,
    url: String,
    min_interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl MetricsPusher {
    pub fn new(client: Arc<JwtClient>) -> Self {
        let url = client.endpoint(METRICS_PATH);
        Self {
            client,
            url,
            min_interval: MIN_SEND_INTERVAL,
            last_sent: Mutex::new(None),
        }
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Claim the next send window, returning the previous stamp so a failed
    /// send can hand the window back. `None` means throttled.
    fn reserve_slot(&self) -> Option<Option<Instant>> {
        let mut last = self.last_sent.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*last, Some(at) if at.elapsed() < self.min_interval) {
            return None;
        }
        Some(last.replace(Instant::now()))
    }

    fn release_slot(&self, previous: Option<Instant>) {
        *self.last_sent.lock().unwrap_or_else(PoisonError::into_inner) = previous;
    }

    pub async fn push(&self, data: &BssData) -> Result<PushOutcome, ApiError> {
        let Some(previous) = self.reserve_slot() else {
            return Ok(PushOutcome::Throttled);
        };

        match self.send(data).await {
            Ok(()) => {
                debug!(url = %self.url, "sent metrics to API server");
                Ok(PushOutcome::Sent)
            }
            Err(e) => {
                self.release_slot(previous);
                Err(e)
            }
        }
    }

    async fn send(&self, data: &BssData) -> Result<(), ApiError> {
        let response = self
            .client
            .request(reqwest::Method::POST, &self.url)
            .await?
            .json(data)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Fire-and-forget push on the given runtime; failures are only logged.
    pub fn push_detached(self: &Arc<Self>, runtime: &tokio::runtime::Handle, data: BssData) {
        let pusher = Arc::clone(self);
        runtime.spawn(async move {
            if let Err(e) = pusher.push(&data).await {
                warn!(error = %e, "failed to send metrics");
            }
        });
    }
}
