//! Strategy override source backed by the scheduling API.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use gthulhu_core::{SchedulingStrategiesResponse, SchedulingStrategy};

use crate::auth::JwtClient;
use crate::error::ApiError;

pub const STRATEGIES_PATH: &str = "/api/v1/scheduling/strategies";

/// Anything that can produce a full snapshot of scheduling overrides.
///
/// `Ok(None)` means the source answered but declined to provide a snapshot;
/// callers keep whatever they had.
#[async_trait]
pub trait StrategySource: Send + Sync {
    async fn fetch(&self) -> Result<Option<Vec<SchedulingStrategy>>, ApiError>;

    /// Human-readable name for logging.
    fn describe(&self) -> String;
}

pub struct HttpStrategySource {
    client: Arc<JwtClient>,
    url: String,
}

impl HttpStrategySource {
    pub fn new(client: Arc<JwtClient>) -> Self {
        let url = client.endpoint(STRATEGIES_PATH);
        Self { client, url }
    }
}

#[async_trait]
impl StrategySource for HttpStrategySource {
    async fn fetch(&self) -> Result<Option<Vec<SchedulingStrategy>>, ApiError> {
        let response = self
            .client
            .request(reqwest::Method::GET, &self.url)
            .await?
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body: SchedulingStrategiesResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if !body.success {
            debug!(url = %self.url, message = %body.message, "strategy endpoint reported failure");
            return Ok(None);
        }

        Ok(Some(body.scheduling))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
