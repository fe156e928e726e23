use async_trait::async_trait;

use crate::core::PredictionPayload;
use crate::error::Result;

/// Anything the refresh loop can pull predictions from
#[async_trait]
pub trait PredictionSource: Send + Sync {
    /// Identifier used in logs (e.g. "http://localhost:5000", "scripted")
    fn source_id(&self) -> &str;

    /// Fetch one prediction for the telemetry feed behind `api_key`
    async fn fetch_prediction(&self, api_key: &str) -> Result<PredictionPayload>;
}
