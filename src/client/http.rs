use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;

use super::PredictionSource;
use crate::core::{PredictionPayload, SensorSample};
use crate::error::{DashboardError, Result};

/// HTTP client for the externally hosted Prediction Service
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: Client,
    base_url: String,
}

impl HttpPredictionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and return the decoded body untouched
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.client.get(self.url(path)).send().await?;
        read_json(response).await
    }

    /// POST a JSON body to `path` and return the decoded body untouched
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        read_json(response).await
    }

    /// Classify a manually entered sample
    pub async fn predict_sample(&self, sample: &SensorSample) -> Result<PredictionPayload> {
        let body = self
            .post_json("/predict", &json!({ "sensor_data": sample.values() }))
            .await?;
        PredictionPayload::from_value(body)
    }
}

#[async_trait]
impl PredictionSource for HttpPredictionClient {
    fn source_id(&self) -> &str {
        &self.base_url
    }

    async fn fetch_prediction(&self, api_key: &str) -> Result<PredictionPayload> {
        let body = self
            .post_json("/predict", &json!({ "api_key": api_key }))
            .await?;
        PredictionPayload::from_value(body)
    }
}

async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => body
                .get("error")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Backend API error: {}", status.as_u16())),
            Err(_) => "Unknown error".to_string(),
        };
        return Err(DashboardError::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_slice(&bytes)?)
}
