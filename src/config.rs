use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// What the streamer does with a batch that arrives mid-replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Hold the newest arriving batch and replay it once the current one drains
    #[default]
    QueueLatest,
    /// Discard batches that arrive while a replay is in progress
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub backend_url: String,
    pub refresh_interval_ms: u64,
    pub stream_interval_ms: u64,
    pub buffer_capacity: usize,
    pub overlap_policy: OverlapPolicy,
    pub request_timeout_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            refresh_interval_ms: 30_000,
            stream_interval_ms: 3_000,
            buffer_capacity: 15,
            overlap_policy: OverlapPolicy::QueueLatest,
            request_timeout_ms: 10_000,
        }
    }
}

impl DashboardConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file, writing defaults first if it does not exist.
    /// Environment overrides are applied on top of the file contents.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
            let json = serde_json::to_string_pretty(&Self::default())?;
            fs::write(path, json)
                .await
                .context("Failed to write default config")?;
        }

        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let mut config: Self =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject cadences and capacities the cycles cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_ms == 0 {
            anyhow::bail!("refresh_interval_ms must be greater than zero");
        }
        if self.stream_interval_ms == 0 {
            anyhow::bail!("stream_interval_ms must be greater than zero");
        }
        if self.buffer_capacity == 0 {
            anyhow::bail!("buffer_capacity must be greater than zero");
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("BACKEND_API_URL") {
            if !url.trim().is_empty() {
                self.backend_url = url;
            }
        }
        if let Some(ms) = env_number("ENOSE_REFRESH_MS")? {
            self.refresh_interval_ms = ms;
        }
        if let Some(ms) = env_number("ENOSE_STREAM_MS")? {
            self.stream_interval_ms = ms;
        }
        if let Some(capacity) = env_number("ENOSE_BUFFER_CAPACITY")? {
            self.buffer_capacity = capacity as usize;
        }
        if let Ok(policy) = std::env::var("ENOSE_OVERLAP_POLICY") {
            self.overlap_policy = match policy.as_str() {
                "queue_latest" => OverlapPolicy::QueueLatest,
                "drop" => OverlapPolicy::Drop,
                other => anyhow::bail!("Unknown overlap policy: {}", other),
            };
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number, got '{}'", name, raw)),
        Err(_) => Ok(None),
    }
}
