use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use enose::config::DEFAULT_BACKEND_URL;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub backend_url: String,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000))),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `ENOSE_BIND`, `BACKEND_API_URL` and `ENOSE_REQUEST_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ENOSE_BIND") {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("ENOSE_BIND is not a socket address: {}", addr))?;
        }
        if let Ok(url) = std::env::var("BACKEND_API_URL") {
            if !url.trim().is_empty() {
                config.backend_url = url;
            }
        }
        if let Ok(raw) = std::env::var("ENOSE_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("ENOSE_REQUEST_TIMEOUT_MS must be a number, got '{}'", raw))?;
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
