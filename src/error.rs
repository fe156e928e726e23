use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

/// Failures surfaced by the prediction client and the proxy layer
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Connect/transport failure talking to the Prediction Service
    #[error("network error: {0}")]
    Network(String),

    /// Prediction Service answered with a non-success status
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Caller supplied a malformed request
    #[error("{message}")]
    Validation {
        message: String,
        expected: Option<usize>,
        received: Option<usize>,
    },

    /// Response body could not be decoded into the expected shape
    #[error("invalid response from prediction service: {0}")]
    Parse(String),
}

impl DashboardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            expected: None,
            received: None,
        }
    }

    pub fn length_mismatch(message: impl Into<String>, expected: usize, received: usize) -> Self {
        Self::Validation {
            message: message.into(),
            expected: Some(expected),
            received: Some(received),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Upstream { .. } => "upstream",
            Self::Validation { .. } => "validation",
            Self::Parse(_) => "parse",
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::Parse(err.to_string())
        } else {
            DashboardError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Parse(err.to_string())
    }
}
