use serde::{Deserialize, Serialize};

/// Refresh loop lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    #[default]
    Idle,
    Running,
    Stopping,
}

impl LoopState {
    /// Check if transition from current state to target state is valid
    pub fn can_transition_to(&self, target: &LoopState) -> bool {
        use LoopState::*;

        matches!(
            (self, target),
            (Idle, Running) |
            // Stop requested, or the fetch failed
            (Running, Stopping) |
            (Stopping, Idle)
        )
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
        }
    }
}

/// Sample replay lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
}

impl StreamState {
    pub fn can_transition_to(&self, target: &StreamState) -> bool {
        use StreamState::*;

        matches!((self, target), (Idle, Streaming) | (Streaming, Idle))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Streaming => "Streaming",
        }
    }
}
