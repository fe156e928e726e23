use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

use super::PredictionSource;
use crate::core::{PredictionMetadata, PredictionPayload, SampleBatch, SensorSample};
use crate::error::{DashboardError, Result};

#[derive(Debug, Clone)]
enum ScriptedResponse {
    Payload(PredictionPayload),
    Fail { status: u16, message: String },
}

/// Prediction source that replays a scripted sequence of responses.
///
/// Once the script is exhausted the last response is repeated. Call counts and
/// peak in-flight calls are recorded for assertions.
pub struct ScriptedPredictionSource {
    script: Mutex<VecDeque<ScriptedResponse>>,
    last: Mutex<Option<ScriptedResponse>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedPredictionSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Simulated network latency applied to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn then_payload(self, payload: PredictionPayload) -> Self {
        self.push(ScriptedResponse::Payload(payload));
        self
    }

    /// Queue a successful response carrying `batch`
    pub fn then_batch(self, batch: SampleBatch) -> Self {
        self.then_payload(payload_with_batch(batch))
    }

    pub fn then_error(self, status: u16, message: impl Into<String>) -> Self {
        self.push(ScriptedResponse::Fail {
            status,
            message: message.into(),
        });
        self
    }

    fn push(&self, response: ScriptedResponse) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Option<ScriptedResponse> {
        let mut script = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) = script.pop_front() {
            *last = Some(next);
        }
        last.clone()
    }
}

impl Default for ScriptedPredictionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionSource for ScriptedPredictionSource {
    fn source_id(&self) -> &str {
        "scripted"
    }

    async fn fetch_prediction(&self, _api_key: &str) -> Result<PredictionPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlightGuard(&self.in_flight);

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        let response = self.next_response();

        match response {
            Some(ScriptedResponse::Payload(payload)) => Ok(payload),
            Some(ScriptedResponse::Fail { status, message }) => {
                Err(DashboardError::Upstream { status, message })
            }
            None => Err(DashboardError::Network("no scripted response".to_string())),
        }
    }
}

/// Releases an in-flight slot even when the fetch future is dropped mid-call
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Minimal successful payload carrying only a sample batch
pub fn payload_with_batch(batch: SampleBatch) -> PredictionPayload {
    PredictionPayload {
        base_models: Vec::new(),
        meta: None,
        metadata: PredictionMetadata::default(),
        input: None,
        batch: Some(batch),
    }
}

/// Batch of `len` samples whose gas channel A counts up from `start`
pub fn ramp_batch(start: f64, len: usize) -> SampleBatch {
    (0..len)
        .map(|i| {
            let v = start + i as f64;
            SensorSample::new([v, v * 2.0, 25.0, 60.0])
        })
        .collect::<Vec<_>>()
        .into()
}
