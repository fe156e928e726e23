use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::state::LoopState;
use super::streamer::SampleStreamer;
use crate::client::PredictionSource;
use crate::core::PredictionPayload;
use crate::error::{DashboardError, Result};
use crate::observability::DashboardMetrics;

#[derive(Default)]
struct LoopInner {
    state: LoopState,
    token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
    last_error: Option<String>,
    last_prediction: Option<PredictionPayload>,
}

#[derive(Clone)]
struct LoopContext {
    inner: Arc<Mutex<LoopInner>>,
    source: Arc<dyn PredictionSource>,
    streamer: Arc<SampleStreamer>,
    metrics: Arc<DashboardMetrics>,
    interval: Duration,
    api_key: Arc<str>,
}

impl LoopContext {
    fn lock(&self) -> MutexGuard<'_, LoopInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a successful fetch and hand its batch to the streamer
    fn accept(&self, inner: &mut LoopInner, payload: PredictionPayload) {
        match payload.sample_batch() {
            Some(batch) => {
                let outcome = self.streamer.begin_stream(batch.clone());
                log::info!(
                    "Prediction fetched from {} ({} records, batch of {} samples: {:?})",
                    self.source.source_id(),
                    payload.records_fetched().unwrap_or(0),
                    batch.len(),
                    outcome
                );
            }
            None => log::info!(
                "Prediction fetched from {} without sensor batch",
                self.source.source_id()
            ),
        }
        inner.last_prediction = Some(payload);
        inner.last_error = None;
    }

    async fn fetch(&self) -> Result<PredictionPayload> {
        let start = self.metrics.start_fetch();
        let result = self.source.fetch_prediction(&self.api_key).await;
        self.metrics.finish_fetch(start);
        if result.is_err() {
            self.metrics.record_fetch_error();
        }
        result
    }

    async fn run(self, token: CancellationToken) {
        loop {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                result = self.fetch() => result,
            };

            {
                let mut inner = self.lock();
                if token.is_cancelled() {
                    return;
                }
                match result {
                    Ok(payload) => self.accept(&mut inner, payload),
                    Err(e) => {
                        log::warn!("Auto-refresh halted after failed fetch: {}", e);
                        inner.last_error = Some(e.to_string());
                        inner.state = LoopState::Stopping;
                        inner.token = None;
                        inner.handle = None;
                        inner.state = LoopState::Idle;
                        return;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = sleep(self.interval) => {}
            }
        }
    }
}

/// Cancelable fetch → replay → wait cycle.
///
/// At most one cycle runs per loop; a failed fetch ends the cycle and it is
/// not retried until [`start`](Self::start) is called again.
pub struct RefreshLoop {
    ctx: LoopContext,
}

impl RefreshLoop {
    pub fn new(
        source: Arc<dyn PredictionSource>,
        streamer: Arc<SampleStreamer>,
        metrics: Arc<DashboardMetrics>,
        interval: Duration,
        api_key: impl Into<String>,
    ) -> Self {
        let api_key: String = api_key.into();
        Self {
            ctx: LoopContext {
                inner: Arc::new(Mutex::new(LoopInner::default())),
                source,
                streamer,
                metrics,
                interval,
                api_key: api_key.into(),
            },
        }
    }

    /// Start the cycle. Returns `Ok(false)` if it is already running.
    pub fn start(&self) -> Result<bool> {
        if self.ctx.api_key.trim().is_empty() {
            return Err(DashboardError::validation("API key is required"));
        }

        let mut inner = self.ctx.lock();
        if !inner.state.can_transition_to(&LoopState::Running) {
            log::debug!("Auto-refresh already {}", inner.state.name());
            return Ok(false);
        }

        let token = CancellationToken::new();
        inner.handle = Some(tokio::spawn(self.ctx.clone().run(token.clone())));
        inner.token = Some(token);
        inner.state = LoopState::Running;
        inner.last_error = None;
        log::info!(
            "Auto-refresh started every {:?} against {}",
            self.ctx.interval,
            self.ctx.source.source_id()
        );
        Ok(true)
    }

    /// Cancel the cycle and the replay it feeds. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let mut inner = self.ctx.lock();
        if !inner.state.can_transition_to(&LoopState::Stopping) {
            return false;
        }
        inner.state = LoopState::Stopping;

        if let Some(token) = inner.token.take() {
            token.cancel();
        }
        if let Some(handle) = inner.handle.take() {
            handle.abort();
        }
        self.ctx.streamer.stop();

        inner.state = LoopState::Idle;
        log::info!("Auto-refresh stopped");
        true
    }

    /// Single fetch outside the cycle, e.g. a manual "predict now" action.
    ///
    /// Errors are recorded but do not affect a running cycle.
    pub async fn fetch_once(&self) -> Result<PredictionPayload> {
        match self.ctx.fetch().await {
            Ok(payload) => {
                let mut inner = self.ctx.lock();
                self.ctx.accept(&mut inner, payload.clone());
                Ok(payload)
            }
            Err(e) => {
                self.ctx.lock().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn state(&self) -> LoopState {
        self.ctx.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn last_error(&self) -> Option<String> {
        self.ctx.lock().last_error.clone()
    }

    pub fn last_prediction(&self) -> Option<PredictionPayload> {
        self.ctx.lock().last_prediction.clone()
    }

    pub fn interval(&self) -> Duration {
        self.ctx.interval
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
