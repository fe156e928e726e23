use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::state::StreamState;
use crate::buffers::SharedChartStore;
use crate::config::OverlapPolicy;
use crate::core::SampleBatch;
use crate::observability::DashboardMetrics;

/// Produces the display label for a newly inserted point
pub type LabelFn = Arc<dyn Fn() -> String + Send + Sync>;

pub fn wall_clock_label() -> LabelFn {
    Arc::new(|| chrono::Local::now().format("%H:%M:%S").to_string())
}

/// Result of handing a batch to the streamer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Started,
    /// Held until the current replay drains
    Queued,
    Dropped,
    Empty,
}

#[derive(Default)]
struct StreamerInner {
    state: StreamState,
    batch: Option<SampleBatch>,
    cursor: usize,
    pending: Option<SampleBatch>,
    token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Clone)]
struct ReplayContext {
    inner: Arc<Mutex<StreamerInner>>,
    store: SharedChartStore,
    metrics: Arc<DashboardMetrics>,
    label: LabelFn,
    period: Duration,
}

impl ReplayContext {
    fn lock(&self) -> MutexGuard<'_, StreamerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert the sample under the cursor. Returns true while more samples remain.
    fn insert_next(&self, inner: &mut StreamerInner) -> bool {
        let Some(len) = inner.batch.as_ref().map(SampleBatch::len) else {
            return false;
        };
        let sample = inner
            .batch
            .as_ref()
            .and_then(|batch| batch.get(inner.cursor))
            .copied();
        if let Some(sample) = sample {
            let label = (self.label)();
            self.store.push_sample(&label, &sample);
            self.metrics.record_sample_inserted();
            inner.cursor += 1;
        }
        if inner.cursor < len {
            return true;
        }

        match inner.pending.take() {
            Some(next) => {
                log::debug!("Replay drained, starting queued batch of {} samples", next.len());
                self.metrics.record_batch_started();
                inner.batch = Some(next);
                inner.cursor = 0;
                true
            }
            None => {
                inner.state = StreamState::Idle;
                inner.batch = None;
                inner.cursor = 0;
                inner.token = None;
                inner.handle = None;
                false
            }
        }
    }

    async fn run(self, token: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = sleep(self.period) => {}
            }

            let mut inner = self.lock();
            // stop() may have won the lock while we were waking up
            if token.is_cancelled() {
                return;
            }
            if !self.insert_next(&mut inner) {
                return;
            }
        }
    }
}

/// Replays sample batches into the chart store at a fixed cadence,
/// decoupled from the cadence at which batches are fetched.
pub struct SampleStreamer {
    ctx: ReplayContext,
    policy: OverlapPolicy,
}

impl SampleStreamer {
    pub fn new(
        store: SharedChartStore,
        period: Duration,
        policy: OverlapPolicy,
        metrics: Arc<DashboardMetrics>,
    ) -> Self {
        Self {
            ctx: ReplayContext {
                inner: Arc::new(Mutex::new(StreamerInner::default())),
                store,
                metrics,
                label: wall_clock_label(),
                period,
            },
            policy,
        }
    }

    pub fn with_label_fn(mut self, label: LabelFn) -> Self {
        self.ctx.label = label;
        self
    }

    /// Start replaying `batch`.
    ///
    /// The first sample is inserted before this returns; the rest follow one
    /// per period. Must be called from within a tokio runtime.
    pub fn begin_stream(&self, batch: SampleBatch) -> StreamOutcome {
        if batch.is_empty() {
            return StreamOutcome::Empty;
        }

        let mut inner = self.ctx.lock();
        if !inner.state.can_transition_to(&StreamState::Streaming) {
            return match self.policy {
                OverlapPolicy::QueueLatest => {
                    if inner.pending.replace(batch).is_some() {
                        log::debug!("Replacing queued batch with a newer one");
                    }
                    self.ctx.metrics.record_batch_queued();
                    StreamOutcome::Queued
                }
                OverlapPolicy::Drop => {
                    log::warn!(
                        "Dropping batch of {} samples, replay still at {}",
                        batch.len(),
                        inner.cursor
                    );
                    self.ctx.metrics.record_batch_dropped();
                    StreamOutcome::Dropped
                }
            };
        }

        inner.state = StreamState::Streaming;
        inner.batch = Some(batch);
        inner.cursor = 0;
        self.ctx.metrics.record_batch_started();

        if self.ctx.insert_next(&mut inner) {
            let token = CancellationToken::new();
            let handle = tokio::spawn(self.ctx.clone().run(token.clone()));
            inner.token = Some(token);
            inner.handle = Some(handle);
        }
        StreamOutcome::Started
    }

    /// Cancel the replay and discard current and queued batches.
    ///
    /// No insertion happens after this returns. Returns false if nothing was streaming.
    pub fn stop(&self) -> bool {
        let mut inner = self.ctx.lock();
        if let Some(token) = inner.token.take() {
            token.cancel();
        }
        if let Some(handle) = inner.handle.take() {
            handle.abort();
        }
        let was_streaming = inner.state.can_transition_to(&StreamState::Idle);
        if was_streaming {
            log::debug!("Replay stopped at sample {}", inner.cursor);
        }
        inner.state = StreamState::Idle;
        inner.batch = None;
        inner.pending = None;
        inner.cursor = 0;
        was_streaming
    }

    pub fn state(&self) -> StreamState {
        self.ctx.lock().state
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == StreamState::Streaming
    }

    /// Index of the next sample to insert from the current batch
    pub fn cursor(&self) -> usize {
        self.ctx.lock().cursor
    }

    pub fn has_pending(&self) -> bool {
        self.ctx.lock().pending.is_some()
    }

    pub fn period(&self) -> Duration {
        self.ctx.period
    }

    pub fn store(&self) -> &SharedChartStore {
        &self.ctx.store
    }
}

impl Drop for SampleStreamer {
    fn drop(&mut self) {
        self.stop();
    }
}
