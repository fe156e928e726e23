use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use super::refresh::RefreshLoop;
use super::state::{LoopState, StreamState};
use super::streamer::{LabelFn, SampleStreamer};
use crate::buffers::{ChartSnapshot, SharedChartStore};
use crate::client::PredictionSource;
use crate::config::DashboardConfig;
use crate::core::PredictionPayload;
use crate::error::Result;
use crate::observability::{DashboardMetrics, DashboardMonitor, MetricsSnapshot};

/// Everything the display side needs to render one frame
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub loop_state: LoopState,
    pub stream_state: StreamState,
    pub last_error: Option<String>,
    pub prediction: Option<PredictionPayload>,
    pub chart: ChartSnapshot,
    pub metrics: MetricsSnapshot,
}

/// One viewer's dashboard: chart store, streamer and refresh loop.
///
/// Dropping the session cancels both cycles.
pub struct DashboardSession {
    store: SharedChartStore,
    streamer: Arc<SampleStreamer>,
    refresh: RefreshLoop,
    metrics: Arc<DashboardMetrics>,
}

impl DashboardSession {
    pub fn new(
        config: &DashboardConfig,
        source: Arc<dyn PredictionSource>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::build(config, source, api_key, None)
    }

    pub fn with_label_fn(
        config: &DashboardConfig,
        source: Arc<dyn PredictionSource>,
        api_key: impl Into<String>,
        label: LabelFn,
    ) -> Self {
        Self::build(config, source, api_key, Some(label))
    }

    fn build(
        config: &DashboardConfig,
        source: Arc<dyn PredictionSource>,
        api_key: impl Into<String>,
        label: Option<LabelFn>,
    ) -> Self {
        let metrics = Arc::new(DashboardMetrics::new());
        let store = SharedChartStore::new(config.buffer_capacity);

        let mut streamer = SampleStreamer::new(
            store.clone(),
            config.stream_interval(),
            config.overlap_policy,
            metrics.clone(),
        );
        if let Some(label) = label {
            streamer = streamer.with_label_fn(label);
        }
        let streamer = Arc::new(streamer);

        let refresh = RefreshLoop::new(
            source,
            streamer.clone(),
            metrics.clone(),
            config.refresh_interval(),
            api_key,
        );

        Self {
            store,
            streamer,
            refresh,
            metrics,
        }
    }

    pub fn start_auto_refresh(&self) -> Result<bool> {
        self.refresh.start()
    }

    pub fn stop_auto_refresh(&self) -> bool {
        self.refresh.stop()
    }

    /// Flip auto-refresh; returns whether it is running afterwards
    pub fn toggle_auto_refresh(&self) -> Result<bool> {
        if self.refresh.is_running() {
            self.refresh.stop();
            Ok(false)
        } else {
            self.refresh.start()?;
            Ok(true)
        }
    }

    pub async fn refresh_once(&self) -> Result<PredictionPayload> {
        self.refresh.fetch_once().await
    }

    /// Stop both cycles and clear the charts
    pub fn shutdown(&self) {
        self.refresh.stop();
        self.streamer.stop();
        self.store.reset();
    }

    /// Hand a snapshot to `on_frame` every `period` until `shutdown` resolves
    /// or the refresh loop halts on an error.
    ///
    /// Returns the halting error, or `None` when `shutdown` fired first.
    pub async fn watch<F>(
        &self,
        period: Duration,
        shutdown: F,
        mut on_frame: impl FnMut(&SessionSnapshot),
    ) -> Option<String>
    where
        F: Future,
    {
        let mut ticker = interval(period);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => return None,
                _ = ticker.tick() => {
                    let snapshot = self.snapshot();
                    on_frame(&snapshot);
                    if snapshot.loop_state == LoopState::Idle && snapshot.last_error.is_some() {
                        return snapshot.last_error;
                    }
                }
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            loop_state: self.refresh.state(),
            stream_state: self.streamer.state(),
            last_error: self.refresh.last_error(),
            prediction: self.refresh.last_prediction(),
            chart: self.store.snapshot(),
            metrics: self.metrics.snapshot(),
        }
    }

    pub fn store(&self) -> &SharedChartStore {
        &self.store
    }

    pub fn streamer(&self) -> &SampleStreamer {
        &self.streamer
    }

    pub fn refresh_loop(&self) -> &RefreshLoop {
        &self.refresh
    }

    pub fn metrics(&self) -> &Arc<DashboardMetrics> {
        &self.metrics
    }

    pub fn monitor(&self) -> DashboardMonitor {
        DashboardMonitor::new(self.metrics.clone())
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.refresh.stop();
        self.streamer.stop();
    }
}
