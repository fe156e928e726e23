use std::sync::Arc;

use super::DashboardMetrics;

pub struct DashboardMonitor {
    metrics: Arc<DashboardMetrics>,
}

impl DashboardMonitor {
    pub fn new(metrics: Arc<DashboardMetrics>) -> Self {
        Self { metrics }
    }

    pub fn generate_report(&self) -> String {
        let snapshot = self.metrics.snapshot();

        let mut report = String::from("=== Dashboard Metrics ===\n");
        report.push_str(&format!(
            "  Fetches: {} ({})\n  Avg Fetch Latency: {}μs\n",
            snapshot.fetches,
            if snapshot.fetch_errors > 0 {
                format!(
                    "{} error{}",
                    snapshot.fetch_errors,
                    if snapshot.fetch_errors == 1 { "" } else { "s" }
                )
            } else {
                "0 errors".to_string()
            },
            snapshot.avg_fetch_latency_us
        ));
        report.push_str(&format!(
            "  Batches: {} started, {} queued, {} dropped\n  Samples: {} inserted\n",
            snapshot.batches_started,
            snapshot.batches_queued,
            snapshot.batches_dropped,
            snapshot.samples_inserted
        ));

        report
    }

    pub fn metrics(&self) -> &Arc<DashboardMetrics> {
        &self.metrics
    }
}
