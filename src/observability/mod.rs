pub mod metrics;
pub mod monitor;

pub use metrics::{DashboardMetrics, MetricsSnapshot};
pub use monitor::DashboardMonitor;
