pub mod buffers;
pub mod client;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod observability;

pub use error::{DashboardError, Result};
