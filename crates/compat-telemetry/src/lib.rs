//! fOS Compat Telemetry
//!
//! Sampled, batched reporting of compatibility events: which features ran
//! natively, which fell back, what failed and how long detection took.

pub mod config;
pub mod event;
pub mod instrument;
pub mod reporter;
pub mod sink;
pub mod stats;

pub use config::TelemetryConfig;
pub use event::{CompatibilityEvent, EventData};
pub use instrument::{measure, measure_async, measure_result, record_error, record_feature_usage};
#[cfg(feature = "http")]
pub use reporter::HttpReporter;
pub use reporter::{MemoryReporter, Reporter, TransportError};
pub use sink::{FlushReport, TelemetrySink};
pub use stats::{MetricStats, StatsWindow};

/// Telemetry error
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid telemetry config: {0}")]
    InvalidConfig(String),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
