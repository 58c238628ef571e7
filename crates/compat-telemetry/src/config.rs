//! Telemetry Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TelemetryError;

/// Telemetry sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryConfig {
    pub enabled: bool,
    /// Fraction of events kept, in `[0, 1]`
    pub sample_rate: f64,
    pub batch_size: usize,
    #[serde(with = "compat_env::millis")]
    pub flush_interval: Duration,
    /// Queue ceiling; oldest events are dropped beyond it
    pub max_queue: usize,
    /// Recent values kept per category for stats
    pub stats_window: usize,
    /// Reporting endpoint for the HTTP reporter
    pub endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl TelemetryConfig {
    /// Every event kept, frequent small flushes
    pub fn development() -> Self {
        Self {
            enabled: true,
            sample_rate: 1.0,
            batch_size: 10,
            flush_interval: Duration::from_secs(10),
            max_queue: 1000,
            stats_window: 100,
            endpoint: None,
        }
    }

    /// One event in ten kept
    pub fn production() -> Self {
        Self {
            sample_rate: 0.1,
            batch_size: 50,
            flush_interval: Duration::from_secs(30),
            ..Self::development()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::development()
        }
    }

    pub fn validate(&self) -> Result<(), TelemetryError> {
        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(TelemetryError::InvalidConfig(format!(
                "sample rate {} is outside [0, 1]",
                self.sample_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(TelemetryError::InvalidConfig("batch size must be at least 1".into()));
        }
        if self.max_queue == 0 {
            return Err(TelemetryError::InvalidConfig("queue ceiling must be at least 1".into()));
        }
        if self.flush_interval.is_zero() {
            return Err(TelemetryError::InvalidConfig("flush interval must be non-zero".into()));
        }
        Ok(())
    }
}
