//! Telemetry Events

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload shared by every event kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

/// A compatibility telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum CompatibilityEvent {
    PerformanceMetric(EventData),
    CompatibilityError(EventData),
    FeatureUsage(EventData),
}

impl CompatibilityEvent {
    /// Timing or size measurement
    pub fn performance(name: &str, value: f64, unit: &str, category: &str) -> Self {
        Self::PerformanceMetric(EventData::now(name, value, unit, category))
    }

    /// Failure on a degraded path
    pub fn error(name: &str, message: &str, category: &str) -> Self {
        Self::CompatibilityError(
            EventData::now(name, 1.0, "count", category).context_value("message", message),
        )
    }

    /// Whether a feature was used natively (`value` 1) or through a fallback (0)
    pub fn feature_usage(feature: &str, native: bool) -> Self {
        let value = if native { 1.0 } else { 0.0 };
        Self::FeatureUsage(EventData::now(feature, value, "bool", "feature"))
    }

    pub fn data(&self) -> &EventData {
        match self {
            Self::PerformanceMetric(d) | Self::CompatibilityError(d) | Self::FeatureUsage(d) => d,
        }
    }

    fn data_mut(&mut self) -> &mut EventData {
        match self {
            Self::PerformanceMetric(d) | Self::CompatibilityError(d) | Self::FeatureUsage(d) => d,
        }
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn category(&self) -> &str {
        &self.data().category
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, Self::PerformanceMetric(_))
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data_mut().context.insert(key.to_string(), value.into());
        self
    }
}

impl EventData {
    fn now(name: &str, value: f64, unit: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
            category: category.to_string(),
            context: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    fn context_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}
