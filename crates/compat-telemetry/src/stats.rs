//! Rolling Metric Statistics

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

/// Summary of recent values for one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Nearest-rank 95th percentile
    pub p95: f64,
}

impl MetricStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let rank = ((0.95 * count as f64).ceil() as usize).clamp(1, count);

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sorted.iter().sum::<f64>() / count as f64,
            p95: sorted[rank - 1],
        })
    }
}

/// Bounded window of recent values per category
#[derive(Debug, Clone)]
pub struct StatsWindow {
    capacity: usize,
    values: HashMap<String, VecDeque<f64>>,
}

impl StatsWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            values: HashMap::new(),
        }
    }

    pub fn record(&mut self, category: &str, value: f64) {
        if !value.is_finite() {
            return;
        }
        let window = self.values.entry(category.to_string()).or_default();
        if window.len() == self.capacity {
            window.pop_front();
        }
        window.push_back(value);
    }

    pub fn stats(&self, category: &str) -> Option<MetricStats> {
        let window: Vec<f64> = self.values.get(category)?.iter().copied().collect();
        MetricStats::from_values(&window)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
