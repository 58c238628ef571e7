//! Telemetry Sink
//!
//! Sampled, bounded event queue flushed in batches through a [`Reporter`].
//!
//! `track` only touches the in-memory queue. `flush` drains a snapshot, so
//! events tracked while a flush is in flight wait for the next one.
//! Undelivered batches go back to the front of the queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use smol::{Task, Timer};
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::event::CompatibilityEvent;
use crate::reporter::Reporter;
use crate::stats::{MetricStats, StatsWindow};

/// Outcome of one flush
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub sent: usize,
    pub batches: usize,
    /// Events put back for the next flush
    pub requeued: usize,
    /// Events lost to the queue ceiling while requeueing
    pub dropped: usize,
    pub error: Option<String>,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Compatibility telemetry sink
pub struct TelemetrySink {
    config: TelemetryConfig,
    reporter: Arc<dyn Reporter>,
    queue: Mutex<VecDeque<CompatibilityEvent>>,
    flush_lock: smol::lock::Mutex<()>,
    rng: Mutex<SmallRng>,
    stats: Mutex<StatsWindow>,
    dropped: AtomicU64,
    sampled_out: AtomicU64,
    task: Mutex<Option<Task<()>>>,
}

impl TelemetrySink {
    pub fn new(config: TelemetryConfig, reporter: Arc<dyn Reporter>) -> Self {
        let stats = StatsWindow::new(config.stats_window);
        Self {
            config,
            reporter,
            queue: Mutex::new(VecDeque::new()),
            flush_lock: smol::lock::Mutex::new(()),
            rng: Mutex::new(SmallRng::from_os_rng()),
            stats: Mutex::new(stats),
            dropped: AtomicU64::new(0),
            sampled_out: AtomicU64::new(0),
            task: Mutex::new(None),
        }
    }

    /// Deterministic sampling
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Queue an event. Returns false if disabled or sampled out.
    pub fn track(&self, event: CompatibilityEvent) -> bool {
        if !self.config.enabled {
            return false;
        }
        if self.config.sample_rate < 1.0 {
            let roll = self.rng.lock().random::<f64>();
            if roll >= self.config.sample_rate {
                self.sampled_out.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        }

        if event.is_metric() {
            self.stats.lock().record(event.category(), event.data().value);
        }

        let mut queue = self.queue.lock();
        queue.push_back(event);
        let overflow = self.trim(&mut queue);
        if overflow > 0 {
            debug!(overflow, "Telemetry queue full, dropped oldest");
        }
        true
    }

    /// Drop oldest events beyond the ceiling
    fn trim(&self, queue: &mut VecDeque<CompatibilityEvent>) -> usize {
        let overflow = queue.len().saturating_sub(self.config.max_queue);
        queue.drain(..overflow);
        self.dropped.fetch_add(overflow as u64, Ordering::Relaxed);
        overflow
    }

    /// Send everything queued so far in `batch_size` batches
    ///
    /// If this future is dropped mid-send, the undelivered part of the
    /// snapshot goes back to the front of the queue.
    pub async fn flush(&self) -> FlushReport {
        let _guard = self.flush_lock.lock().await;

        let snapshot: Vec<CompatibilityEvent> = self.queue.lock().drain(..).collect();
        let mut report = FlushReport::default();
        if snapshot.is_empty() {
            return report;
        }

        let mut in_flight = InFlight {
            sink: self,
            events: snapshot,
            delivered: 0,
        };
        let batch_size = self.config.batch_size.max(1);
        while in_flight.delivered < in_flight.events.len() {
            let start = in_flight.delivered;
            let end = (start + batch_size).min(in_flight.events.len());
            match self.reporter.send(&in_flight.events[start..end]).await {
                Ok(()) => {
                    report.sent += end - start;
                    report.batches += 1;
                    in_flight.delivered = end;
                }
                Err(e) => {
                    warn!(reporter = self.reporter.name(), "Telemetry batch failed: {e}");
                    report.error = Some(e.to_string());
                    break;
                }
            }
        }

        (report.requeued, report.dropped) = in_flight.requeue();
        debug!(sent = report.sent, requeued = report.requeued, "Telemetry flush done");
        report
    }

    /// Flush every `flush_interval` on the global smol executor
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let sink: Weak<Self> = Arc::downgrade(self);
        let interval = self.config.flush_interval;
        *task = Some(smol::spawn(async move {
            loop {
                Timer::after(interval).await;
                let Some(sink) = sink.upgrade() else { break };
                sink.flush().await;
            }
        }));
        info!(?interval, reporter = self.reporter.name(), "Telemetry flush task started");
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Cancel the background flush. Queued events stay queued, and a flush
    /// interrupted mid-send puts its events back once the executor drops it.
    pub fn shutdown(&self) {
        if let Some(task) = self.task.lock().take() {
            drop(task);
            info!("Telemetry flush task stopped");
        }
    }

    /// Stop the background flush and send what is left
    ///
    /// Waits for a cancelled in-flight flush to put its events back first.
    pub async fn close(&self) -> FlushReport {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.cancel().await;
            info!("Telemetry flush task stopped");
        }
        self.flush().await
    }

    /// Summary of recent metric values for `category`
    pub fn stats(&self, category: &str) -> Option<MetricStats> {
        self.stats.lock().stats(category)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Events lost to the queue ceiling
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn sampled_out_count(&self) -> u64 {
        self.sampled_out.load(Ordering::Relaxed)
    }

    /// Copy of the queued events, oldest first
    pub fn pending(&self) -> Vec<CompatibilityEvent> {
        self.queue.lock().iter().cloned().collect()
    }
}

/// Snapshot being delivered by one flush
struct InFlight<'a> {
    sink: &'a TelemetrySink,
    events: Vec<CompatibilityEvent>,
    delivered: usize,
}

impl InFlight<'_> {
    /// Put undelivered events back at the front, oldest first, and re-apply
    /// the ceiling. Returns `(requeued, dropped)`.
    fn requeue(&mut self) -> (usize, usize) {
        if self.delivered >= self.events.len() {
            return (0, 0);
        }

        let unsent = self.events.len() - self.delivered;
        let mut queue = self.sink.queue.lock();
        for event in self.events.drain(self.delivered..).rev() {
            queue.push_front(event);
        }
        let dropped = self.sink.trim(&mut queue);
        (unsent - dropped.min(unsent), dropped)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let (requeued, dropped) = self.requeue();
        if requeued > 0 || dropped > 0 {
            debug!(requeued, dropped, "Interrupted flush requeued its events");
        }
    }
}

impl Drop for TelemetrySink {
    fn drop(&mut self) {
        self.task.get_mut().take();
    }
}

impl fmt::Debug for TelemetrySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetrySink")
            .field("config", &self.config)
            .field("reporter", &self.reporter.name())
            .field("queued", &self.queue_len())
            .field("dropped", &self.dropped_count())
            .field("running", &self.is_running())
            .finish()
    }
}
