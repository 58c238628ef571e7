//! Instrumentation Decorators
//!
//! Wrap an operation and record its timing, failure or feature path on a
//! [`TelemetrySink`].

use std::error::Error;
use std::future::Future;
use std::time::Instant;

use crate::event::CompatibilityEvent;
use crate::sink::TelemetrySink;

/// Run `op` and record its duration in milliseconds
pub fn measure<T>(sink: &TelemetrySink, name: &str, category: &str, op: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = op();
    sink.track(CompatibilityEvent::performance(name, elapsed_ms(start), "ms", category));
    result
}

/// Await `fut` and record its duration in milliseconds
pub async fn measure_async<F: Future>(
    sink: &TelemetrySink,
    name: &str,
    category: &str,
    fut: F,
) -> F::Output {
    let start = Instant::now();
    let output = fut.await;
    sink.track(CompatibilityEvent::performance(name, elapsed_ms(start), "ms", category));
    output
}

/// Run a fallible `op`, recording an error event if it fails
pub fn measure_result<T, E: Error + 'static>(
    sink: &TelemetrySink,
    name: &str,
    category: &str,
    op: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    let result = measure(sink, name, category, op);
    if let Err(e) = &result {
        record_error(sink, name, category, e);
    }
    result
}

/// Record a failure with its source chain
pub fn record_error(
    sink: &TelemetrySink,
    name: &str,
    category: &str,
    err: &(dyn Error + 'static),
) -> bool {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }

    let mut event = CompatibilityEvent::error(name, &err.to_string(), category);
    if !chain.is_empty() {
        event = event.with_context("causes", chain);
    }
    sink.track(event)
}

/// Record whether `feature` ran natively or through a fallback
pub fn record_feature_usage(sink: &TelemetrySink, feature: &str, native: bool) -> bool {
    sink.track(CompatibilityEvent::feature_usage(feature, native))
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
