//! Telemetry Reporters
//!
//! Transport seam for flushed batches.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::event::CompatibilityEvent;

/// Failure to deliver a batch
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("HTTP error: {0}")]
    HttpError(u16),
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Delivers event batches somewhere
#[async_trait]
pub trait Reporter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, batch: &[CompatibilityEvent]) -> Result<(), TransportError>;
}

/// Keeps delivered batches in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    batches: Mutex<Vec<Vec<CompatibilityEvent>>>,
    failures: AtomicUsize,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` sends
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<CompatibilityEvent>> {
        self.batches.lock().clone()
    }

    /// Every delivered event, in delivery order
    pub fn events(&self) -> Vec<CompatibilityEvent> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl Reporter for MemoryReporter {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, batch: &[CompatibilityEvent]) -> Result<(), TransportError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::RequestFailed("injected failure".into()));
        }
        self.batches.lock().push(batch.to_vec());
        Ok(())
    }
}

#[cfg(feature = "http")]
pub use http::HttpReporter;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{Reporter, TransportError};
    use crate::event::CompatibilityEvent;

    /// POSTs each batch as a JSON array
    #[derive(Debug, Clone)]
    pub struct HttpReporter {
        endpoint: String,
        client: reqwest::blocking::Client,
    }

    impl HttpReporter {
        pub fn new(endpoint: &str) -> Result<Self, TransportError> {
            let client = reqwest::blocking::Client::builder()
                .user_agent(concat!("fos-compat/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| TransportError::RequestFailed(e.to_string()))?;
            Ok(Self {
                endpoint: endpoint.to_string(),
                client,
            })
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    #[async_trait]
    impl Reporter for HttpReporter {
        fn name(&self) -> &'static str {
            "http"
        }

        async fn send(&self, batch: &[CompatibilityEvent]) -> Result<(), TransportError> {
            let body =
                serde_json::to_vec(batch).map_err(|e| TransportError::Encoding(e.to_string()))?;
            let client = self.client.clone();
            let endpoint = self.endpoint.clone();

            // Blocking client stays off the executor threads
            smol::unblock(move || {
                let response = client
                    .post(&endpoint)
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body)
                    .send()
                    .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(TransportError::HttpError(status.as_u16()))
                }
            })
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_failures() {
        let reporter = MemoryReporter::new();
        reporter.fail_next(1);
        let batch = vec![CompatibilityEvent::feature_usage("fetch", true)];

        assert!(smol::block_on(reporter.send(&batch)).is_err());
        assert!(smol::block_on(reporter.send(&batch)).is_ok());
        assert_eq!(reporter.batches().len(), 1);
        assert_eq!(reporter.events().len(), 1);
    }
}
