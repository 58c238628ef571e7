//! fOS Compat
//!
//! Capability detection and compatibility fallbacks for web content.
//!
//! A [`CompatContext`] fingerprints the host browser, builds a feature
//! matrix, picks media formats and validation strategies from it, hands out
//! fallbacks for missing platform APIs and reports what it saw through
//! batched telemetry.
//!
//! # Example
//! ```rust,ignore
//! use compat_engine::{CompatContext, Config};
//!
//! compat_engine::logging::init(&config.log_filter);
//! let ctx = CompatContext::new(platform, Config::production()).with_reporter(reporter);
//! let report = ctx.initialize().await;
//! let hero = ctx.pick_image_format(&[FormatId::Avif, FormatId::Webp, FormatId::Jpeg])?;
//! ```

mod config;
mod context;
pub mod logging;

pub use config::{Config, Environment};
pub use context::{Adapter, CompatContext};

pub use compat_env as env;
pub use compat_features as features;
pub use compat_media as media;
pub use compat_polyfill as polyfill;
pub use compat_telemetry as telemetry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid observer config: {0}")]
    Observer(#[from] compat_polyfill::MarginError),
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] compat_telemetry::TelemetryError),
    #[error("Telemetry endpoint is not configured")]
    MissingEndpoint,
    #[error("Feature detection has not finished; await `initialize` first")]
    NotReady,
}
