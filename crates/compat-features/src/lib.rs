//! fOS Compat Features
//!
//! Builds the session's feature matrix: scripting APIs, CSS capabilities,
//! raster formats and video codecs, each probed independently against the
//! host [`Platform`](compat_env::Platform).

pub mod detector;
pub mod feature;
pub mod matrix;
pub mod probes;
pub mod report;

pub use detector::{FeatureDetector, DEFAULT_DECODE_TIMEOUT};
pub use feature::{Feature, FeatureCategory, UnknownFeature};
pub use matrix::FeatureMatrix;
pub use report::{fallback_for, CompatibilityReport, Degradation};
