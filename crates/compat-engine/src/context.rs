//! Compatibility Context
//!
//! One per session, built at startup and passed to whatever needs a
//! compatibility decision. Holds the cached profile and feature matrix, the
//! telemetry sink, and picks native APIs or fallbacks from the matrix.
//!
//! Detection is async. The synchronous choice and adapter methods never wait
//! for it: they answer from the cached matrix or return
//! [`EngineError::NotReady`].

use std::fmt;
use std::sync::Arc;

use compat_env::{BrowserProfile, EnvironmentProbe, Platform};
use compat_features::{CompatibilityReport, Feature, FeatureDetector, FeatureMatrix};
use compat_media::{
    fallback_if_unsupported, pick_format, pick_optimal_video_format, FallbackStrategy, FormatId,
    ValidationStrategy,
};
use compat_polyfill::{
    EventSource, FieldDecorator, FormValidator, GeometrySource, MultipartForm, PollingObserver,
    VisibilityCallback,
};
use compat_telemetry::{
    record_feature_usage, CompatibilityEvent, FlushReport, Reporter, TelemetrySink,
};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::EngineError;

/// Native platform API or a fallback standing in for it
#[derive(Debug)]
pub enum Adapter<T> {
    /// The host's own implementation is usable
    Native,
    Fallback(T),
}

impl<T> Adapter<T> {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    pub fn fallback(&self) -> Option<&T> {
        match self {
            Self::Native => None,
            Self::Fallback(t) => Some(t),
        }
    }

    pub fn fallback_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Native => None,
            Self::Fallback(t) => Some(t),
        }
    }

    pub fn into_fallback(self) -> Option<T> {
        match self {
            Self::Native => None,
            Self::Fallback(t) => Some(t),
        }
    }
}

/// Session compatibility context
pub struct CompatContext {
    config: Config,
    detector: FeatureDetector,
    telemetry: Option<Arc<TelemetrySink>>,
}

impl CompatContext {
    pub fn new(platform: Arc<dyn Platform>, config: Config) -> Self {
        let environment = Arc::new(EnvironmentProbe::new(platform, config.support.clone()));
        let detector = FeatureDetector::new(environment).with_decode_timeout(config.decode_timeout);
        Self {
            config,
            detector,
            telemetry: None,
        }
    }

    /// Report telemetry through `reporter`; a no-op when telemetry is disabled
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        if self.config.telemetry.enabled {
            let sink = TelemetrySink::new(self.config.telemetry.clone(), reporter);
            self.telemetry = Some(Arc::new(sink));
        }
        self
    }

    /// Report telemetry to the configured endpoint
    #[cfg(feature = "http")]
    pub fn with_http_reporter(self) -> Result<Self, EngineError> {
        let endpoint = self
            .config
            .telemetry
            .endpoint
            .clone()
            .ok_or(EngineError::MissingEndpoint)?;
        let reporter = compat_telemetry::HttpReporter::new(&endpoint)
            .map_err(compat_telemetry::TelemetryError::from)?;
        Ok(self.with_reporter(Arc::new(reporter)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environment(&self) -> &Arc<EnvironmentProbe> {
        self.detector.environment()
    }

    pub fn browser_profile(&self) -> &BrowserProfile {
        self.detector.browser_profile()
    }

    /// Session feature matrix, detected on first call
    ///
    /// Concurrent first callers share one detection run.
    pub async fn feature_matrix(&self) -> &FeatureMatrix {
        self.detector
            .feature_matrix_with(|_, elapsed| {
                if let Some(sink) = &self.telemetry {
                    let ms = elapsed.as_secs_f64() * 1000.0;
                    sink.track(CompatibilityEvent::performance(
                        "feature_matrix",
                        ms,
                        "ms",
                        "detection",
                    ));
                }
            })
            .await
    }

    /// The detected matrix; never waits
    ///
    /// Synchronous callers get [`EngineError::NotReady`] until
    /// [`initialize`](Self::initialize) or
    /// [`feature_matrix`](Self::feature_matrix) has completed.
    pub fn matrix(&self) -> Result<&FeatureMatrix, EngineError> {
        self.detector.cached().ok_or(EngineError::NotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.detector.cached().is_some()
    }

    /// Detect everything up front and start the telemetry flush task
    pub async fn initialize(&self) -> CompatibilityReport {
        let matrix = self.feature_matrix().await;
        let report = CompatibilityReport::new(self.browser_profile(), matrix);

        info!(
            browser = %report.profile,
            support = report.support_percentage,
            degradations = report.degradations.len(),
            "Compatibility context ready"
        );
        for degradation in report.unmitigated() {
            warn!(feature = %degradation.feature, "Missing feature has no fallback");
        }

        if let Some(sink) = &self.telemetry {
            sink.start();
        }
        report
    }

    pub fn report(&self) -> Result<CompatibilityReport, EngineError> {
        Ok(CompatibilityReport::new(self.browser_profile(), self.matrix()?))
    }

    pub fn supports(&self, feature: Feature) -> Result<bool, EngineError> {
        Ok(self.matrix()?.get(feature))
    }

    /// First supported image format in caller priority order
    pub fn pick_image_format(
        &self,
        candidates: &[FormatId],
    ) -> Result<Option<FormatId>, EngineError> {
        Ok(pick_format(candidates, self.matrix()?))
    }

    /// Most efficient supported video format
    pub fn pick_video_format(
        &self,
        candidates: &[FormatId],
    ) -> Result<Option<FormatId>, EngineError> {
        Ok(pick_optimal_video_format(candidates, self.matrix()?))
    }

    /// Fallbacks for `format`, or `None` if it is usable as is
    pub fn fallback_strategy(
        &self,
        format: FormatId,
    ) -> Result<Option<FallbackStrategy>, EngineError> {
        Ok(fallback_if_unsupported(format, self.matrix()?))
    }

    /// Native constraint validation when available, unless uniform messages
    /// across hosts are required
    pub fn validation_strategy(
        &self,
        uniform_messages: bool,
    ) -> Result<ValidationStrategy, EngineError> {
        let candidates: &[ValidationStrategy] = if uniform_messages {
            &[ValidationStrategy::Polyfill]
        } else {
            &[ValidationStrategy::Native, ValidationStrategy::Polyfill]
        };
        let strategy = pick_format(candidates, self.matrix()?);
        Ok(strategy.unwrap_or(ValidationStrategy::Polyfill))
    }

    /// Polling observer when native visibility observation is missing
    pub fn visibility_observer(
        &self,
        events: Arc<dyn EventSource>,
        geometry: Arc<dyn GeometrySource>,
        callback: VisibilityCallback,
    ) -> Result<Adapter<PollingObserver>, EngineError> {
        if self.use_native(Feature::IntersectionObserver)? {
            return Ok(Adapter::Native);
        }
        let observer = PollingObserver::new(events, geometry, &self.config.observer, callback)?;
        Ok(Adapter::Fallback(observer))
    }

    /// Manual multipart encoder when native form data is missing
    pub fn form_data(&self) -> Result<Adapter<MultipartForm>, EngineError> {
        if self.use_native(Feature::FormData)? {
            Ok(Adapter::Native)
        } else {
            Ok(Adapter::Fallback(MultipartForm::new()))
        }
    }

    /// Declarative validator per [`validation_strategy`](Self::validation_strategy)
    pub fn form_validator<D: FieldDecorator>(
        &self,
        decorator: D,
        uniform_messages: bool,
    ) -> Result<Adapter<FormValidator<D>>, EngineError> {
        let native = self.validation_strategy(uniform_messages)? == ValidationStrategy::Native;
        self.record_usage(Feature::ConstraintValidation, native);

        if native {
            Ok(Adapter::Native)
        } else {
            Ok(Adapter::Fallback(FormValidator::new(decorator)))
        }
    }

    fn use_native(&self, feature: Feature) -> Result<bool, EngineError> {
        let native = self.supports(feature)?;
        if !native {
            debug!(%feature, "Using fallback");
        }
        self.record_usage(feature, native);
        Ok(native)
    }

    fn record_usage(&self, feature: Feature, native: bool) {
        if let Some(sink) = &self.telemetry {
            record_feature_usage(sink, feature.key(), native);
        }
    }

    pub fn telemetry(&self) -> Option<&Arc<TelemetrySink>> {
        self.telemetry.as_ref()
    }

    /// Queue an event; false without telemetry or when sampled out
    pub fn track(&self, event: CompatibilityEvent) -> bool {
        self.telemetry.as_ref().is_some_and(|sink| sink.track(event))
    }

    /// Stop the flush task and send what is queued
    pub async fn shutdown(&self) -> Option<FlushReport> {
        let sink = self.telemetry.as_ref()?;
        let report = sink.close().await;
        info!(sent = report.sent, requeued = report.requeued, "Compatibility context shut down");
        Some(report)
    }
}

impl fmt::Debug for CompatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatContext")
            .field("environment", &self.config.environment)
            .field("profile", &self.detector.environment().cached())
            .field("matrix", &self.detector.cached())
            .field("telemetry", &self.telemetry)
            .finish()
    }
}
