//! Feature Detector
//!
//! Builds the session's [`FeatureMatrix`] once, on first access, and reuses
//! it for the rest of the session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use compat_env::{BrowserProfile, EnvironmentProbe, Platform};
use smol::lock::OnceCell;
use tracing::{debug, info};

use crate::feature::{Feature, FeatureCategory};
use crate::matrix::FeatureMatrix;
use crate::probes::{probe_css, probe_raster, probe_scripting, probe_video_codecs, raster_sample};

/// Default time an image decode probe may take before it reads as unsupported
pub const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(2);

/// Memoizing feature detector
pub struct FeatureDetector {
    environment: Arc<EnvironmentProbe>,
    decode_timeout: Duration,
    matrix: OnceCell<FeatureMatrix>,
}

impl FeatureDetector {
    pub fn new(environment: Arc<EnvironmentProbe>) -> Self {
        Self {
            environment,
            decode_timeout: DEFAULT_DECODE_TIMEOUT,
            matrix: OnceCell::new(),
        }
    }

    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout = timeout;
        self
    }

    /// The session's feature matrix
    ///
    /// The first caller runs the probes; callers arriving while that is in
    /// flight wait for the same result instead of probing again.
    pub async fn feature_matrix(&self) -> &FeatureMatrix {
        self.feature_matrix_with(|_, _| {}).await
    }

    /// [`feature_matrix`](Self::feature_matrix), calling `on_built` with the
    /// matrix and build time if this call is the one that builds it
    pub async fn feature_matrix_with(
        &self,
        on_built: impl FnOnce(&FeatureMatrix, Duration),
    ) -> &FeatureMatrix {
        self.matrix
            .get_or_init(|| async {
                let start = Instant::now();
                let matrix = self.build().await;
                on_built(&matrix, start.elapsed());
                matrix
            })
            .await
    }

    /// Matrix if it has already been built
    pub fn cached(&self) -> Option<&FeatureMatrix> {
        self.matrix.get()
    }

    /// Blocking variant of [`feature_matrix`](Self::feature_matrix) for
    /// synchronous callers outside any executor. Never call it from a task
    /// on the thread that drives the probes: it would block their callbacks.
    pub fn feature_matrix_blocking(&self) -> &FeatureMatrix {
        smol::block_on(self.feature_matrix())
    }

    pub fn environment(&self) -> &Arc<EnvironmentProbe> {
        &self.environment
    }

    pub fn browser_profile(&self) -> &BrowserProfile {
        self.environment.browser_profile()
    }

    async fn build(&self) -> FeatureMatrix {
        let platform: &dyn Platform = self.environment.platform().as_ref();
        let profile = self.environment.browser_profile();
        debug!("Building feature matrix for {profile}");

        let mut matrix = FeatureMatrix::none();

        for feature in Feature::ALL {
            match feature.category() {
                FeatureCategory::Scripting => {
                    matrix.set(feature, probe_scripting(platform, feature))
                }
                FeatureCategory::Css => matrix.set(feature, probe_css(platform, feature)),
                FeatureCategory::Image => {
                    let supported = match raster_sample(feature) {
                        Some(sample) => probe_raster(platform, sample, self.decode_timeout).await,
                        // Baseline formats decode everywhere a browser exists
                        None => platform.is_browser(),
                    };
                    matrix.set(feature, supported);
                }
                FeatureCategory::Video => {}
            }
        }

        for (codec, supported) in probe_video_codecs(platform) {
            matrix.set(codec, supported);
        }
        for container in [Feature::Webm, Feature::Mp4, Feature::Ogg] {
            let supported = container.container_codecs().iter().any(|&c| matrix.get(c));
            matrix.set(container, supported);
        }

        info!(
            "Feature matrix built: {}/{} features supported",
            matrix.supported().count(),
            Feature::COUNT
        );
        for feature in matrix.missing() {
            debug!("Missing feature: {feature}");
        }
        matrix
    }
}

impl std::fmt::Debug for FeatureDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureDetector")
            .field("environment", &self.environment)
            .field("decode_timeout", &self.decode_timeout)
            .field("matrix", &self.matrix.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compat_env::{PlatformDescriptor, ServerPlatform, SupportPolicy};

    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    fn detector(platform: impl Platform + 'static) -> FeatureDetector {
        let environment = EnvironmentProbe::new(Arc::new(platform), SupportPolicy::default());
        FeatureDetector::new(Arc::new(environment))
    }

    #[test]
    fn test_evergreen_matrix() {
        let detector = detector(PlatformDescriptor::evergreen(FIREFOX).build());
        let matrix = detector.feature_matrix_blocking();

        assert_eq!(matrix.supported().count(), Feature::COUNT);
        assert!(std::ptr::eq(matrix, detector.cached().unwrap()));
    }

    #[test]
    fn test_build_observed_once() {
        let detector = detector(PlatformDescriptor::evergreen(FIREFOX).build());
        let builds = std::sync::atomic::AtomicUsize::new(0);
        let observe = |matrix: &FeatureMatrix, _elapsed: Duration| {
            assert_eq!(matrix.supported().count(), Feature::COUNT);
            builds.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        };

        let (first, second) = smol::block_on(smol::future::zip(
            detector.feature_matrix_with(observe),
            detector.feature_matrix_with(observe),
        ));
        assert!(std::ptr::eq(first, second));
        assert_eq!(builds.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_server_matrix_is_empty() {
        let detector = detector(ServerPlatform);
        let matrix = detector.feature_matrix_blocking();
        assert_eq!(matrix, &FeatureMatrix::none());
    }

    #[test]
    fn test_container_derived_from_codecs() {
        let platform = PlatformDescriptor::evergreen(FIREFOX)
            .with_media_type("video/webm; codecs=\"vp8, vorbis\"", compat_env::CanPlayType::Empty)
            .with_media_type("video/ogg; codecs=\"theora\"", compat_env::CanPlayType::Empty)
            .build();
        let detector = detector(platform);
        let matrix = detector.feature_matrix_blocking();

        assert!(!matrix.get(Feature::WebmVp8));
        assert!(matrix.get(Feature::WebmVp9));
        assert!(matrix.get(Feature::Webm));
        assert!(!matrix.get(Feature::Ogg));
    }

    #[test]
    fn test_failing_elements_only_affect_media() {
        let platform = PlatformDescriptor::evergreen(FIREFOX)
            .with_failing_elements()
            .build();
        let detector = detector(platform);
        let matrix = detector.feature_matrix_blocking();

        assert!(matrix.get(Feature::Fetch));
        assert!(matrix.get(Feature::CssGrid));
        assert!(matrix.get(Feature::Jpeg));
        assert!(!matrix.get(Feature::Webp));
        assert!(!matrix.get(Feature::Mp4));
    }
}
