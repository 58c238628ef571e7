//! Edge case tests for compat-engine
//!
//! End-to-end sessions through the context: legacy and server hosts, native
//! versus fallback adapters, bot handling, config loading and telemetry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use compat_engine::env::{
    BotPolicy, BrowserName, DescribedPlatform, ImageElement, ImageLoad, LoadCallback,
    MediaElement, Platform, PlatformDescriptor, PlatformError, ServerPlatform, StyleQuery,
};
use compat_engine::features::Feature;
use compat_engine::media::{FormatId, ValidationStrategy};
use compat_engine::polyfill::{
    ElementId, EventSource, FieldConstraints, FieldDecorator, FormDataSink, GeometrySource,
    HostEvent, InputType, ListenerId, Rect, VisibilityEntry, VisibilityObserver,
};
use compat_engine::telemetry::{CompatibilityEvent, MemoryReporter};
use compat_engine::{Adapter, CompatContext, Config, EngineError};
use proptest::prelude::*;

const CHROME_120: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const CHROME_70: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/70.0.3538.77 Safari/537.36";
const CRAWLER: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

// ── Host doubles ────────────────────────────────────────────────────────

#[derive(Default)]
struct Host {
    listeners: Mutex<Vec<u64>>,
    rects: Mutex<HashMap<ElementId, Rect>>,
}

impl EventSource for Host {
    fn add_listener(&self, _event: HostEvent) -> ListenerId {
        let mut listeners = self.listeners.lock().unwrap();
        let id = listeners.len() as u64 + 1;
        listeners.push(id);
        ListenerId(id)
    }

    fn remove_listener(&self, listener: ListenerId) {
        self.listeners.lock().unwrap().retain(|&id| id != listener.0);
    }
}

impl GeometrySource for Host {
    fn root_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, 1024.0, 768.0)
    }

    fn bounding_rect(&self, target: ElementId) -> Option<Rect> {
        self.rects.lock().unwrap().get(&target).copied()
    }
}

#[derive(Default)]
struct Decorations {
    shown: HashMap<String, String>,
    focused: Vec<String>,
}

impl FieldDecorator for Decorations {
    fn show_error(&mut self, field: &str, message: &str) {
        self.shown.insert(field.to_string(), message.to_string());
    }

    fn clear_error(&mut self, field: &str) {
        self.shown.remove(field);
    }

    fn focus(&mut self, field: &str) {
        self.focused.push(field.to_string());
    }
}

type Parked = Arc<Mutex<Vec<(LoadCallback, ImageLoad)>>>;

/// Host whose image decodes settle only when the test releases them
struct DeferredImages {
    inner: DescribedPlatform,
    parked: Parked,
}

struct DeferredImage {
    inner: Box<dyn ImageElement>,
    parked: Parked,
}

impl Platform for DeferredImages {
    fn identity(&self) -> Option<&str> {
        self.inner.identity()
    }

    fn has_global(&self, path: &str) -> bool {
        self.inner.has_global(path)
    }

    fn style_query(&self) -> Option<&dyn StyleQuery> {
        self.inner.style_query()
    }

    fn create_image(&self) -> Result<Box<dyn ImageElement>, PlatformError> {
        Ok(Box::new(DeferredImage {
            inner: self.inner.create_image()?,
            parked: self.parked.clone(),
        }))
    }

    fn create_video(&self) -> Result<Box<dyn MediaElement>, PlatformError> {
        self.inner.create_video()
    }
}

impl ImageElement for DeferredImage {
    fn load(self: Box<Self>, src: &str, on_settled: LoadCallback) {
        let DeferredImage { inner, parked } = *self;
        inner.load(
            src,
            Box::new(move |outcome| parked.lock().unwrap().push((on_settled, outcome))),
        );
    }
}

/// Chrome 70 era host: no native visibility observer, form data or
/// constraint validation, no modern image formats
fn legacy() -> PlatformDescriptor {
    PlatformDescriptor::evergreen(CHROME_70)
        .without_global("IntersectionObserver")
        .without_global("FormData")
        .without_global("HTMLInputElement.prototype.checkValidity")
        .without_image_type("image/avif")
        .without_image_type("image/webp")
}

fn context(descriptor: PlatformDescriptor) -> CompatContext {
    CompatContext::new(Arc::new(descriptor.build()), Config::development())
}

/// Context with detection already finished
fn ready(descriptor: PlatformDescriptor) -> CompatContext {
    let ctx = context(descriptor);
    smol::block_on(ctx.feature_matrix());
    ctx
}

fn usage(reporter: &MemoryReporter) -> HashMap<String, f64> {
    reporter
        .events()
        .iter()
        .filter(|e| matches!(e, CompatibilityEvent::FeatureUsage(_)))
        .map(|e| (e.name().to_string(), e.data().value))
        .collect()
}

// ============================================================================
// EVERGREEN HOST
// ============================================================================

#[test]
fn test_evergreen_uses_native_everywhere() {
    let ctx = ready(PlatformDescriptor::evergreen(CHROME_120));
    let host = Arc::new(Host::default());

    assert_eq!(ctx.browser_profile().name, BrowserName::Chrome);
    assert!(ctx.browser_profile().is_supported);
    assert!(ctx.form_data().unwrap().is_native());
    assert!(ctx.form_validator(Decorations::default(), false).unwrap().is_native());
    let observer = ctx
        .visibility_observer(host.clone(), host.clone(), Box::new(|_| {}))
        .unwrap();
    assert!(observer.is_native());
    assert!(host.listeners.lock().unwrap().is_empty());

    assert_eq!(
        ctx.pick_image_format(&[FormatId::Avif, FormatId::Webp, FormatId::Jpeg]).unwrap(),
        Some(FormatId::Avif)
    );
    assert_eq!(
        ctx.pick_video_format(&[FormatId::Mp4, FormatId::Ogg, FormatId::WebmVp9]).unwrap(),
        Some(FormatId::WebmVp9)
    );
    assert_eq!(ctx.fallback_strategy(FormatId::Webp).unwrap(), None);
}

#[test]
fn test_uniform_messages_force_polyfill() {
    let ctx = ready(PlatformDescriptor::evergreen(CHROME_120));

    assert_eq!(ctx.validation_strategy(false).unwrap(), ValidationStrategy::Native);
    assert_eq!(ctx.validation_strategy(true).unwrap(), ValidationStrategy::Polyfill);
    assert!(!ctx.form_validator(Decorations::default(), true).unwrap().is_native());
}

// ============================================================================
// LEGACY HOST
// ============================================================================

#[test]
fn test_legacy_profile_and_formats() {
    let ctx = ready(legacy());

    let profile = ctx.browser_profile();
    assert_eq!((profile.name, profile.version), (BrowserName::Chrome, 70));
    assert!(!profile.is_supported);

    assert!(!ctx.supports(Feature::Webp).unwrap());
    assert!(ctx.supports(Feature::Fetch).unwrap());
    assert_eq!(
        ctx.pick_image_format(&[FormatId::Avif, FormatId::Webp, FormatId::Jpeg]).unwrap(),
        Some(FormatId::Jpeg)
    );

    let strategy = ctx.fallback_strategy(FormatId::Webp).unwrap().unwrap();
    assert_eq!(strategy.original_format, FormatId::Webp);
    assert_eq!(strategy.fallback_formats, vec![FormatId::Jpeg, FormatId::Png]);
}

#[test]
fn test_legacy_observer_fallback_reports_visibility() {
    let ctx = ready(legacy());
    let host = Arc::new(Host::default());
    let seen: Arc<Mutex<Vec<VisibilityEntry>>> = Arc::default();
    let sink = seen.clone();

    let adapter = ctx
        .visibility_observer(
            host.clone(),
            host.clone(),
            Box::new(move |entries| sink.lock().unwrap().extend_from_slice(entries)),
        )
        .unwrap();
    let mut observer = adapter.into_fallback().unwrap();

    let hero = ElementId(7);
    host.rects.lock().unwrap().insert(hero, Rect::new(0.0, 0.0, 200.0, 100.0));
    observer.observe(hero);
    observer.tick(0.0);

    assert_eq!(host.listeners.lock().unwrap().len(), 2);
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_intersecting);
        assert_eq!(seen[0].intersection_ratio, 1.0);
    }

    observer.disconnect();
    assert!(host.listeners.lock().unwrap().is_empty());
}

#[test]
fn test_legacy_form_data_fallback_encodes() {
    let ctx = ready(legacy());
    let Ok(Adapter::Fallback(mut form)) = ctx.form_data() else {
        panic!("expected the multipart fallback");
    };

    form.append("name", "Ada").unwrap();
    form.append("tag", "a").unwrap();
    form.append("tag", "b").unwrap();

    let encoded = form.encode();
    let body = String::from_utf8(encoded.body.clone()).unwrap();
    assert!(encoded.content_type().ends_with(&encoded.boundary));
    assert!(body.find("Ada").unwrap() < body.find("\r\n\r\na\r\n").unwrap());
    assert_eq!(form.to_urlencoded(), "name=Ada&tag=a&tag=b");
}

#[test]
fn test_legacy_validator_fallback_decorates_and_cancels() {
    let ctx = ready(legacy());
    assert_eq!(ctx.validation_strategy(false).unwrap(), ValidationStrategy::Polyfill);

    let mut validator = ctx
        .form_validator(Decorations::default(), false)
        .unwrap()
        .into_fallback()
        .unwrap();
    validator
        .register("email", &FieldConstraints::new(InputType::Email).required())
        .unwrap();

    assert_eq!(
        validator.handle_blur("email", "not-an-address").unwrap().as_deref(),
        Some("Please enter an email address.")
    );

    let values = HashMap::from([("email".to_string(), String::new())]);
    let outcome = validator.handle_submit(&values);
    assert!(!outcome.is_submitted());
    assert_eq!(validator.decorator().focused, vec!["email"]);
    assert_eq!(
        validator.decorator().shown.get("email").map(String::as_str),
        Some("Please fill out this field.")
    );

    validator.handle_input("email", "ada@example.com").unwrap();
    assert!(validator.decorator().shown.is_empty());
}

// ============================================================================
// SERVER CONTEXT
// ============================================================================

#[test]
fn test_server_context_falls_back_everywhere() {
    let ctx = CompatContext::new(Arc::new(ServerPlatform), Config::default());
    let host = Arc::new(Host::default());
    smol::block_on(ctx.initialize());

    assert!(ctx.browser_profile().is_unknown());
    assert_eq!(ctx.pick_image_format(&[FormatId::Webp, FormatId::Jpeg]).unwrap(), None);
    assert_eq!(ctx.pick_video_format(&FormatId::ALL).unwrap(), None);
    assert!(!ctx.form_data().unwrap().is_native());
    assert!(!ctx.form_validator(Decorations::default(), false).unwrap().is_native());
    assert!(
        !ctx.visibility_observer(host.clone(), host, Box::new(|_| {}))
            .unwrap()
            .is_native()
    );

    let report = ctx.report().unwrap();
    assert_eq!(report.support_percentage, 0.0);
    assert_eq!(report.degradations.len(), Feature::COUNT);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_bot_policy_from_config() {
    let json = r#"{ "support": { "botPolicy": "bypass" } }"#;
    let bypass = CompatContext::new(
        Arc::new(PlatformDescriptor::evergreen(CRAWLER).build()),
        Config::from_json(json).unwrap(),
    );
    let strict = context(PlatformDescriptor::evergreen(CRAWLER));

    assert_eq!(bypass.config().support.bot_policy, BotPolicy::Bypass);
    assert!(bypass.browser_profile().is_supported);
    assert!(bypass.browser_profile().is_unknown());
    assert!(!strict.browser_profile().is_supported);
}

#[test]
fn test_minimum_versions_from_config() {
    let json = r#"{ "support": { "minimumVersions": { "chrome": 60 } } }"#;
    let ctx = CompatContext::new(
        Arc::new(legacy().build()),
        Config::from_json(json).unwrap(),
    );
    assert!(ctx.browser_profile().is_supported);
}

#[test]
fn test_invalid_observer_margin_surfaces_as_error() {
    let mut config = Config::development();
    config.observer.root_margin = "10em".to_string();
    let ctx = CompatContext::new(Arc::new(legacy().build()), config);
    let host = Arc::new(Host::default());
    smol::block_on(ctx.feature_matrix());

    let result = ctx.visibility_observer(host.clone(), host, Box::new(|_| {}));
    assert!(matches!(result, Err(compat_engine::EngineError::Observer(_))));
}

// ============================================================================
// TELEMETRY
// ============================================================================

#[test]
fn test_without_reporter_nothing_is_tracked() {
    let ctx = context(legacy());
    assert!(ctx.telemetry().is_none());
    assert!(!ctx.track(CompatibilityEvent::feature_usage("fetch", true)));
    assert!(smol::block_on(ctx.shutdown()).is_none());
}

#[test]
fn test_disabled_telemetry_ignores_reporter() {
    let mut config = Config::development();
    config.telemetry.enabled = false;
    let ctx = CompatContext::new(Arc::new(legacy().build()), config)
        .with_reporter(Arc::new(MemoryReporter::new()));
    assert!(ctx.telemetry().is_none());
}

#[test]
fn test_adapter_choices_reported_on_shutdown() {
    let reporter = Arc::new(MemoryReporter::new());
    let ctx = context(legacy()).with_reporter(reporter.clone());
    let host = Arc::new(Host::default());

    let report = smol::block_on(ctx.initialize());
    assert!(!report.profile.is_supported);
    assert!(ctx.telemetry().unwrap().is_running());

    let _ = ctx.form_data().unwrap();
    let _ = ctx.form_validator(Decorations::default(), false).unwrap();
    let _ = ctx.visibility_observer(host.clone(), host, Box::new(|_| {})).unwrap();

    let flushed = smol::block_on(ctx.shutdown()).unwrap();
    assert!(flushed.is_complete());
    assert!(!ctx.telemetry().unwrap().is_running());

    let usage = usage(&reporter);
    assert_eq!(usage.get("formData"), Some(&0.0));
    assert_eq!(usage.get("constraintValidation"), Some(&0.0));
    assert_eq!(usage.get("intersectionObserver"), Some(&0.0));

    let detection = reporter
        .events()
        .into_iter()
        .find(|e| e.is_metric() && e.name() == "feature_matrix");
    assert!(detection.is_some());
}

#[test]
fn test_concurrent_initialize_shares_matrix() {
    let ctx = context(legacy());
    let (first, second) = smol::block_on(smol::future::zip(ctx.initialize(), ctx.initialize()));
    assert_eq!(first, second);
    assert!(std::ptr::eq(ctx.matrix().unwrap(), smol::block_on(ctx.feature_matrix())));
}

#[test]
fn test_concurrent_first_callers_record_one_detection() {
    let reporter = Arc::new(MemoryReporter::new());
    let ctx = context(legacy()).with_reporter(reporter);

    let both = smol::future::zip(ctx.feature_matrix(), ctx.feature_matrix());
    let (first, second) = smol::block_on(both);
    assert!(std::ptr::eq(first, second));

    let detections = ctx
        .telemetry()
        .unwrap()
        .pending()
        .iter()
        .filter(|e| e.is_metric() && e.name() == "feature_matrix")
        .count();
    assert_eq!(detections, 1);
}

// ============================================================================
// READINESS
// ============================================================================

#[test]
fn test_choices_before_detection_are_not_ready() {
    let ctx = context(legacy());
    let host = Arc::new(Host::default());

    assert!(!ctx.is_ready());
    assert!(matches!(ctx.matrix(), Err(EngineError::NotReady)));
    assert!(matches!(ctx.supports(Feature::Fetch), Err(EngineError::NotReady)));
    assert!(matches!(ctx.report(), Err(EngineError::NotReady)));
    assert!(matches!(ctx.form_data(), Err(EngineError::NotReady)));
    assert!(matches!(
        ctx.visibility_observer(host.clone(), host.clone(), Box::new(|_| {})),
        Err(EngineError::NotReady)
    ));
    assert!(host.listeners.lock().unwrap().is_empty());

    smol::block_on(ctx.initialize());
    assert!(ctx.is_ready());
    assert!(ctx.supports(Feature::Fetch).unwrap());
}

#[test]
fn test_sync_choices_answer_while_detection_is_suspended() {
    let parked: Parked = Arc::default();
    let platform = DeferredImages {
        inner: PlatformDescriptor::evergreen(CHROME_120).build(),
        parked: parked.clone(),
    };
    let ctx = CompatContext::new(Arc::new(platform), Config::development());
    let ex = smol::LocalExecutor::new();

    let report = smol::block_on(ex.run(async {
        let init = ex.spawn(ctx.initialize());
        while parked.lock().unwrap().is_empty() {
            smol::future::yield_now().await;
        }

        // Detection is parked on a decode callback only this thread can run
        assert!(matches!(
            ctx.pick_image_format(&[FormatId::Avif, FormatId::Jpeg]),
            Err(EngineError::NotReady)
        ));
        assert!(matches!(ctx.validation_strategy(false), Err(EngineError::NotReady)));

        while !init.is_finished() {
            let settled: Vec<_> = parked.lock().unwrap().drain(..).collect();
            for (on_settled, outcome) in settled {
                on_settled(outcome);
            }
            smol::future::yield_now().await;
        }
        init.await
    }));

    assert!(report.profile.is_supported);
    assert_eq!(
        ctx.pick_image_format(&[FormatId::Avif, FormatId::Jpeg]).unwrap(),
        Some(FormatId::Avif)
    );
}

// ── Strategies ──────────────────────────────────────────────────────────

fn image_formats() -> impl Strategy<Value = Vec<FormatId>> {
    prop::collection::vec(
        prop::sample::select(vec![FormatId::Avif, FormatId::Webp, FormatId::Jpeg, FormatId::Png]),
        0..6,
    )
}

proptest! {
    #[test]
    fn picked_image_is_first_supported(candidates in image_formats()) {
        let ctx = ready(legacy());
        let expected = candidates
            .iter()
            .copied()
            .find(|f| matches!(f, FormatId::Jpeg | FormatId::Png));
        prop_assert_eq!(ctx.pick_image_format(&candidates).unwrap(), expected);
    }
}
