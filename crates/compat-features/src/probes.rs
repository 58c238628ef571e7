//! Capability Probes
//!
//! One probe per feature category. Probes never fail: anything that goes
//! wrong while probing reads as "unsupported".

use std::time::Duration;

use compat_env::{ImageLoad, Platform};
use smol::Timer;
use tracing::debug;

use crate::feature::Feature;

/// Smallest lossy WebP that decodes to a 1x1 bitmap
pub const WEBP_SAMPLE: &str =
    "data:image/webp;base64,UklGRiIAAABXRUJQVlA4IBYAAAAwAQCdASoBAAEADsD+JaQAA3AAAAAA";

/// Smallest AVIF that decodes to a 1x1 bitmap
pub const AVIF_SAMPLE: &str = "data:image/avif;base64,AAAAIGZ0eXBhdmlmAAAAAGF2aWZtaWYxbWlhZk1BMUIAAADybWV0YQAAAAAAAAAoaGRscgAAAAAAAAAAcGljdAAAAAAAAAAAAAAAAGxpYmF2aWYAAAAADnBpdG0AAAAAAAEAAAAeaWxvYwAAAABEAAABAAEAAAABAAABGgAAAB0AAAAoaWluZgAAAAAAAQAAABppbmZlAgAAAAABAABhdjAxQ29sb3IAAAAAamlwcnAAAABLaXBjbwAAABRpc3BlAAAAAAAAAAIAAAACAAAAEHBpeGkAAAAAAwgICAAAAAxhdjFDgQ0MAAAAABNjb2xybmNseAACAAIAAYAAAAAXaXBtYQAAAAAAAAABAAEEAQKDBAAAACVtZGF0EgAKCBgANogQEAwgMg8f8D///8WfhwB8+ErK42A=";

/// Decode sample for a raster feature that needs a decode probe
pub fn raster_sample(feature: Feature) -> Option<&'static str> {
    match feature {
        Feature::Webp => Some(WEBP_SAMPLE),
        Feature::Avif => Some(AVIF_SAMPLE),
        _ => None,
    }
}

/// Scripting feature: every required global exists
pub fn probe_scripting(platform: &dyn Platform, feature: Feature) -> bool {
    let globals = feature.required_globals();
    !globals.is_empty() && globals.iter().all(|g| platform.has_global(g))
}

/// CSS feature: delegated to the platform's style query. Without a style
/// query every CSS feature is unsupported.
pub fn probe_css(platform: &dyn Platform, feature: Feature) -> bool {
    match (platform.style_query(), feature.css_declaration()) {
        (Some(query), Some((property, value))) => query.supports(property, value),
        _ => false,
    }
}

/// Raster feature: decode `sample` through an image element and require
/// non-zero decoded dimensions
///
/// Resolves `false` when the element cannot be created, the decode fails,
/// the bitmap is empty, the element drops its callback, or nothing settles
/// within `timeout`.
pub async fn probe_raster(platform: &dyn Platform, sample: &str, timeout: Duration) -> bool {
    let image = match platform.create_image() {
        Ok(image) => image,
        Err(e) => {
            debug!("Image decode probe skipped: {e}");
            return false;
        }
    };

    let (tx, rx) = smol::channel::bounded(1);
    image.load(
        sample,
        Box::new(move |outcome| {
            let _ = tx.try_send(outcome);
        }),
    );

    let settled = smol::future::or(async { rx.recv().await.ok() }, async {
        Timer::after(timeout).await;
        debug!("Image decode probe timed out after {timeout:?}");
        None
    })
    .await;

    matches!(settled, Some(ImageLoad::Loaded { width, height }) if width > 0 && height > 0)
}

/// Video codec features, each queried through one media element
///
/// Returns `(feature, supported)` for every codec feature; all `false` when
/// the element cannot be created.
pub fn probe_video_codecs(platform: &dyn Platform) -> Vec<(Feature, bool)> {
    let codecs = Feature::ALL.into_iter().filter(|f| f.codec_query().is_some());

    let video = match platform.create_video() {
        Ok(video) => video,
        Err(e) => {
            debug!("Video codec probe skipped: {e}");
            return codecs.map(|f| (f, false)).collect();
        }
    };

    codecs
        .map(|feature| {
            let query = feature.codec_query().unwrap_or_default();
            (feature, video.can_play_type(query).is_playable())
        })
        .collect()
}
