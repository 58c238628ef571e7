//! Fallback Strategies
//!
//! What to serve when a requested format turns out to be unusable.

use compat_features::FeatureMatrix;
use serde::{Deserialize, Serialize};

use crate::format::{FormatId, MediaKind};
use crate::negotiate::{Negotiable, pick_format};

const VIDEO_BASELINE: [FormatId; 2] = [FormatId::Mp4, FormatId::Ogg];
const IMAGE_BASELINE: [FormatId; 2] = [FormatId::Jpeg, FormatId::Png];

/// Ordered replacements for an unusable format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackStrategy {
    pub original_format: FormatId,
    pub fallback_formats: Vec<FormatId>,
    pub reason: String,
}

impl FallbackStrategy {
    /// First fallback the host can actually use
    pub fn resolve(&self, matrix: &FeatureMatrix) -> Option<FormatId> {
        pick_format(&self.fallback_formats, matrix)
    }
}

/// Build the fallback list for `original`
///
/// Video falls back to the widely supported containers, images to the
/// baseline raster formats. The original never appears in its own list.
pub fn generate_fallback_strategy(original: FormatId, kind: MediaKind) -> FallbackStrategy {
    let (baseline, reason) = match kind {
        MediaKind::Video => (
            VIDEO_BASELINE,
            format!("{original} video is not playable; serving a widely supported container"),
        ),
        MediaKind::Image => (
            IMAGE_BASELINE,
            format!("{original} images do not decode; serving a baseline raster format"),
        ),
    };

    FallbackStrategy {
        original_format: original,
        fallback_formats: baseline.into_iter().filter(|&f| f != original).collect(),
        reason,
    }
}

/// Fallback strategy only if `format` is unusable on this host
pub fn fallback_if_unsupported(
    format: FormatId,
    matrix: &FeatureMatrix,
) -> Option<FallbackStrategy> {
    if format.is_supported(matrix) {
        None
    } else {
        Some(generate_fallback_strategy(format, format.kind()))
    }
}
