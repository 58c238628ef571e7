//! Format Negotiation
//!
//! Image and validation choices are a strict "first supported wins" walk
//! over the caller's priorities. Video choices additionally prefer the most
//! storage-efficient codec the host can play.

use compat_features::{Feature, FeatureMatrix};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::format::{FormatId, MediaKind};

/// Anything the negotiator can choose between
pub trait Negotiable: Copy + std::fmt::Debug {
    fn is_supported(&self, matrix: &FeatureMatrix) -> bool;
}

impl Negotiable for FormatId {
    fn is_supported(&self, matrix: &FeatureMatrix) -> bool {
        matrix.get(self.feature())
    }
}

/// How forms get validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStrategy {
    /// The platform's constraint validation
    Native,
    /// Declarative validation run by this engine; always available
    Polyfill,
}

impl Negotiable for ValidationStrategy {
    fn is_supported(&self, matrix: &FeatureMatrix) -> bool {
        match self {
            Self::Native => matrix.get(Feature::ConstraintValidation),
            Self::Polyfill => true,
        }
    }
}

/// Chosen candidate plus the supported alternatives behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation<C> {
    pub chosen: Option<C>,
    /// Remaining supported candidates, in caller order
    pub fallback_chain: Vec<C>,
}

/// First candidate whose matrix key is set
///
/// `None` means nothing in the list is usable; the caller owns the final
/// baseline.
pub fn pick_format<C: Negotiable>(candidates: &[C], matrix: &FeatureMatrix) -> Option<C> {
    let chosen = candidates.iter().copied().find(|c| c.is_supported(matrix));
    if chosen.is_none() {
        debug!("No supported candidate in {candidates:?}");
    }
    chosen
}

/// [`pick_format`] plus the fallback chain
pub fn negotiate<C: Negotiable>(candidates: &[C], matrix: &FeatureMatrix) -> Negotiation<C> {
    let mut supported = candidates.iter().copied().filter(|c| c.is_supported(matrix));
    let chosen = supported.next();
    Negotiation {
        chosen,
        fallback_chain: supported.collect(),
    }
}

/// Efficiency rank of a video format, most efficient first
pub fn video_efficiency_rank(format: FormatId) -> Option<usize> {
    const EFFICIENCY: [FormatId; 5] = [
        FormatId::WebmVp9,
        FormatId::Webm,
        FormatId::WebmVp8,
        FormatId::Mp4,
        FormatId::Ogg,
    ];
    EFFICIENCY.iter().position(|&f| f == format)
}

/// Most storage-efficient supported video format among `candidates`
///
/// Unlike [`pick_format`] the caller's order only breaks ties. Non-video
/// candidates are ignored.
pub fn pick_optimal_video_format(
    candidates: &[FormatId],
    matrix: &FeatureMatrix,
) -> Option<FormatId> {
    candidates
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, f)| f.kind() == MediaKind::Video && f.is_supported(matrix))
        .filter_map(|(i, f)| video_efficiency_rank(f).map(|rank| (rank, i, f)))
        .min_by_key(|&(rank, i, _)| (rank, i))
        .map(|(_, _, f)| f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_supported_wins() {
        let matrix = FeatureMatrix::from_supported(&[Feature::Webp, Feature::Avif, Feature::Jpeg]);
        let candidates = [FormatId::Webp, FormatId::Avif, FormatId::Jpeg];
        assert_eq!(pick_format(&candidates, &matrix), Some(FormatId::Webp));
    }

    #[test]
    fn test_exhaustion() {
        let matrix = FeatureMatrix::none();
        assert_eq!(pick_format(&[FormatId::Avif, FormatId::Webp], &matrix), None);
        assert_eq!(pick_format::<FormatId>(&[], &matrix), None);

        let negotiation = negotiate(&[FormatId::Avif], &matrix);
        assert_eq!(negotiation.chosen, None);
        assert!(negotiation.fallback_chain.is_empty());
    }

    #[test]
    fn test_fallback_chain() {
        let matrix = FeatureMatrix::from_supported(&[Feature::Webp, Feature::Jpeg, Feature::Png]);
        let negotiation = negotiate(
            &[FormatId::Avif, FormatId::Webp, FormatId::Jpeg, FormatId::Png],
            &matrix,
        );
        assert_eq!(negotiation.chosen, Some(FormatId::Webp));
        assert_eq!(negotiation.fallback_chain, vec![FormatId::Jpeg, FormatId::Png]);
    }

    #[test]
    fn test_optimal_video_prefers_efficiency() {
        let matrix =
            FeatureMatrix::from_supported(&[Feature::Mp4, Feature::WebmVp9, Feature::Webm]);
        let candidates = [FormatId::Mp4, FormatId::Webm, FormatId::WebmVp9];

        assert_eq!(pick_format(&candidates, &matrix), Some(FormatId::Mp4));
        assert_eq!(pick_optimal_video_format(&candidates, &matrix), Some(FormatId::WebmVp9));
    }

    #[test]
    fn test_optimal_video_ignores_unsupported_and_images() {
        let matrix = FeatureMatrix::from_supported(&[Feature::Mp4, Feature::Ogg, Feature::Jpeg]);
        let candidates = [FormatId::Jpeg, FormatId::WebmVp9, FormatId::Ogg, FormatId::Mp4];
        assert_eq!(pick_optimal_video_format(&candidates, &matrix), Some(FormatId::Mp4));

        assert_eq!(pick_optimal_video_format(&[FormatId::Jpeg], &matrix), None);
    }

    #[test]
    fn test_validation_strategy() {
        let candidates = [ValidationStrategy::Native, ValidationStrategy::Polyfill];

        let native = FeatureMatrix::from_supported(&[Feature::ConstraintValidation]);
        assert_eq!(pick_format(&candidates, &native), Some(ValidationStrategy::Native));

        let bare = FeatureMatrix::none();
        assert_eq!(pick_format(&candidates, &bare), Some(ValidationStrategy::Polyfill));
    }
}
