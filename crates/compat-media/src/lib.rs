//! fOS Compat Media
//!
//! Picks image formats, video codecs and validation strategies from the
//! session's [`FeatureMatrix`](compat_features::FeatureMatrix).

pub mod fallback;
pub mod format;
pub mod negotiate;

pub use fallback::{fallback_if_unsupported, generate_fallback_strategy, FallbackStrategy};
pub use format::{FormatId, MediaKind, UnknownFormat};
pub use negotiate::{
    negotiate, pick_format, pick_optimal_video_format, video_efficiency_rank, Negotiable,
    Negotiation, ValidationStrategy,
};
