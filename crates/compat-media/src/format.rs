//! Format Identifiers

use std::fmt;
use std::str::FromStr;

use compat_features::Feature;
use serde::{Deserialize, Serialize};

/// Media kind a format belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A negotiable media format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatId {
    Avif,
    Webp,
    Jpeg,
    Png,
    /// WebM with whichever codec the host plays
    Webm,
    WebmVp9,
    WebmVp8,
    Mp4,
    Ogg,
}

impl FormatId {
    pub const ALL: [FormatId; 9] = [
        Self::Avif,
        Self::Webp,
        Self::Jpeg,
        Self::Png,
        Self::Webm,
        Self::WebmVp9,
        Self::WebmVp8,
        Self::Mp4,
        Self::Ogg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webm => "webm",
            Self::WebmVp9 => "webm-vp9",
            Self::WebmVp8 => "webm-vp8",
            Self::Mp4 => "mp4",
            Self::Ogg => "ogg",
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Avif | Self::Webp | Self::Jpeg | Self::Png => MediaKind::Image,
            _ => MediaKind::Video,
        }
    }

    /// Matrix key that decides whether this format is usable
    pub fn feature(&self) -> Feature {
        match self {
            Self::Avif => Feature::Avif,
            Self::Webp => Feature::Webp,
            Self::Jpeg => Feature::Jpeg,
            Self::Png => Feature::Png,
            Self::Webm => Feature::Webm,
            Self::WebmVp9 => Feature::WebmVp9,
            Self::WebmVp8 => Feature::WebmVp8,
            Self::Mp4 => Feature::Mp4,
            Self::Ogg => Feature::Ogg,
        }
    }

    /// MIME type for `<source type>` attributes
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Avif => "image/avif",
            Self::Webp => "image/webp",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webm => "video/webm",
            Self::WebmVp9 => "video/webm; codecs=\"vp9\"",
            Self::WebmVp8 => "video/webm; codecs=\"vp8, vorbis\"",
            Self::Mp4 => "video/mp4",
            Self::Ogg => "video/ogg",
        }
    }

    /// File extension for asset URLs
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webm | Self::WebmVp9 | Self::WebmVp8 => "webm",
            Self::Mp4 => "mp4",
            Self::Ogg => "ogv",
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown format identifier
#[derive(Debug, thiserror::Error)]
#[error("Unknown format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for FormatId {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "jpg" => Ok(Self::Jpeg),
            "ogv" => Ok(Self::Ogg),
            other => Self::ALL
                .into_iter()
                .find(|f| f.as_str() == other)
                .ok_or_else(|| UnknownFormat(s.to_string())),
        }
    }
}
