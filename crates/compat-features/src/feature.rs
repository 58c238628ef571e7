//! Feature Keys
//!
//! The closed set of capabilities the matrix tracks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of probe answers for a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    Scripting,
    Css,
    Image,
    Video,
}

/// A tracked capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    // Scripting APIs
    Fetch,
    Promises,
    IntersectionObserver,
    FileApi,
    FormData,
    CustomEvent,
    ObjectAssign,
    ConstraintValidation,
    // CSS
    CssGrid,
    CssFlexbox,
    CustomProperties,
    // Raster formats
    Jpeg,
    Png,
    Webp,
    Avif,
    // Video containers and codecs
    Webm,
    WebmVp8,
    WebmVp9,
    Mp4,
    Mp4H264,
    Ogg,
    OggTheora,
}

impl Feature {
    pub const COUNT: usize = 22;

    pub const ALL: [Feature; Self::COUNT] = [
        Self::Fetch,
        Self::Promises,
        Self::IntersectionObserver,
        Self::FileApi,
        Self::FormData,
        Self::CustomEvent,
        Self::ObjectAssign,
        Self::ConstraintValidation,
        Self::CssGrid,
        Self::CssFlexbox,
        Self::CustomProperties,
        Self::Jpeg,
        Self::Png,
        Self::Webp,
        Self::Avif,
        Self::Webm,
        Self::WebmVp8,
        Self::WebmVp9,
        Self::Mp4,
        Self::Mp4H264,
        Self::Ogg,
        Self::OggTheora,
    ];

    /// Stable camelCase key
    pub fn key(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Promises => "promises",
            Self::IntersectionObserver => "intersectionObserver",
            Self::FileApi => "fileApi",
            Self::FormData => "formData",
            Self::CustomEvent => "customEvent",
            Self::ObjectAssign => "objectAssign",
            Self::ConstraintValidation => "constraintValidation",
            Self::CssGrid => "cssGrid",
            Self::CssFlexbox => "cssFlexbox",
            Self::CustomProperties => "customProperties",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Webm => "webm",
            Self::WebmVp8 => "webmVp8",
            Self::WebmVp9 => "webmVp9",
            Self::Mp4 => "mp4",
            Self::Mp4H264 => "mp4H264",
            Self::Ogg => "ogg",
            Self::OggTheora => "oggTheora",
        }
    }

    /// Look a key up. Only for configuration and wire boundaries; code
    /// should name features directly.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn category(&self) -> FeatureCategory {
        match self {
            Self::Fetch
            | Self::Promises
            | Self::IntersectionObserver
            | Self::FileApi
            | Self::FormData
            | Self::CustomEvent
            | Self::ObjectAssign
            | Self::ConstraintValidation => FeatureCategory::Scripting,
            Self::CssGrid | Self::CssFlexbox | Self::CustomProperties => FeatureCategory::Css,
            Self::Jpeg | Self::Png | Self::Webp | Self::Avif => FeatureCategory::Image,
            Self::Webm
            | Self::WebmVp8
            | Self::WebmVp9
            | Self::Mp4
            | Self::Mp4H264
            | Self::Ogg
            | Self::OggTheora => FeatureCategory::Video,
        }
    }

    /// Globals that must all exist for a scripting feature
    pub fn required_globals(&self) -> &'static [&'static str] {
        match self {
            Self::Fetch => &["fetch"],
            Self::Promises => &["Promise"],
            Self::IntersectionObserver => &["IntersectionObserver"],
            Self::FileApi => &["FileReader", "File"],
            Self::FormData => &["FormData"],
            Self::CustomEvent => &["CustomEvent"],
            Self::ObjectAssign => &["Object.assign"],
            Self::ConstraintValidation => &["HTMLInputElement.prototype.checkValidity"],
            _ => &[],
        }
    }

    /// Declaration handed to the style-support query for a CSS feature
    pub fn css_declaration(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::CssGrid => Some(("display", "grid")),
            Self::CssFlexbox => Some(("display", "flex")),
            Self::CustomProperties => Some(("--probe", "0")),
            _ => None,
        }
    }

    /// `canPlayType` query for a video codec feature. Container features
    /// have none; they are derived from their codecs.
    pub fn codec_query(&self) -> Option<&'static str> {
        match self {
            Self::WebmVp8 => Some("video/webm; codecs=\"vp8, vorbis\""),
            Self::WebmVp9 => Some("video/webm; codecs=\"vp9\""),
            Self::Mp4H264 => Some("video/mp4; codecs=\"avc1.42E01E\""),
            Self::OggTheora => Some("video/ogg; codecs=\"theora\""),
            _ => None,
        }
    }

    /// Codec features that make up a container feature
    pub fn container_codecs(&self) -> &'static [Feature] {
        match self {
            Self::Webm => &[Self::WebmVp8, Self::WebmVp9],
            Self::Mp4 => &[Self::Mp4H264],
            Self::Ogg => &[Self::OggTheora],
            _ => &[],
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Unknown feature key
#[derive(Debug, thiserror::Error)]
#[error("Unknown feature key: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| UnknownFeature(s.to_string()))
    }
}
