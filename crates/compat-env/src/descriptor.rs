//! Described Platforms
//!
//! A platform built from a declarative descriptor: what the identity string
//! is, which globals exist, which style declarations and media types the
//! host accepts. Used for headless targets, recorded environments and tests.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::platform::{
    CanPlayType, ImageElement, ImageLoad, LoadCallback, MediaElement, Platform, PlatformError,
    StyleQuery,
};

/// Declarative description of a host platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlatformDescriptor {
    /// Identity string; `None` for a non-browser context
    pub identity: Option<String>,
    /// Globals and constructors that exist
    pub globals: BTreeSet<String>,
    /// Accepted `property: value` declarations; `None` when the platform has
    /// no style-support query at all
    pub css: Option<BTreeSet<String>>,
    /// Image MIME types that decode to a visible bitmap
    pub image_types: BTreeSet<String>,
    /// Image MIME types that "decode" to a 0x0 bitmap
    pub blank_image_types: BTreeSet<String>,
    /// `canPlayType` answers keyed by the exact queried string
    pub media_types: BTreeMap<String, CanPlayType>,
    /// Element construction throws (resource exhaustion)
    pub fail_element_creation: bool,
}

impl PlatformDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A current evergreen browser with the given identity string
    pub fn evergreen(identity: &str) -> Self {
        Self::new()
            .with_identity(identity)
            .with_globals(&[
                "fetch",
                "Promise",
                "IntersectionObserver",
                "FileReader",
                "File",
                "FormData",
                "CustomEvent",
                "Object.assign",
                "HTMLInputElement.prototype.checkValidity",
            ])
            .with_css(&[("display", "grid"), ("display", "flex"), ("--probe", "0")])
            .with_image_type("image/webp")
            .with_image_type("image/avif")
            .with_media_type("video/webm; codecs=\"vp8, vorbis\"", CanPlayType::Probably)
            .with_media_type("video/webm; codecs=\"vp9\"", CanPlayType::Probably)
            .with_media_type("video/mp4; codecs=\"avc1.42E01E\"", CanPlayType::Probably)
            .with_media_type("video/ogg; codecs=\"theora\"", CanPlayType::Maybe)
    }

    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }

    pub fn with_globals(mut self, globals: &[&str]) -> Self {
        self.globals.extend(globals.iter().map(|g| g.to_string()));
        self
    }

    pub fn without_global(mut self, global: &str) -> Self {
        self.globals.remove(global);
        self
    }

    /// Install a style query accepting exactly these declarations
    pub fn with_css(mut self, declarations: &[(&str, &str)]) -> Self {
        let css = self.css.get_or_insert_with(BTreeSet::new);
        css.extend(declarations.iter().map(|(p, v)| declaration(p, v)));
        self
    }

    pub fn without_css(mut self, property: &str, value: &str) -> Self {
        if let Some(css) = self.css.as_mut() {
            css.remove(&declaration(property, value));
        }
        self
    }

    /// Remove the style query entirely
    pub fn without_style_query(mut self) -> Self {
        self.css = None;
        self
    }

    pub fn with_image_type(mut self, mime_type: &str) -> Self {
        self.image_types.insert(mime_type.to_string());
        self
    }

    pub fn without_image_type(mut self, mime_type: &str) -> Self {
        self.image_types.remove(mime_type);
        self
    }

    pub fn with_blank_image_type(mut self, mime_type: &str) -> Self {
        self.image_types.remove(mime_type);
        self.blank_image_types.insert(mime_type.to_string());
        self
    }

    pub fn with_media_type(mut self, query: &str, answer: CanPlayType) -> Self {
        self.media_types.insert(query.to_string(), answer);
        self
    }

    pub fn with_failing_elements(mut self) -> Self {
        self.fail_element_creation = true;
        self
    }

    pub fn build(self) -> DescribedPlatform {
        DescribedPlatform::new(self)
    }
}

fn declaration(property: &str, value: &str) -> String {
    format!("{}: {}", property.trim(), value.trim())
}

/// Platform backed by a [`PlatformDescriptor`]
#[derive(Debug, Clone)]
pub struct DescribedPlatform {
    descriptor: PlatformDescriptor,
    style: Option<DescribedStyle>,
}

impl DescribedPlatform {
    pub fn new(descriptor: PlatformDescriptor) -> Self {
        let style = descriptor.css.clone().map(DescribedStyle);
        Self { descriptor, style }
    }

    pub fn descriptor(&self) -> &PlatformDescriptor {
        &self.descriptor
    }
}

impl Platform for DescribedPlatform {
    fn identity(&self) -> Option<&str> {
        self.descriptor.identity.as_deref()
    }

    fn has_global(&self, path: &str) -> bool {
        self.descriptor.globals.contains(path)
    }

    fn style_query(&self) -> Option<&dyn StyleQuery> {
        self.style.as_ref().map(|s| s as &dyn StyleQuery)
    }

    fn create_image(&self) -> Result<Box<dyn ImageElement>, PlatformError> {
        if self.descriptor.fail_element_creation {
            return Err(PlatformError::ElementCreation("img".to_string()));
        }
        Ok(Box::new(DescribedImage {
            visible: self.descriptor.image_types.clone(),
            blank: self.descriptor.blank_image_types.clone(),
        }))
    }

    fn create_video(&self) -> Result<Box<dyn MediaElement>, PlatformError> {
        if self.descriptor.fail_element_creation {
            return Err(PlatformError::ElementCreation("video".to_string()));
        }
        Ok(Box::new(DescribedMedia {
            answers: self.descriptor.media_types.clone(),
        }))
    }
}

#[derive(Debug, Clone)]
struct DescribedStyle(BTreeSet<String>);

impl StyleQuery for DescribedStyle {
    fn supports(&self, property: &str, value: &str) -> bool {
        self.0.contains(&declaration(property, value))
    }
}

#[derive(Debug)]
struct DescribedImage {
    visible: BTreeSet<String>,
    blank: BTreeSet<String>,
}

impl ImageElement for DescribedImage {
    fn load(self: Box<Self>, src: &str, on_settled: LoadCallback) {
        let outcome = match data_uri_mime(src) {
            Some(mime) if self.visible.contains(mime) => ImageLoad::Loaded {
                width: 1,
                height: 1,
            },
            Some(mime) if self.blank.contains(mime) => ImageLoad::Loaded {
                width: 0,
                height: 0,
            },
            _ => ImageLoad::Failed,
        };
        on_settled(outcome);
    }
}

/// MIME type of a `data:` URI
fn data_uri_mime(src: &str) -> Option<&str> {
    let rest = src.strip_prefix("data:")?;
    let end = rest.find([';', ','])?;
    Some(&rest[..end])
}

#[derive(Debug)]
struct DescribedMedia {
    answers: BTreeMap<String, CanPlayType>,
}

impl MediaElement for DescribedMedia {
    fn can_play_type(&self, mime_type: &str) -> CanPlayType {
        self.answers.get(mime_type).copied().unwrap_or_default()
    }
}
