//! Platform Capability Descriptor
//!
//! The seam between the engine and the host. Each platform target provides
//! one implementation, selected at startup; probes ask it typed questions
//! instead of poking at globals.

use serde::{Deserialize, Serialize};

/// Host platform the engine runs on
pub trait Platform: Send + Sync {
    /// User-agent identity string. `None` when there is no browser
    /// environment at all (server rendering).
    fn identity(&self) -> Option<&str>;

    /// Whether a named global or constructor exists (`"fetch"`,
    /// `"Object.assign"`, ...)
    fn has_global(&self, path: &str) -> bool;

    /// The platform's style-support query, if it has one
    fn style_query(&self) -> Option<&dyn StyleQuery>;

    /// Create a detached image element for decode probes
    fn create_image(&self) -> Result<Box<dyn ImageElement>, PlatformError>;

    /// Create a detached media element for codec queries
    fn create_video(&self) -> Result<Box<dyn MediaElement>, PlatformError>;

    /// Whether this platform is a browser environment
    fn is_browser(&self) -> bool {
        self.identity().is_some()
    }
}

/// `CSS.supports`-shaped query
pub trait StyleQuery: Send + Sync {
    fn supports(&self, property: &str, value: &str) -> bool;
}

/// Callback invoked once when an image load settles
pub type LoadCallback = Box<dyn FnOnce(ImageLoad) + Send>;

/// Image element used for decode probes
pub trait ImageElement: Send {
    /// Start loading `src`; `on_settled` fires from the element's load or
    /// error handler. Implementations may drop the callback without calling
    /// it (element torn down), which probes treat as a failure.
    fn load(self: Box<Self>, src: &str, on_settled: LoadCallback);
}

/// Outcome of an image load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLoad {
    Loaded { width: u32, height: u32 },
    Failed,
}

/// Media element used for codec queries
pub trait MediaElement: Send {
    fn can_play_type(&self, mime_type: &str) -> CanPlayType;
}

/// Can play type result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanPlayType {
    #[default]
    Empty,
    Maybe,
    Probably,
}

impl CanPlayType {
    /// "probably" and "maybe" both count as playable
    pub fn is_playable(&self) -> bool {
        matches!(self, Self::Maybe | Self::Probably)
    }

    /// Parse the host's string answer; anything unexpected is `Empty`
    pub fn from_answer(answer: &str) -> Self {
        match answer {
            "probably" => Self::Probably,
            "maybe" => Self::Maybe,
            _ => Self::Empty,
        }
    }
}

/// Platform error
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("No browser environment")]
    NoEnvironment,

    #[error("Element creation failed: {0}")]
    ElementCreation(String),
}

/// Platform for non-browser execution contexts
///
/// Every probe comes back negative. This is the server-rendering target,
/// not an error state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerPlatform;

impl Platform for ServerPlatform {
    fn identity(&self) -> Option<&str> {
        None
    }

    fn has_global(&self, _path: &str) -> bool {
        false
    }

    fn style_query(&self) -> Option<&dyn StyleQuery> {
        None
    }

    fn create_image(&self) -> Result<Box<dyn ImageElement>, PlatformError> {
        Err(PlatformError::NoEnvironment)
    }

    fn create_video(&self) -> Result<Box<dyn MediaElement>, PlatformError> {
        Err(PlatformError::NoEnvironment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_play_type_answers() {
        assert_eq!(CanPlayType::from_answer("probably"), CanPlayType::Probably);
        assert_eq!(CanPlayType::from_answer("maybe"), CanPlayType::Maybe);
        assert_eq!(CanPlayType::from_answer(""), CanPlayType::Empty);
        assert_eq!(CanPlayType::from_answer("no"), CanPlayType::Empty);

        assert!(CanPlayType::Probably.is_playable());
        assert!(CanPlayType::Maybe.is_playable());
        assert!(!CanPlayType::Empty.is_playable());
    }

    #[test]
    fn test_server_platform_is_empty() {
        let platform = ServerPlatform;
        assert!(!platform.is_browser());
        assert!(!platform.has_global("fetch"));
        assert!(platform.style_query().is_none());
        assert!(platform.create_image().is_err());
        assert!(platform.create_video().is_err());
    }
}
