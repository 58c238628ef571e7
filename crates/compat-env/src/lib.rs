//! fOS Compat Environment
//!
//! Fingerprints the running browser from its identity string and describes
//! what the host platform can do.
//!
//! # Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use compat_env::{EnvironmentProbe, ServerPlatform, SupportPolicy};
//!
//! let probe = EnvironmentProbe::new(Arc::new(ServerPlatform), SupportPolicy::default());
//! let profile = probe.browser_profile();
//! assert!(!profile.is_supported);
//! ```

pub mod descriptor;
pub mod identity;
pub mod millis;
pub mod platform;
pub mod policy;
pub mod probe;
pub mod profile;

pub use descriptor::{DescribedPlatform, PlatformDescriptor};
pub use identity::{parse_identity, Identity};
pub use platform::{
    CanPlayType, ImageElement, ImageLoad, LoadCallback, MediaElement, Platform, PlatformError,
    ServerPlatform, StyleQuery,
};
pub use policy::{BotPolicy, SupportPolicy};
pub use probe::EnvironmentProbe;
pub use profile::{BrowserName, BrowserProfile};
