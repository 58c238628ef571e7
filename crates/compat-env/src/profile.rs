//! Browser Profile

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::{parse_identity, Identity};
use crate::policy::{BotPolicy, SupportPolicy};

/// Browser family
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BrowserName {
    Chrome,
    Firefox,
    Safari,
    Edge,
    #[default]
    Unknown,
}

impl BrowserName {
    pub const KNOWN: [BrowserName; 4] = [Self::Chrome, Self::Firefox, Self::Safari, Self::Edge];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
            Self::Edge => "edge",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BrowserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fingerprint of the running browser
///
/// Created once per session and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserProfile {
    pub name: BrowserName,
    pub version: u32,
    pub is_supported: bool,
}

impl BrowserProfile {
    /// The conservative profile used whenever detection fails
    pub const fn unknown() -> Self {
        Self {
            name: BrowserName::Unknown,
            version: 0,
            is_supported: false,
        }
    }

    /// Derive a profile from an identity string under `policy`
    pub fn from_identity(identity: &str, policy: &SupportPolicy) -> Self {
        match parse_identity(identity) {
            Identity::Browser { name, version } => Self {
                name,
                version,
                is_supported: policy.is_supported(name, version),
            },
            Identity::Automated => match policy.bot_policy {
                BotPolicy::TreatAsUnknown => Self::unknown(),
                BotPolicy::Bypass => Self {
                    is_supported: true,
                    ..Self::unknown()
                },
            },
            Identity::Unrecognized => Self::unknown(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.name == BrowserName::Unknown
    }
}

impl Default for BrowserProfile {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for BrowserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_supported { "supported" } else { "unsupported" };
        write!(f, "{} {} ({})", self.name, self.version, status)
    }
}
