//! Support Policy
//!
//! Minimum supported versions are product policy, so they live in
//! configuration rather than in the parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::profile::BrowserName;

/// How automated agents (crawlers, headless tooling) are gated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BotPolicy {
    /// Report bots as an unknown, unsupported browser
    #[default]
    TreatAsUnknown,
    /// Report bots as unknown but supported, so they skip compatibility gating
    Bypass,
}

/// Per-engine minimum versions and bot handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupportPolicy {
    pub minimum_versions: BTreeMap<BrowserName, u32>,
    pub bot_policy: BotPolicy,
}

impl Default for SupportPolicy {
    fn default() -> Self {
        let minimum_versions = BTreeMap::from([
            (BrowserName::Chrome, 80),
            (BrowserName::Firefox, 78),
            (BrowserName::Safari, 13),
            (BrowserName::Edge, 80),
        ]);
        Self {
            minimum_versions,
            bot_policy: BotPolicy::default(),
        }
    }
}

impl SupportPolicy {
    /// Override the minimum version for one engine
    pub fn with_minimum(mut self, name: BrowserName, version: u32) -> Self {
        self.minimum_versions.insert(name, version);
        self
    }

    pub fn with_bot_policy(mut self, bot_policy: BotPolicy) -> Self {
        self.bot_policy = bot_policy;
        self
    }

    pub fn minimum_version(&self, name: BrowserName) -> Option<u32> {
        self.minimum_versions.get(&name).copied()
    }

    /// A browser is supported at or above its minimum. Engines without an
    /// entry (and `Unknown`) are never supported.
    pub fn is_supported(&self, name: BrowserName, version: u32) -> bool {
        if name == BrowserName::Unknown {
            return false;
        }
        self.minimum_version(name)
            .is_some_and(|minimum| version >= minimum)
    }
}
