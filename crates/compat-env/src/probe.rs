//! Environment Probe
//!
//! Produces the session's [`BrowserProfile`] once and hands out the same
//! instance afterwards.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::platform::Platform;
use crate::policy::SupportPolicy;
use crate::profile::BrowserProfile;

/// Memoizing environment probe
pub struct EnvironmentProbe {
    platform: Arc<dyn Platform>,
    policy: SupportPolicy,
    profile: OnceLock<BrowserProfile>,
}

impl EnvironmentProbe {
    pub fn new(platform: Arc<dyn Platform>, policy: SupportPolicy) -> Self {
        Self {
            platform,
            policy,
            profile: OnceLock::new(),
        }
    }

    /// The session's browser profile
    ///
    /// Computed on first call; concurrent first callers block on the same
    /// computation and every caller gets the same instance.
    pub fn browser_profile(&self) -> &BrowserProfile {
        self.profile.get_or_init(|| self.detect())
    }

    /// Profile if it has already been computed
    pub fn cached(&self) -> Option<&BrowserProfile> {
        self.profile.get()
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn policy(&self) -> &SupportPolicy {
        &self.policy
    }

    fn detect(&self) -> BrowserProfile {
        let profile = match self.platform.identity() {
            Some(identity) => BrowserProfile::from_identity(identity, &self.policy),
            None => {
                debug!("No browser environment, reporting unknown profile");
                BrowserProfile::unknown()
            }
        };
        info!("Detected browser profile: {profile}");
        profile
    }
}

impl std::fmt::Debug for EnvironmentProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentProbe")
            .field("policy", &self.policy)
            .field("profile", &self.profile.get())
            .finish_non_exhaustive()
    }
}
