//! Identity String Parsing
//!
//! Resolves a user-agent identity string to a browser family and major
//! version. Signatures overlap heavily (every Chromium derivative claims to
//! be Safari, every Edge claims to be Chrome), so they are tried in a fixed
//! priority order and the first match wins.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::profile::BrowserName;

/// Result of parsing an identity string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Browser { name: BrowserName, version: u32 },
    /// Crawlers, headless tooling and audit agents
    Automated,
    Unrecognized,
}

struct Signature {
    name: BrowserName,
    pattern: Regex,
}

impl Signature {
    fn new(name: BrowserName, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("browser signature must be a valid regex"),
        }
    }

    /// Major version captured by the signature, if it matches
    fn version(&self, identity: &str) -> Option<Option<u32>> {
        let captures = self.pattern.captures(identity)?;
        Some(captures.get(1).and_then(|m| m.as_str().parse().ok()))
    }
}

static AUTOMATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)googlebot|bingbot|yandexbot|duckduckbot|baiduspider|applebot|slurp|twitterbot|linkedinbot|facebookexternalhit|petalbot|ahrefsbot|semrushbot|compatible; [a-z]+bot|\b(?:crawler|spider)\b|headlesschrome|lighthouse|phantomjs",
    )
    .expect("automated agent pattern must be a valid regex")
});

/// Signatures in priority order
static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    vec![
        // Chromium Edge (desktop, Android, iOS) and legacy EdgeHTML
        Signature::new(BrowserName::Edge, r"\b(?:Edg|EdgA|EdgiOS|Edge)/(\d+)"),
        Signature::new(BrowserName::Firefox, r"\b(?:Firefox|FxiOS)/(\d+)"),
        // Chrome, Chrome on iOS, Android WebView and Chromium wrappers
        Signature::new(BrowserName::Chrome, r"\b(?:Chrome|CriOS)/(\d+)"),
        Signature::new(BrowserName::Safari, r"\bVersion/(\d+)(?:\.\d+)*.*\bSafari/"),
        // App-embedded WebKit views on iOS report no Version/ token; the
        // engine ships with the OS so the OS major version stands in.
        Signature::new(
            BrowserName::Safari,
            r"\((?:iPhone|iPad|iPod);[^)]*?\bOS (\d+)(?:_\d+)* like Mac OS X\).*AppleWebKit/",
        ),
    ]
});

/// Parse an identity string. Never fails: anything that cannot be resolved
/// is [`Identity::Unrecognized`].
pub fn parse_identity(identity: &str) -> Identity {
    let identity = identity.trim();
    if identity.is_empty() {
        return Identity::Unrecognized;
    }
    if AUTOMATED.is_match(identity) {
        debug!("Identity string belongs to an automated agent");
        return Identity::Automated;
    }

    for signature in SIGNATURES.iter() {
        match signature.version(identity) {
            Some(Some(version)) => {
                return Identity::Browser {
                    name: signature.name,
                    version,
                };
            }
            // Signature matched but the version does not fit; a lower-priority
            // signature must not claim the string instead.
            Some(None) => break,
            None => continue,
        }
    }

    debug!("Unrecognized identity string: {identity}");
    Identity::Unrecognized
}
