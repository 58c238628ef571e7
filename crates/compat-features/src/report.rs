//! Compatibility Report
//!
//! Summarizes a session's profile and matrix for diagnostics: what is
//! missing and what stands in for it.

use compat_env::BrowserProfile;
use serde::{Deserialize, Serialize};

use crate::feature::{Feature, FeatureCategory};
use crate::matrix::FeatureMatrix;

/// A missing feature and what replaces it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub feature: Feature,
    pub category: FeatureCategory,
    /// What is used instead, if anything
    pub fallback: Option<String>,
}

/// Session compatibility report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityReport {
    pub profile: BrowserProfile,
    pub matrix: FeatureMatrix,
    pub support_percentage: f32,
    pub degradations: Vec<Degradation>,
}

impl CompatibilityReport {
    pub fn new(profile: &BrowserProfile, matrix: &FeatureMatrix) -> Self {
        let degradations = matrix
            .missing()
            .map(|feature| Degradation {
                feature,
                category: feature.category(),
                fallback: fallback_for(feature).map(str::to_string),
            })
            .collect();

        Self {
            profile: profile.clone(),
            matrix: matrix.clone(),
            support_percentage: matrix.support_percentage(),
            degradations,
        }
    }

    /// Missing features with no replacement
    pub fn unmitigated(&self) -> impl Iterator<Item = &Degradation> {
        self.degradations.iter().filter(|d| d.fallback.is_none())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Format as markdown report
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Compatibility Report\n\n");
        md.push_str("## Summary\n\n");
        md.push_str(&format!("- Browser: {}\n", self.profile));
        md.push_str(&format!("- Feature Support: {:.1}%\n", self.support_percentage));
        md.push_str(&format!("- Degradations: {}\n\n", self.degradations.len()));

        md.push_str("## Features\n\n");
        md.push_str("| Feature | Category | Status | Fallback |\n");
        md.push_str("|---------|----------|--------|----------|\n");

        for feature in Feature::ALL {
            let supported = self.matrix.get(feature);
            let status = if supported { "✅" } else { "❌" };
            let fallback = if supported {
                "-"
            } else {
                fallback_for(feature).unwrap_or("none")
            };
            md.push_str(&format!(
                "| {} | {:?} | {} | {} |\n",
                feature,
                feature.category(),
                status,
                fallback
            ));
        }

        md
    }
}

/// Replacement used when `feature` is missing
pub fn fallback_for(feature: Feature) -> Option<&'static str> {
    match feature {
        Feature::IntersectionObserver => Some("polling visibility observer"),
        Feature::FormData => Some("manual multipart encoder"),
        Feature::ConstraintValidation => Some("declarative validation"),
        Feature::Avif | Feature::Webp => Some("jpeg/png"),
        Feature::Webm | Feature::WebmVp8 | Feature::WebmVp9 => Some("mp4/ogg"),
        Feature::Ogg | Feature::OggTheora => Some("mp4"),
        Feature::CssGrid => Some("flexbox layout"),
        _ => None,
    }
}
