//! Feature Matrix
//!
//! Probe results for one session. Every key in [`Feature::ALL`] is always
//! present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::feature::{Feature, FeatureCategory};

/// Feature → supported map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Feature, bool>", into = "BTreeMap<Feature, bool>")]
pub struct FeatureMatrix {
    support: [bool; Feature::COUNT],
}

impl FeatureMatrix {
    /// Matrix with every feature unsupported
    pub fn none() -> Self {
        Self {
            support: [false; Feature::COUNT],
        }
    }

    /// Matrix with exactly `features` supported
    pub fn from_supported(features: &[Feature]) -> Self {
        let mut matrix = Self::none();
        for &feature in features {
            matrix.set(feature, true);
        }
        matrix
    }

    pub fn with(mut self, feature: Feature, supported: bool) -> Self {
        self.set(feature, supported);
        self
    }

    pub(crate) fn set(&mut self, feature: Feature, supported: bool) {
        self.support[index(feature)] = supported;
    }

    /// Whether `feature` is supported
    pub fn get(&self, feature: Feature) -> bool {
        self.support[index(feature)]
    }

    pub fn supported(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(move |&f| self.get(f))
    }

    pub fn missing(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(move |&f| !self.get(f))
    }

    pub fn in_category(
        &self,
        category: FeatureCategory,
    ) -> impl Iterator<Item = (Feature, bool)> + '_ {
        Feature::ALL
            .into_iter()
            .filter(move |f| f.category() == category)
            .map(move |f| (f, self.get(f)))
    }

    /// Share of tracked features that are supported, in percent
    pub fn support_percentage(&self) -> f32 {
        let supported = self.supported().count() as f32;
        supported / Feature::ALL.len() as f32 * 100.0
    }
}

fn index(feature: Feature) -> usize {
    feature as usize
}

impl Default for FeatureMatrix {
    fn default() -> Self {
        Self::none()
    }
}

impl From<BTreeMap<Feature, bool>> for FeatureMatrix {
    fn from(map: BTreeMap<Feature, bool>) -> Self {
        let mut matrix = Self::none();
        for (feature, supported) in map {
            matrix.set(feature, supported);
        }
        matrix
    }
}

impl From<FeatureMatrix> for BTreeMap<Feature, bool> {
    fn from(matrix: FeatureMatrix) -> Self {
        Feature::ALL.into_iter().map(|f| (f, matrix.get(f))).collect()
    }
}
