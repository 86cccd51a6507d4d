// ============================================================
// Layer 4 — Feature Set Registry
// ============================================================
// A feature set is a numbered selection of clinical columns that
// are appended to the demographic features (sex one-hot, age).
//
// The registry is a closed enumeration: asking for a number it
// does not hold is a configuration error. The built-in sets use
// ADNIMERGE column names; a JSON file can replace them:
//
//   { "0": [], "5": ["PTEDUCAT", "APOE4", "FDG", "AV45"] }

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

use crate::domain::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSetRegistry {
    sets: BTreeMap<u32, Vec<String>>,
}

impl FeatureSetRegistry {
    pub fn new(sets: BTreeMap<u32, Vec<String>>) -> Self {
        Self { sets }
    }

    /// Read a registry from a JSON object keyed by selector number
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&json)?;
        tracing::debug!(
            "Loaded {} feature sets from '{}'",
            registry.sets.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Clinical columns for a selector, in feature-vector order
    pub fn resolve(&self, selector: u32) -> Result<&[String]> {
        self.sets.get(&selector).map(Vec::as_slice).ok_or_else(|| {
            let known: Vec<String> = self.sets.keys().map(u32::to_string).collect();
            Error::configuration(
                "features_set",
                selector,
                format!("known feature sets: {}", known.join(", ")),
            )
        })
    }

    pub fn selectors(&self) -> impl Iterator<Item = u32> + '_ {
        self.sets.keys().copied()
    }
}

impl Default for FeatureSetRegistry {
    fn default() -> Self {
        let sets: [(u32, &[&str]); 7] = [
            (0, &[]),
            (1, &["PTEDUCAT"]),
            (2, &["PTEDUCAT", "APOE4"]),
            (3, &["PTEDUCAT", "APOE4", "MMSE"]),
            (4, &["PTEDUCAT", "APOE4", "FDG", "AV45"]),
            (5, &["PTEDUCAT", "APOE4", "FDG", "AV45", "ABETA", "TAU", "PTAU"]),
            (6, &[
                "PTEDUCAT", "APOE4", "FDG", "AV45", "ABETA", "TAU", "PTAU",
                "CDRSB", "ADAS11", "ADAS13", "MMSE", "RAVLT_immediate",
            ]),
        ];

        let sets = sets
            .iter()
            .map(|(k, cols)| (*k, cols.iter().map(|c| c.to_string()).collect()))
            .collect();
        Self { sets }
    }
}
