// ============================================================
// Layer 3 — Subject Domain Types
// ============================================================
// One cleaned row of the clinical table, plus the small closed
// vocabularies attached to it: sex, class count, and the fixed
// diagnosis relabeling tables.
//
// Relabeling (diagnosis string → class id):
//
//   label   3-class   5-class
//   CN      0         0
//   MCI     1         1
//   EMCI    1         3
//   LMCI    1         4
//   AD      2         2

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::{Error, Result};

const THREE_CLASS_TABLE: [(&str, u32); 5] =
    [("CN", 0), ("MCI", 1), ("EMCI", 1), ("LMCI", 1), ("AD", 2)];

const FIVE_CLASS_TABLE: [(&str, u32); 5] =
    [("CN", 0), ("MCI", 1), ("AD", 2), ("EMCI", 3), ("LMCI", 4)];

// ─── Sex ──────────────────────────────────────────────────────────────────────
/// Binary sex. Ordered Female < Male, which is the enumeration
/// order used when walking strata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    /// Parse a raw sex cell. Accepts F/Female/M/Male in any case.
    /// Anything else (including an empty cell) is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "f" | "female" => Some(Sex::Female),
            "m" | "male"   => Some(Sex::Male),
            _              => None,
        }
    }

    /// Decode a pre-encoded indicator pair. Exactly one must be set.
    pub fn from_one_hot(female: bool, male: bool) -> Option<Self> {
        match (female, male) {
            (true, false) => Some(Sex::Female),
            (false, true) => Some(Sex::Male),
            _             => None,
        }
    }

    /// `[female, male]` indicator columns
    pub fn one_hot(self) -> [bool; 2] {
        match self {
            Sex::Female => [true, false],
            Sex::Male   => [false, true],
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Female => write!(f, "F"),
            Sex::Male   => write!(f, "M"),
        }
    }
}

// ─── ClassCount ───────────────────────────────────────────────────────────────
/// How many diagnosis classes the relabeling collapses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassCount {
    /// CN / MCI (incl. EMCI, LMCI) / AD
    Three,

    /// CN / MCI / AD / EMCI / LMCI
    Five,
}

impl ClassCount {
    pub fn as_usize(self) -> usize {
        match self {
            ClassCount::Three => 3,
            ClassCount::Five  => 5,
        }
    }

    fn table(self) -> &'static [(&'static str, u32)] {
        match self {
            ClassCount::Three => &THREE_CLASS_TABLE,
            ClassCount::Five  => &FIVE_CLASS_TABLE,
        }
    }

    /// Look up the class id of a diagnosis label
    pub fn class_id(self, label: &str) -> Option<u32> {
        self.table()
            .iter()
            .find(|(name, _)| *name == label)
            .map(|&(_, id)| id)
    }

    /// Like `class_id`, but an unmapped label is a `DataIntegrity` error
    pub fn relabel(self, label: &str) -> Result<u32> {
        self.class_id(label).ok_or_else(|| {
            Error::integrity(
                "label",
                format!(
                    "label '{}' has no entry in the {}-class relabeling table",
                    label,
                    self.as_usize()
                ),
            )
        })
    }
}

impl TryFrom<usize> for ClassCount {
    type Error = Error;

    fn try_from(n: usize) -> Result<Self> {
        match n {
            3 => Ok(ClassCount::Three),
            5 => Ok(ClassCount::Five),
            other => Err(Error::configuration("num_classes", other, "expected 3 or 5")),
        }
    }
}

// ─── Target ───────────────────────────────────────────────────────────────────
/// What the downstream model predicts.
///
///   Classification → ADNI diagnosis, label relabeled to a class id
///   AgeRegression  → BrainAge, normalised age is the target and the
///                    label column only feeds stratification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Classification(ClassCount),
    AgeRegression,
}

impl Target {
    /// Normalised age is a model input only when it is not the target
    pub fn age_is_feature(self) -> bool {
        matches!(self, Target::Classification(_))
    }
}

/// The label half of a dataset item
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetValue {
    /// Class id from the relabeling table
    Class(u32),

    /// `age / age_scale`
    Age(f32),
}

impl TargetValue {
    /// The class id, or `None` for an age target
    pub fn class_id(self) -> Option<u32> {
        match self {
            TargetValue::Class(c) => Some(c),
            TargetValue::Age(_)   => None,
        }
    }

    /// Numeric value of the target, class ids included
    pub fn as_f32(self) -> f32 {
        match self {
            TargetValue::Class(c) => c as f32,
            TargetValue::Age(a)   => a,
        }
    }
}

// ─── SubjectRecord ────────────────────────────────────────────────────────────
/// One cleaned subject row. Every field the splitter needs is
/// non-null by construction; the catalog drops rows that are not.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    /// Unique subject identifier, also the volume lookup key
    pub subject_id: String,

    /// Raw diagnosis / group string
    pub label: String,

    pub sex: Sex,

    /// Age as read from the table
    pub age: f64,

    /// `age / age_scale`
    pub age_norm: f64,

    /// Extra clinical features in feature-set column order
    pub clinical: Vec<f64>,
}

impl SubjectRecord {
    /// Model input vector: `[female, male, age_norm?, clinical...]`
    pub fn feature_vector(&self, target: Target) -> Vec<f32> {
        let [female, male] = self.sex.one_hot();
        let mut v = Vec::with_capacity(3 + self.clinical.len());
        v.push(if female { 1.0 } else { 0.0 });
        v.push(if male   { 1.0 } else { 0.0 });
        if target.age_is_feature() {
            v.push(self.age_norm as f32);
        }
        v.extend(self.clinical.iter().map(|&x| x as f32));
        v
    }

    /// Resolve the training target for this subject
    pub fn target_value(&self, target: Target) -> Result<TargetValue> {
        match target {
            Target::Classification(classes) => Ok(TargetValue::Class(classes.relabel(&self.label)?)),
            Target::AgeRegression           => Ok(TargetValue::Age(self.age_norm as f32)),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str, sex: Sex) -> SubjectRecord {
        SubjectRecord {
            subject_id: "002_S_0295".into(),
            label:      label.into(),
            sex,
            age:        84.8,
            age_norm:   0.848,
            clinical:   vec![16.0, 1.0],
        }
    }

    #[test]
    fn test_relabel_tables_cover_all_diagnoses() {
        for label in ["CN", "MCI", "AD", "EMCI", "LMCI"] {
            assert!(ClassCount::Three.class_id(label).is_some(), "{label} missing (3)");
            assert!(ClassCount::Five.class_id(label).is_some(), "{label} missing (5)");
        }
    }

    #[test]
    fn test_three_class_merges_mci_variants() {
        assert_eq!(ClassCount::Three.class_id("EMCI"), Some(1));
        assert_eq!(ClassCount::Three.class_id("LMCI"), Some(1));
        assert_eq!(ClassCount::Three.class_id("AD"),   Some(2));
        assert_eq!(ClassCount::Five.class_id("LMCI"),  Some(4));
    }

    #[test]
    fn test_unmapped_label_is_integrity_error() {
        let err = ClassCount::Five.relabel("SMC").unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { .. }));
    }

    #[test]
    fn test_class_count_rejects_four() {
        assert!(ClassCount::try_from(3).is_ok());
        let err = ClassCount::try_from(4).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_sex_parsing_and_one_hot() {
        assert_eq!(Sex::parse(" female "), Some(Sex::Female));
        assert_eq!(Sex::parse("M"), Some(Sex::Male));
        assert_eq!(Sex::parse(""), None);
        assert_eq!(Sex::from_one_hot(true, true), None);
        for sex in [Sex::Female, Sex::Male] {
            let hot = sex.one_hot();
            assert_eq!(hot.iter().filter(|&&b| b).count(), 1);
        }
    }

    #[test]
    fn test_feature_vector_layout_depends_on_target() {
        let r = record("CN", Sex::Male);
        let cls = r.feature_vector(Target::Classification(ClassCount::Three));
        assert_eq!(cls, vec![0.0, 1.0, 0.848, 16.0, 1.0]);
        let reg = r.feature_vector(Target::AgeRegression);
        assert_eq!(reg, vec![0.0, 1.0, 16.0, 1.0]);
    }

    #[test]
    fn test_target_value() {
        let r = record("LMCI", Sex::Female);
        assert_eq!(
            r.target_value(Target::Classification(ClassCount::Five)).unwrap(),
            TargetValue::Class(4)
        );
        assert_eq!(r.target_value(Target::AgeRegression).unwrap(), TargetValue::Age(0.848));
    }
}
