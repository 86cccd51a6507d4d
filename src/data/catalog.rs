// ============================================================
// Layer 4 — Metadata Catalog
// ============================================================
// Turns the raw clinical table into the cleaned, immutable set
// of subject records that the splitter and the dataset views
// operate on.
//
// Cleaning steps (applied in order):
//   1. Resolve the feature set and the target (class count)
//   2. Check every required column is present
//   3. Drop rows with a null id, label, age, or sex
//   4. Apply the optional sex filter and age window
//   5. Reject duplicate subject ids
//   6. Reject labels missing from the relabeling table
//   7. Impute missing clinical values with the column mean
//   8. Normalise age by the configured scale
//
// Row positions in the catalog are dense 0..N-1; the fold
// assignment refers to rows by these positions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::data::feature_sets::FeatureSetRegistry;
use crate::domain::error::{Error, Result};
use crate::domain::subject::{ClassCount, Sex, SubjectRecord, Target};
use crate::domain::table::RawTable;

// ─── Configuration ────────────────────────────────────────────────────────────
/// How sex is stored in the source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SexColumns {
    /// One column of F/Female/M/Male strings
    Categorical(String),

    /// Two 0/1 indicator columns, as written by a dummy encoder
    OneHot { female: String, male: String },
}

/// Names of the columns carrying the four semantic roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    /// Unique subject id, also the volume lookup key
    pub subject: String,

    pub sex: SexColumns,

    /// Age in years
    pub age: String,

    /// Diagnosis group (ADNI) or project name (BrainAge)
    pub label: String,
}

impl ColumnMap {
    /// ADNIMERGE naming
    pub fn adni() -> Self {
        Self {
            subject: "Subject".into(),
            sex:     SexColumns::Categorical("PTGENDER".into()),
            age:     "AGE".into(),
            label:   "Group".into(),
        }
    }

    /// BrainAge healthy-subjects naming; the project name
    /// stands in for the label during stratification
    pub fn brain_age() -> Self {
        Self {
            subject: "Subject".into(),
            sex:     SexColumns::Categorical("Gender".into()),
            age:     "Age".into(),
            label:   "ProjName".into(),
        }
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::adni()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Names of the id, sex, age and label columns
    pub columns: ColumnMap,

    /// Selector into the FeatureSetRegistry
    pub features_set: u32,

    /// `Some(3 | 5)` for diagnosis classification,
    /// `None` for age regression
    pub num_classes:  Option<usize>,

    /// Age is stored as `age / age_scale`; 1.0 keeps raw ages
    pub age_scale:    f64,

    /// Keep only one sex
    pub sex_filter:   Option<Sex>,

    /// Keep only ages in `[lo, hi)`, on the raw scale
    pub age_window:   Option<(f64, f64)>,
}

impl CatalogConfig {
    pub fn target(&self) -> Result<Target> {
        match self.num_classes {
            Some(n) => Ok(Target::Classification(ClassCount::try_from(n)?)),
            None    => Ok(Target::AgeRegression),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            columns:      ColumnMap::adni(),
            features_set: 5,
            num_classes:  Some(3),
            age_scale:    100.0,
            sex_filter:   None,
            age_window:   None,
        }
    }
}

// ─── Label keys ───────────────────────────────────────────────────────────────
/// The label value used for stratification. Classification
/// targets stratify on the class id, so labels merged by the
/// relabeling share a stratum; otherwise the raw string is used.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKey {
    /// Relabeled class id (classification targets)
    Class(u32),

    /// Raw label string (regression targets)
    Name(String),
}

/// Rows removed during cleaning, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    /// Null subject id
    pub missing_id: usize,

    /// Null diagnosis / group
    pub missing_label: usize,

    /// Null or NaN age
    pub missing_age: usize,

    /// Null or unrecognised sex
    pub missing_sex: usize,

    /// Removed by `CatalogConfig::sex_filter`
    pub filtered_sex: usize,

    /// Outside `CatalogConfig::age_window`
    pub filtered_age: usize,
}

impl DropCounts {
    /// Rows dropped for any reason
    pub fn total(&self) -> usize {
        self.missing_id
            + self.missing_label
            + self.missing_age
            + self.missing_sex
            + self.filtered_sex
            + self.filtered_age
    }
}

// ─── MetadataCatalog ──────────────────────────────────────────────────────────
/// The cleaned cohort. Row `i` of the catalog is row `i` of every
/// fold assignment computed over it.
#[derive(Debug, Clone)]
pub struct MetadataCatalog {
    /// Cleaned subjects; index = dense catalog row
    records: Vec<SubjectRecord>,

    /// Clinical feature columns, in feature-vector order
    clinical_columns: Vec<String>,

    target: Target,

    /// Divisor applied to raw ages
    age_scale: f64,

    /// Rows removed while cleaning
    dropped: DropCounts,
}

/// Resolved column positions for one build
struct Positions {
    subject:  usize,
    sex:      SexPositions,
    age:      usize,
    label:    usize,
    clinical: Vec<usize>,
}

enum SexPositions {
    Categorical(usize),
    OneHot { female: usize, male: usize },
}

impl MetadataCatalog {
    /// Clean `table` according to `config`.
    pub fn build(
        table:    &RawTable,
        config:   &CatalogConfig,
        registry: &FeatureSetRegistry,
    ) -> Result<Self> {
        let target = config.target()?;
        if !(config.age_scale.is_finite() && config.age_scale > 0.0) {
            return Err(Error::configuration(
                "age_scale",
                config.age_scale,
                "must be a positive finite number",
            ));
        }
        let clinical_columns = registry.resolve(config.features_set)?.to_vec();
        let cols = &config.columns;

        let pos = Positions {
            subject:  table.require_column(&cols.subject)?,
            sex:      match &cols.sex {
                SexColumns::Categorical(c) => SexPositions::Categorical(table.require_column(c)?),
                SexColumns::OneHot { female, male } => SexPositions::OneHot {
                    female: table.require_column(female)?,
                    male:   table.require_column(male)?,
                },
            },
            age:      table.require_column(&cols.age)?,
            label:    table.require_column(&cols.label)?,
            clinical: clinical_columns
                .iter()
                .map(|c| table.require_column(c))
                .collect::<Result<_>>()?,
        };

        let mut dropped  = DropCounts::default();
        let mut seen     = HashSet::new();
        let mut partial: Vec<(SubjectRecord, Vec<Option<f64>>)> = Vec::new();

        for row in 0..table.len() {
            let Some(subject) = table.cell(row, pos.subject) else {
                dropped.missing_id += 1;
                continue;
            };
            let Some(label) = table.cell(row, pos.label) else {
                dropped.missing_label += 1;
                continue;
            };
            let Some(age) = table.cell(row, pos.age) else {
                dropped.missing_age += 1;
                continue;
            };
            let age = parse_number(age, &cols.age, subject)?;
            if age.is_nan() {
                dropped.missing_age += 1;
                continue;
            }
            let Some(sex) = read_sex(table, row, &pos.sex, subject)? else {
                dropped.missing_sex += 1;
                continue;
            };

            if config.sex_filter.is_some_and(|keep| keep != sex) {
                dropped.filtered_sex += 1;
                continue;
            }
            if let Some((lo, hi)) = config.age_window {
                if !(age >= lo && age < hi) {
                    dropped.filtered_age += 1;
                    continue;
                }
            }

            if !seen.insert(subject.to_string()) {
                return Err(Error::integrity(
                    cols.subject.as_str(),
                    format!("subject '{subject}' appears more than once"),
                ));
            }
            if let Target::Classification(classes) = target {
                classes.relabel(label).map_err(|_| {
                    Error::integrity(
                        cols.label.as_str(),
                        format!(
                            "label '{}' of subject '{}' has no entry in the {}-class relabeling table",
                            label,
                            subject,
                            classes.as_usize()
                        ),
                    )
                })?;
            }

            let clinical = pos
                .clinical
                .iter()
                .zip(&clinical_columns)
                .map(|(&c, name)| {
                    table
                        .cell(row, c)
                        .map(|v| parse_number(v, name, subject))
                        .transpose()
                        .map(|v| v.filter(|x| !x.is_nan()))
                })
                .collect::<Result<Vec<Option<f64>>>>()?;

            partial.push((
                SubjectRecord {
                    subject_id: subject.to_string(),
                    label:      label.to_string(),
                    sex,
                    age,
                    age_norm:   age / config.age_scale,
                    clinical:   Vec::new(),
                },
                clinical,
            ));
        }

        if partial.is_empty() {
            return Err(Error::integrity(
                cols.subject.as_str(),
                format!(
                    "no subjects left after filtering ({} of {} rows dropped)",
                    dropped.total(),
                    table.len()
                ),
            ));
        }

        let means = column_means(&partial, &clinical_columns)?;
        let mut imputed = 0usize;
        let records: Vec<SubjectRecord> = partial
            .into_iter()
            .map(|(mut record, values)| {
                record.clinical = values
                    .iter()
                    .zip(&means)
                    .map(|(v, &mean)| {
                        v.unwrap_or_else(|| {
                            imputed += 1;
                            mean
                        })
                    })
                    .collect();
                record
            })
            .collect();

        if dropped.total() > 0 {
            tracing::warn!(
                "Dropped {} of {} rows while cleaning: {:?}",
                dropped.total(),
                table.len(),
                dropped
            );
        }
        if imputed > 0 {
            tracing::debug!("Imputed {} missing clinical values with column means", imputed);
        }
        tracing::info!(
            "Catalog ready: {} subjects, {} clinical features (set {})",
            records.len(),
            clinical_columns.len(),
            config.features_set
        );

        Ok(Self {
            records,
            clinical_columns,
            target,
            age_scale: config.age_scale,
            dropped,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SubjectRecord] {
        &self.records
    }

    /// Record at a dense catalog row
    pub fn record(&self, row: usize) -> Option<&SubjectRecord> {
        self.records.get(row)
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn clinical_columns(&self) -> &[String] {
        &self.clinical_columns
    }

    pub fn age_scale(&self) -> f64 {
        self.age_scale
    }

    pub fn dropped(&self) -> DropCounts {
        self.dropped
    }

    /// Undo the age normalisation
    pub fn denormalize_age(&self, age_norm: f64) -> f64 {
        age_norm * self.age_scale
    }

    /// Column names of the model feature vector, in order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec!["sex_female".to_string(), "sex_male".to_string()];
        if self.target.age_is_feature() {
            names.push("age".to_string());
        }
        names.extend(self.clinical_columns.iter().cloned());
        names
    }

    /// Stratification label of a record
    pub fn label_key(&self, record: &SubjectRecord) -> LabelKey {
        match self.target {
            Target::Classification(classes) => match classes.class_id(&record.label) {
                Some(id) => LabelKey::Class(id),
                None     => LabelKey::Name(record.label.clone()),
            },
            Target::AgeRegression => LabelKey::Name(record.label.clone()),
        }
    }
}

// ─── Cell parsing ─────────────────────────────────────────────────────────────
fn parse_number(raw: &str, column: &str, subject: &str) -> Result<f64> {
    raw.trim().parse::<f64>().map_err(|_| {
        Error::integrity(column, format!("value '{raw}' of subject '{subject}' is not a number"))
    })
}

fn parse_indicator(raw: Option<&str>, column: &str, subject: &str) -> Result<bool> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("0") | Some("0.0") | Some("false") => Ok(false),
        Some("1") | Some("1.0") | Some("true")         => Ok(true),
        Some(other) => Err(Error::integrity(
            column,
            format!("indicator '{other}' of subject '{subject}' is not 0/1"),
        )),
    }
}

fn read_sex(
    table:   &RawTable,
    row:     usize,
    pos:     &SexPositions,
    subject: &str,
) -> Result<Option<Sex>> {
    match *pos {
        SexPositions::Categorical(c) => Ok(table.cell(row, c).and_then(Sex::parse)),
        SexPositions::OneHot { female, male } => {
            let (fname, mname) = (&table.headers()[female], &table.headers()[male]);
            let f = parse_indicator(table.cell(row, female), fname, subject)?;
            let m = parse_indicator(table.cell(row, male), mname, subject)?;
            Sex::from_one_hot(f, m).map(Some).ok_or_else(|| {
                Error::integrity(
                    format!("{fname}/{mname}"),
                    format!(
                        "sex indicators of subject '{subject}' sum to {}, expected exactly 1",
                        f as u8 + m as u8
                    ),
                )
            })
        }
    }
}

fn column_means(
    partial: &[(SubjectRecord, Vec<Option<f64>>)],
    columns: &[String],
) -> Result<Vec<f64>> {
    columns
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let present: Vec<f64> = partial.iter().filter_map(|(_, v)| v[j]).collect();
            if present.is_empty() {
                return Err(Error::integrity(name.as_str(), "column has no values to impute from"));
            }
            Ok(present.iter().sum::<f64>() / present.len() as f64)
        })
        .collect()
}
