use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::config::SubjectOrder;
use crate::error::{PairError, Result};

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in a metadata column
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value (registration flag, imposter flag,
/// session name, ...). Metadata never takes part in pairing; it is only
/// used to select rows before generation.
///
/// Used as a `BTreeSet` key downstream, so `MetadataValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn rank(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for MetadataValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MetadataValue::String(s) => s.hash(state),
            MetadataValue::Integer(i) => i.hash(state),
            MetadataValue::Float(f) => f.to_bits().hash(state),
            MetadataValue::Bool(b) => b.hash(state),
            MetadataValue::Null => {}
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<i32> for MetadataValue {
    fn from(i: i32) -> Self {
        MetadataValue::Integer(i as i64)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

// ---------------------------------------------------------------------------
// Feature cells and columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// One number per row (a hold time, a flight time, ...).
    Numeric,
    /// A variable-length numeric sequence per row (raw timestamps).
    Sequence,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Numeric => write!(f, "numeric"),
            FeatureKind::Sequence => write!(f, "sequence"),
        }
    }
}

/// A single feature cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Sequence(Vec<f64>),
}

impl FeatureValue {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Numeric(_) => FeatureKind::Numeric,
            FeatureValue::Sequence(_) => FeatureKind::Sequence,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            FeatureValue::Sequence(_) => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[f64]> {
        match self {
            FeatureValue::Sequence(s) => Some(s),
            FeatureValue::Numeric(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Numeric(v)
    }
}

impl From<Vec<f64>> for FeatureValue {
    fn from(s: Vec<f64>) -> Self {
        FeatureValue::Sequence(s)
    }
}

/// Name and kind of one feature column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureColumn {
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Observation – one row of the feature table
// ---------------------------------------------------------------------------

/// A single typing observation: who typed it, its features, and any
/// metadata that travels with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub subject: String,
    pub features: BTreeMap<String, FeatureValue>,
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Observation {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            features: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_numeric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.insert(name.into(), FeatureValue::Numeric(value));
        self
    }

    pub fn with_sequence(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.features.insert(name.into(), FeatureValue::Sequence(values));
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// FeatureTable – the validated input
// ---------------------------------------------------------------------------

/// The validated feature table: every observation carries the same feature
/// columns with the same kinds. Metadata may be sparse.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    observations: Vec<Observation>,
    /// Feature columns, in name order.
    feature_columns: Vec<FeatureColumn>,
    /// Ordered list of metadata column names.
    metadata_columns: Vec<String>,
    /// For each metadata column the sorted set of unique values.
    unique_values: BTreeMap<String, BTreeSet<MetadataValue>>,
    /// Source feature columns left out of the table, with the reason.
    unusable_features: BTreeMap<String, String>,
}

impl FeatureTable {
    /// Build a table, checking that all rows share one feature schema.
    pub fn from_observations(observations: Vec<Observation>) -> Result<Self> {
        let feature_columns: Vec<FeatureColumn> = match observations.first() {
            Some(first) => first
                .features
                .iter()
                .map(|(name, value)| FeatureColumn::new(name.clone(), value.kind()))
                .collect(),
            None => Vec::new(),
        };

        for (row, obs) in observations.iter().enumerate() {
            if obs.features.len() != feature_columns.len() {
                return Err(PairError::RaggedRow {
                    row,
                    reason: format!(
                        "has {} feature columns, expected {}",
                        obs.features.len(),
                        feature_columns.len()
                    ),
                });
            }
            for col in &feature_columns {
                match obs.features.get(&col.name) {
                    Some(value) if value.kind() == col.kind => {}
                    Some(value) => {
                        return Err(PairError::RaggedRow {
                            row,
                            reason: format!(
                                "feature `{}` is {} but earlier rows hold {}",
                                col.name,
                                value.kind(),
                                col.kind
                            ),
                        });
                    }
                    None => {
                        return Err(PairError::RaggedRow {
                            row,
                            reason: format!("missing feature `{}`", col.name),
                        });
                    }
                }
            }
        }

        let mut unique_values: BTreeMap<String, BTreeSet<MetadataValue>> = BTreeMap::new();
        for obs in &observations {
            for (col, val) in &obs.metadata {
                unique_values.entry(col.clone()).or_default().insert(val.clone());
            }
        }
        let metadata_columns: Vec<String> = unique_values.keys().cloned().collect();

        Ok(FeatureTable {
            observations,
            feature_columns,
            metadata_columns,
            unique_values,
            unusable_features: BTreeMap::new(),
        })
    }

    /// Record source columns that could not be read as features, so a pass
    /// that asks for one can say why it is missing.
    pub(crate) fn with_unusable_features(mut self, unusable: BTreeMap<String, String>) -> Self {
        self.unusable_features = unusable;
        self
    }

    /// Why `name` was left out of the table, if it was.
    pub fn unusable_feature(&self, name: &str) -> Option<&str> {
        self.unusable_features.get(name).map(String::as_str)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn feature_columns(&self) -> &[FeatureColumn] {
        &self.feature_columns
    }

    pub fn metadata_columns(&self) -> &[String] {
        &self.metadata_columns
    }

    pub fn unique_values(&self, column: &str) -> Option<&BTreeSet<MetadataValue>> {
        self.unique_values.get(column)
    }

    pub fn feature_kind(&self, name: &str) -> Option<FeatureKind> {
        self.feature_columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.kind)
    }

    /// Distinct subject ids in the requested order.
    pub fn subjects(&self, order: SubjectOrder) -> Vec<&str> {
        match order {
            SubjectOrder::Sorted => self
                .observations
                .iter()
                .map(|o| o.subject.as_str())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            SubjectOrder::FirstSeen => {
                let mut seen = HashSet::new();
                self.observations
                    .iter()
                    .map(|o| o.subject.as_str())
                    .filter(|s| seen.insert(*s))
                    .collect()
            }
        }
    }

    /// A new table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let observations: Vec<Observation> = indices
            .iter()
            .filter_map(|&i| self.observations.get(i).cloned())
            .collect();

        let mut unique_values: BTreeMap<String, BTreeSet<MetadataValue>> = BTreeMap::new();
        for obs in &observations {
            for (col, val) in &obs.metadata {
                unique_values.entry(col.clone()).or_default().insert(val.clone());
            }
        }

        // Rows of a valid table are valid, so the schema carries over as is.
        FeatureTable {
            feature_columns: if observations.is_empty() {
                Vec::new()
            } else {
                self.feature_columns.clone()
            },
            metadata_columns: unique_values.keys().cloned().collect(),
            unique_values,
            unusable_features: self.unusable_features.clone(),
            observations,
        }
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
