use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{PairError, Result};
use crate::pairs::LABEL_COLUMN;

/// Suffixes of the first and second block of a concatenated pair, as
/// pandas' cartesian merge names them.
pub const DEFAULT_SUFFIXES: (&str, &str) = ("_A", "_B");

// ---------------------------------------------------------------------------
// Subject ordering
// ---------------------------------------------------------------------------

/// How distinct subjects are ordered before pair enumeration.
///
/// The order fixes the output row order, so both variants are deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectOrder {
    /// Lexicographic by subject id.
    #[default]
    Sorted,
    /// Order of first appearance in the feature table.
    FirstSeen,
}

// ---------------------------------------------------------------------------
// Pair representation mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairMode {
    /// Elementwise `|a - b|`, same columns as the input.
    AbsDiff,
    /// Both feature vectors side by side under suffixed column names.
    Concat,
}

// ---------------------------------------------------------------------------
// PairConfig
// ---------------------------------------------------------------------------

/// Configuration of one generation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    /// Feature columns to keep, in output order. Everything else is dropped.
    pub feature_names: Vec<String>,

    /// Emit absolute feature differences instead of both feature vectors.
    pub only_feature_diffs: bool,

    pub subject_order: SubjectOrder,

    /// Suffixes for the first and second block of a concatenated pair.
    pub suffixes: (String, String),

    /// Upper bound on generated rows, checked against the plan before any work.
    pub max_rows: Option<usize>,

    /// Fan work items out over the rayon pool.
    pub parallel: bool,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            feature_names: Vec::new(),
            only_feature_diffs: false,
            subject_order: SubjectOrder::default(),
            suffixes: (DEFAULT_SUFFIXES.0.to_string(), DEFAULT_SUFFIXES.1.to_string()),
            max_rows: None,
            parallel: false,
        }
    }
}

impl PairConfig {
    pub fn new<I, S>(feature_names: I, only_feature_diffs: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feature_names: feature_names.into_iter().map(Into::into).collect(),
            only_feature_diffs,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: PairConfig = serde_json::from_str(text)
            .map_err(|e| PairError::InvalidConfig(format!("parsing JSON config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_subject_order(mut self, order: SubjectOrder) -> Self {
        self.subject_order = order;
        self
    }

    pub fn with_suffixes(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.suffixes = (a.into(), b.into());
        self
    }

    pub fn with_max_rows(mut self, limit: usize) -> Self {
        self.max_rows = Some(limit);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn mode(&self) -> PairMode {
        if self.only_feature_diffs {
            PairMode::AbsDiff
        } else {
            PairMode::Concat
        }
    }

    /// Names of the output feature columns (without the trailing label).
    pub fn output_names(&self) -> Vec<String> {
        match self.mode() {
            PairMode::AbsDiff => self.feature_names.clone(),
            PairMode::Concat => {
                let (sa, sb) = &self.suffixes;
                let a = self.feature_names.iter().map(|n| format!("{n}{sa}"));
                let b = self.feature_names.iter().map(|n| format!("{n}{sb}"));
                a.chain(b).collect()
            }
        }
    }

    /// Table-independent checks. The sequence/diff-mode check needs the
    /// table schema and runs when a generator is built.
    pub fn validate(&self) -> Result<()> {
        if self.feature_names.is_empty() {
            return Err(PairError::InvalidConfig(
                "`feature_names` must name at least one feature".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for name in &self.feature_names {
            if name.is_empty() {
                return Err(PairError::InvalidConfig(
                    "`feature_names` contains an empty name".into(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(PairError::InvalidConfig(format!(
                    "feature `{name}` is listed twice in `feature_names`"
                )));
            }
        }

        if self.mode() == PairMode::Concat {
            let (sa, sb) = &self.suffixes;
            if sa.is_empty() || sb.is_empty() {
                return Err(PairError::InvalidConfig(format!(
                    "suffixes must be non-empty, got ({sa:?}, {sb:?})"
                )));
            }
            if sa == sb {
                return Err(PairError::InvalidConfig(format!(
                    "suffixes must differ, got {sa:?} twice"
                )));
            }
        }

        let mut out = BTreeSet::new();
        for name in self.output_names() {
            if name == LABEL_COLUMN {
                return Err(PairError::InvalidConfig(format!(
                    "output column `{name}` collides with the label column"
                )));
            }
            if !out.insert(name.clone()) {
                return Err(PairError::InvalidConfig(format!(
                    "output column `{name}` would be produced twice"
                )));
            }
        }
        Ok(())
    }
}
