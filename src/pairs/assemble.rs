use std::fmt;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::PairConfig;
use crate::data::model::{FeatureColumn, FeatureTable, FeatureValue};
use crate::error::{PairError, Result};

use super::partition::{PairPlan, Partition, WorkItem};
use super::represent::{represent, PairTable, Pairing, Representation};
use super::LABEL_COLUMN;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairLabel {
    /// Rows from two different subjects.
    Different = 0,
    /// Two rows from the same subject.
    Same = 1,
}

impl PairLabel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PairLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// The labeled output of one work item.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledChunk {
    pub label: PairLabel,
    /// Subjects on the A and B side (equal for positives).
    pub subjects: (String, String),
    pub table: PairTable,
}

// ---------------------------------------------------------------------------
// PairwiseDataset – the final artifact
// ---------------------------------------------------------------------------

/// The labeled pairwise dataset: feature columns plus a trailing `label`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseDataset {
    columns: Vec<FeatureColumn>,
    rows: Vec<Vec<FeatureValue>>,
    labels: Vec<PairLabel>,
}

impl PairwiseDataset {
    fn from_chunks(columns: Vec<FeatureColumn>, capacity: usize, chunks: Vec<LabeledChunk>) -> Self {
        let mut rows = Vec::with_capacity(capacity);
        let mut labels = Vec::with_capacity(capacity);
        for chunk in chunks {
            labels.extend(std::iter::repeat(chunk.label).take(chunk.table.len()));
            rows.extend(chunk.table.rows);
        }
        PairwiseDataset { columns, rows, labels }
    }

    /// Feature columns, without the label.
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// All output column names, `label` last.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(std::iter::once(LABEL_COLUMN))
            .collect()
    }

    /// Number of output columns, including `label`.
    pub fn n_columns(&self) -> usize {
        self.columns.len() + 1
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<FeatureValue>] {
        &self.rows
    }

    pub fn labels(&self) -> &[PairLabel] {
        &self.labels
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&FeatureValue> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }

    pub fn count(&self, label: PairLabel) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// PairGenerator – drives partitioner and engine
// ---------------------------------------------------------------------------

/// A validated, planned generation pass over one feature table.
///
/// All configuration and schema checks, and the `max_rows` bound, are
/// applied in [`PairGenerator::new`]; once a generator exists, generation
/// can only fail on an internal schema inconsistency.
#[derive(Debug)]
pub struct PairGenerator<'t> {
    partition: Partition<'t>,
    plan: PairPlan,
    repr: Representation,
    columns: Vec<FeatureColumn>,
    parallel: bool,
}

impl<'t> PairGenerator<'t> {
    pub fn new(table: &'t FeatureTable, config: &PairConfig) -> Result<Self> {
        config.validate()?;

        let partition = Partition::new(table, &config.feature_names, config.subject_order)?;
        let repr = Representation::from_config(config);
        repr.check(&partition.schema)?;

        let plan = partition.plan();
        if let Some(limit) = config.max_rows {
            if plan.total_rows() > limit {
                return Err(PairError::RowLimitExceeded {
                    planned: plan.total_rows(),
                    limit,
                });
            }
        }

        if partition.groups.len() < 2 {
            warn!(
                "only {} subject(s) in the table; the dataset will hold no cross-subject pairs",
                partition.groups.len()
            );
        }
        debug!(
            "planned {} work items over {} subjects: {} negative rows, {} positive rows",
            plan.len(),
            partition.groups.len(),
            plan.negative_rows,
            plan.positive_rows
        );

        let columns = repr.output_columns(&partition.schema);
        Ok(PairGenerator {
            partition,
            plan,
            repr,
            columns,
            parallel: config.parallel,
        })
    }

    pub fn plan(&self) -> &PairPlan {
        &self.plan
    }

    /// Subjects in enumeration order.
    pub fn subjects(&self) -> Vec<&'t str> {
        self.partition.subjects()
    }

    /// Output feature columns (without `label`).
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    fn run(&self, item: WorkItem) -> Result<LabeledChunk> {
        let groups = &self.partition.groups;
        let (pairing, label) = match item {
            WorkItem::Across(i, j) => (Pairing::Across(&groups[i], &groups[j]), PairLabel::Different),
            WorkItem::Within(i) => (Pairing::Within(&groups[i]), PairLabel::Same),
        };
        let subjects = match pairing {
            Pairing::Across(a, b) => (a.subject.to_string(), b.subject.to_string()),
            Pairing::Within(g) => (g.subject.to_string(), g.subject.to_string()),
        };

        let table = represent(pairing, &self.repr)?;
        debug!(
            "{} vs {}: {} rows labeled {}",
            subjects.0,
            subjects.1,
            table.len(),
            label
        );
        Ok(LabeledChunk { label, subjects, table })
    }

    /// Labeled partial tables one work item at a time: every negative, then
    /// every positive, in enumeration order.
    pub fn chunks(&self) -> impl Iterator<Item = Result<LabeledChunk>> + '_ {
        self.plan.items().map(move |item| self.run(item))
    }

    /// Build the whole dataset in memory.
    pub fn generate(&self) -> Result<PairwiseDataset> {
        let items: Vec<WorkItem> = self.plan.items().collect();
        let chunks: Vec<LabeledChunk> = if self.parallel {
            items.par_iter().map(|&item| self.run(item)).collect::<Result<_>>()?
        } else {
            items.iter().map(|&item| self.run(item)).collect::<Result<_>>()?
        };

        let dataset = PairwiseDataset::from_chunks(self.columns.clone(), self.plan.total_rows(), chunks);
        info!(
            "generated {} pair rows ({} different-subject, {} same-subject) from {} subjects",
            dataset.len(),
            self.plan.negative_rows,
            self.plan.positive_rows,
            self.partition.groups.len()
        );
        Ok(dataset)
    }
}

/// Build the labeled pairwise dataset for `table` in one call.
pub fn extract_pairs(table: &FeatureTable, config: &PairConfig) -> Result<PairwiseDataset> {
    PairGenerator::new(table, config)?.generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubjectOrder;
    use crate::data::model::Observation;
    use crate::error::ErrorKind;

    fn table(sizes: &[(&str, usize)]) -> FeatureTable {
        let mut rows = Vec::new();
        for (s, (subject, n)) in sizes.iter().enumerate() {
            for k in 0..*n {
                rows.push(
                    Observation::new(*subject)
                        .with_numeric("h", (s * 10 + k) as f64)
                        .with_numeric("f", (s * 100 + k) as f64),
                );
            }
        }
        FeatureTable::from_observations(rows).unwrap()
    }

    #[test]
    fn labels_follow_negatives_then_positives() {
        let t = table(&[("a", 2), ("b", 1), ("c", 2)]);
        let ds = extract_pairs(&t, &PairConfig::new(["h", "f"], true)).unwrap();

        assert_eq!(ds.len(), 10);
        assert_eq!(ds.count(PairLabel::Different), 8);
        assert_eq!(ds.count(PairLabel::Same), 2);
        assert!(ds.labels()[..8].iter().all(|&l| l == PairLabel::Different));
        assert!(ds.labels()[8..].iter().all(|&l| l == PairLabel::Same));
        assert_eq!(ds.column_names(), vec!["h", "f", "label"]);
    }

    #[test]
    fn chunks_match_generate() {
        let t = table(&[("a", 3), ("b", 2)]);
        let gen = PairGenerator::new(&t, &PairConfig::new(["h"], false)).unwrap();
        let chunks: Vec<LabeledChunk> = gen.chunks().collect::<Result<_>>().unwrap();
        let ds = gen.generate().unwrap();

        let rows: Vec<Vec<FeatureValue>> = chunks.iter().flat_map(|c| c.table.rows.clone()).collect();
        assert_eq!(rows.as_slice(), ds.rows());
        assert_eq!(chunks[0].subjects, ("a".to_string(), "b".to_string()));
        assert_eq!(chunks[0].label, PairLabel::Different);
    }

    #[test]
    fn row_limit_is_checked_before_work() {
        let t = table(&[("a", 3), ("b", 3)]);
        // 9 negative + 3 + 3 positive rows.
        let err = PairGenerator::new(&t, &PairConfig::new(["h"], true).with_max_rows(14)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceLimit);
        assert!(PairGenerator::new(&t, &PairConfig::new(["h"], true).with_max_rows(15)).is_ok());
    }

    #[test]
    fn first_seen_order_changes_row_order_only() {
        let t = table(&[("zed", 2), ("amy", 2)]);
        let sorted = PairGenerator::new(&t, &PairConfig::new(["h"], false)).unwrap();
        let seen =
            PairGenerator::new(&t, &PairConfig::new(["h"], false).with_subject_order(SubjectOrder::FirstSeen)).unwrap();

        assert_eq!(sorted.subjects(), vec!["amy", "zed"]);
        assert_eq!(seen.subjects(), vec!["zed", "amy"]);
        assert_eq!(sorted.generate().unwrap().len(), seen.generate().unwrap().len());
    }

    #[test]
    fn empty_table_has_no_feature_columns() {
        let t = FeatureTable::default();
        let err = PairGenerator::new(&t, &PairConfig::new(["h"], true)).unwrap_err();
        assert!(matches!(err, PairError::MissingFeature(_)));
    }
}
