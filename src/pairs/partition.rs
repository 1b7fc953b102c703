use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SubjectOrder;
use crate::data::model::{FeatureColumn, FeatureTable, FeatureValue};
use crate::error::{PairError, Result};

// ---------------------------------------------------------------------------
// RowGroup – the rows of one subject, projected onto the selected features
// ---------------------------------------------------------------------------

/// All rows of one subject, restricted to the selected feature columns.
/// Cells borrow from the feature table; nothing is copied or added to it.
#[derive(Debug, Clone)]
pub struct RowGroup<'t> {
    pub subject: &'t str,
    pub schema: Arc<[FeatureColumn]>,
    /// One entry per row, cells in `schema` order.
    pub rows: Vec<Vec<&'t FeatureValue>>,
}

impl RowGroup<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Work items and the pair plan
// ---------------------------------------------------------------------------

/// One unit of pairing work, referring to groups by their index in the
/// partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItem {
    /// Rows of subject `i` against rows of subject `j`, `i < j`.
    Across(usize, usize),
    /// Rows of one subject against each other.
    Within(usize),
}

/// Both worklists plus their exact output row counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairPlan {
    pub negatives: Vec<WorkItem>,
    pub positives: Vec<WorkItem>,
    pub negative_rows: usize,
    pub positive_rows: usize,
}

impl PairPlan {
    pub fn total_rows(&self) -> usize {
        self.negative_rows.saturating_add(self.positive_rows)
    }

    /// Negatives first, then positives, each in enumeration order.
    pub fn items(&self) -> impl Iterator<Item = WorkItem> + '_ {
        self.negatives.iter().chain(self.positives.iter()).copied()
    }

    pub fn len(&self) -> usize {
        self.negatives.len() + self.positives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.negatives.is_empty() && self.positives.is_empty()
    }
}

/// Number of unordered distinct pairs among `n` rows.
pub fn within_pair_count(n: usize) -> usize {
    n.saturating_mul(n.saturating_sub(1)) / 2
}

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// The feature table split into per-subject row groups.
#[derive(Debug, Clone)]
pub struct Partition<'t> {
    pub schema: Arc<[FeatureColumn]>,
    /// One group per subject, in subject order.
    pub groups: Vec<RowGroup<'t>>,
}

impl<'t> Partition<'t> {
    /// Group rows by subject, keeping only `feature_names` (in that order).
    ///
    /// Fails with a schema error when a requested feature is not a feature
    /// column of the table.
    pub fn new(
        table: &'t FeatureTable,
        feature_names: &[String],
        order: SubjectOrder,
    ) -> Result<Self> {
        let schema: Arc<[FeatureColumn]> = feature_names
            .iter()
            .map(|name| {
                table
                    .feature_kind(name)
                    .map(|kind| FeatureColumn::new(name.clone(), kind))
                    .ok_or_else(|| match table.unusable_feature(name) {
                        Some(reason) => PairError::UnusableFeature {
                            feature: name.clone(),
                            reason: reason.to_string(),
                        },
                        None => PairError::MissingFeature(name.clone()),
                    })
            })
            .collect::<Result<Vec<_>>>()?
            .into();

        let subjects = table.subjects(order);
        let slot: HashMap<&str, usize> = subjects
            .iter()
            .enumerate()
            .map(|(i, s)| (*s, i))
            .collect();

        let mut groups: Vec<RowGroup<'t>> = subjects
            .iter()
            .map(|&subject| RowGroup {
                subject,
                schema: Arc::clone(&schema),
                rows: Vec::new(),
            })
            .collect();

        for (row, obs) in table.observations().iter().enumerate() {
            let cells = schema
                .iter()
                .map(|col| {
                    obs.features.get(&col.name).ok_or_else(|| PairError::RaggedRow {
                        row,
                        reason: format!("missing feature `{}`", col.name),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            // Every subject came from this same scan, so the lookup always hits.
            if let Some(&i) = slot.get(obs.subject.as_str()) {
                groups[i].rows.push(cells);
            }
        }

        Ok(Partition { schema, groups })
    }

    /// The negative and positive worklists with their row counts.
    pub fn plan(&self) -> PairPlan {
        let u = self.groups.len();

        let negatives: Vec<WorkItem> = (0..u)
            .flat_map(|i| ((i + 1)..u).map(move |j| WorkItem::Across(i, j)))
            .collect();
        let positives: Vec<WorkItem> = (0..u).map(WorkItem::Within).collect();

        let negative_rows = negatives
            .iter()
            .map(|item| match *item {
                WorkItem::Across(i, j) => self.groups[i].len().saturating_mul(self.groups[j].len()),
                WorkItem::Within(_) => 0,
            })
            .fold(0usize, usize::saturating_add);
        let positive_rows = self
            .groups
            .iter()
            .map(|g| within_pair_count(g.len()))
            .fold(0usize, usize::saturating_add);

        PairPlan {
            negatives,
            positives,
            negative_rows,
            positive_rows,
        }
    }

    pub fn subjects(&self) -> Vec<&'t str> {
        self.groups.iter().map(|g| g.subject).collect()
    }
}
