//! Pair representation: turns two row groups into one row per retained
//! row pair.
//!
//! ```text
//!   across (A, B)              within (G)
//!   ┌───┬───┬───┐             ┌───┬───┬───┐
//!   │ ● │ ● │ ● │  |A|·|B|    │   │ ● │ ● │  n·(n-1)/2
//!   ├───┼───┼───┤             ├───┼───┼───┤
//!   │ ● │ ● │ ● │             │   │   │ ● │
//!   └───┴───┴───┘             ├───┼───┼───┤
//!                             │   │   │   │
//!                             └───┴───┴───┘
//! ```
//!
//! Only the marked cells are ever visited: the diagonal and the mirrored
//! lower triangle of a within-group comparison are never materialized.

use std::sync::Arc;

use crate::config::{PairConfig, PairMode, DEFAULT_SUFFIXES};
use crate::data::model::{FeatureColumn, FeatureKind, FeatureValue};
use crate::error::{PairError, Result};

use super::partition::{within_pair_count, RowGroup};

// ---------------------------------------------------------------------------
// Row-pair index generation
// ---------------------------------------------------------------------------

/// Row-index pairs `(i, j)` to emit for one work item, row-major in `i`.
///
/// Across two groups every `(i, j)` is produced. Within one group only
/// `i < j` is produced, so row `i` always lands in the first block.
#[derive(Debug, Clone)]
pub struct PairIndices {
    n_a: usize,
    n_b: usize,
    within: bool,
    i: usize,
    j: usize,
}

impl PairIndices {
    pub fn across(n_a: usize, n_b: usize) -> Self {
        Self { n_a, n_b, within: false, i: 0, j: 0 }
    }

    pub fn within(n: usize) -> Self {
        Self { n_a: n, n_b: n, within: true, i: 0, j: 1 }
    }

    fn remaining(&self) -> usize {
        if self.i >= self.n_a {
            return 0;
        }
        let in_row = self.n_b.saturating_sub(self.j);
        let later_rows = if self.within {
            within_pair_count(self.n_a - self.i - 1)
        } else {
            (self.n_a - self.i - 1) * self.n_b
        };
        in_row + later_rows
    }
}

impl Iterator for PairIndices {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        while self.i < self.n_a {
            if self.j < self.n_b {
                let pair = (self.i, self.j);
                self.j += 1;
                return Some(pair);
            }
            self.i += 1;
            self.j = if self.within { self.i + 1 } else { 0 };
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for PairIndices {}

// ---------------------------------------------------------------------------
// Representation settings
// ---------------------------------------------------------------------------

/// How a row pair is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Representation {
    pub mode: PairMode,
    pub suffixes: (String, String),
}

impl Representation {
    pub fn new(mode: PairMode) -> Self {
        Self {
            mode,
            suffixes: (DEFAULT_SUFFIXES.0.to_string(), DEFAULT_SUFFIXES.1.to_string()),
        }
    }

    pub fn from_config(config: &PairConfig) -> Self {
        Self {
            mode: config.mode(),
            suffixes: config.suffixes.clone(),
        }
    }

    /// Reject schemas this mode cannot encode.
    pub fn check(&self, schema: &[FeatureColumn]) -> Result<()> {
        if self.mode == PairMode::AbsDiff {
            if let Some(col) = schema.iter().find(|c| c.kind == FeatureKind::Sequence) {
                return Err(PairError::SequenceInDiffMode {
                    feature: col.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Output feature columns for an input schema.
    pub fn output_columns(&self, schema: &[FeatureColumn]) -> Vec<FeatureColumn> {
        match self.mode {
            PairMode::AbsDiff => schema.to_vec(),
            PairMode::Concat => {
                let (sa, sb) = &self.suffixes;
                let a = schema
                    .iter()
                    .map(|c| FeatureColumn::new(format!("{}{sa}", c.name), c.kind));
                let b = schema
                    .iter()
                    .map(|c| FeatureColumn::new(format!("{}{sb}", c.name), c.kind));
                a.chain(b).collect()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pairing and the representation table
// ---------------------------------------------------------------------------

/// The two sides of one work item.
#[derive(Debug, Clone, Copy)]
pub enum Pairing<'g, 't> {
    Across(&'g RowGroup<'t>, &'g RowGroup<'t>),
    Within(&'g RowGroup<'t>),
}

/// One row per retained row pair, all sharing `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairTable {
    pub columns: Arc<[FeatureColumn]>,
    pub rows: Vec<Vec<FeatureValue>>,
}

impl PairTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Encode every retained row pair of `pairing`.
pub fn represent(pairing: Pairing<'_, '_>, repr: &Representation) -> Result<PairTable> {
    let (a, b, indices) = match pairing {
        Pairing::Across(a, b) => (a, b, PairIndices::across(a.len(), b.len())),
        Pairing::Within(g) => (g, g, PairIndices::within(g.len())),
    };

    if a.schema != b.schema {
        return Err(PairError::SchemaMismatch(format!(
            "cannot pair subject `{}` ({}) with subject `{}` ({})",
            a.subject,
            describe(&a.schema),
            b.subject,
            describe(&b.schema)
        )));
    }
    repr.check(&a.schema)?;

    let columns: Arc<[FeatureColumn]> = repr.output_columns(&a.schema).into();
    let mut rows = Vec::with_capacity(indices.len());
    for (i, j) in indices {
        let row = match repr.mode {
            PairMode::AbsDiff => abs_diff_row(&a.schema, &a.rows[i], &b.rows[j])?,
            PairMode::Concat => concat_row(&a.rows[i], &b.rows[j]),
        };
        rows.push(row);
    }

    Ok(PairTable { columns, rows })
}

fn abs_diff_row(
    schema: &[FeatureColumn],
    a: &[&FeatureValue],
    b: &[&FeatureValue],
) -> Result<Vec<FeatureValue>> {
    schema
        .iter()
        .zip(a.iter().zip(b.iter()))
        .map(|(col, (x, y))| match (x, y) {
            (FeatureValue::Numeric(x), FeatureValue::Numeric(y)) => {
                Ok(FeatureValue::Numeric((x - y).abs()))
            }
            _ => Err(PairError::SequenceInDiffMode {
                feature: col.name.clone(),
            }),
        })
        .collect()
}

fn concat_row(a: &[&FeatureValue], b: &[&FeatureValue]) -> Vec<FeatureValue> {
    a.iter().chain(b.iter()).map(|v| (*v).clone()).collect()
}

fn describe(schema: &[FeatureColumn]) -> String {
    schema
        .iter()
        .map(|c| format!("{}: {}", c.name, c.kind))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn schema(names: &[&str]) -> Arc<[FeatureColumn]> {
        names
            .iter()
            .map(|n| FeatureColumn::new(*n, FeatureKind::Numeric))
            .collect::<Vec<_>>()
            .into()
    }

    fn group<'t>(subject: &'t str, schema: &Arc<[FeatureColumn]>, cells: &'t [Vec<FeatureValue>]) -> RowGroup<'t> {
        RowGroup {
            subject,
            schema: Arc::clone(schema),
            rows: cells.iter().map(|r| r.iter().collect()).collect(),
        }
    }

    fn numeric_rows(values: &[&[f64]]) -> Vec<Vec<FeatureValue>> {
        values
            .iter()
            .map(|r| r.iter().map(|v| FeatureValue::Numeric(*v)).collect())
            .collect()
    }

    #[test]
    fn within_indices_are_strict_upper_triangle() {
        let pairs: Vec<_> = PairIndices::within(4).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);

        let unique: HashSet<_> = pairs.iter().map(|&(i, j)| (i.min(j), i.max(j))).collect();
        assert_eq!(unique.len(), pairs.len());
        assert!(pairs.iter().all(|&(i, j)| i < j));
    }

    #[test]
    fn across_indices_are_row_major() {
        let pairs: Vec<_> = PairIndices::across(2, 3).collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn index_counts_are_exact() {
        for n in 0..6 {
            let mut it = PairIndices::within(n);
            assert_eq!(it.len(), within_pair_count(n));
            it.next();
            assert_eq!(it.len(), within_pair_count(n).saturating_sub(1));
        }
        assert_eq!(PairIndices::across(3, 0).count(), 0);
        assert_eq!(PairIndices::across(0, 3).count(), 0);
        assert_eq!(PairIndices::across(3, 4).len(), 12);
    }

    #[test]
    fn abs_diff_across_groups() {
        let s = schema(&["h", "f"]);
        let a_cells = numeric_rows(&[&[1.0, 5.0], &[2.0, 7.0]]);
        let b_cells = numeric_rows(&[&[4.0, 1.0]]);
        let a = group("a", &s, &a_cells);
        let b = group("b", &s, &b_cells);

        let t = represent(Pairing::Across(&a, &b), &Representation::new(PairMode::AbsDiff)).unwrap();
        assert_eq!(t.columns.as_ref(), s.as_ref());
        assert_eq!(t.rows, numeric_rows(&[&[3.0, 4.0], &[2.0, 6.0]]));
    }

    #[test]
    fn abs_diff_within_group_drops_self_and_mirror_pairs() {
        let s = schema(&["h"]);
        let cells = numeric_rows(&[&[1.0], &[4.0], &[10.0]]);
        let g = group("a", &s, &cells);

        let t = represent(Pairing::Within(&g), &Representation::new(PairMode::AbsDiff)).unwrap();
        assert_eq!(t.rows, numeric_rows(&[&[3.0], &[9.0], &[6.0]]));
    }

    #[test]
    fn concat_within_group_orients_lower_index_first() {
        let s = schema(&["h"]);
        let cells = numeric_rows(&[&[1.0], &[4.0], &[10.0]]);
        let g = group("a", &s, &cells);

        let t = represent(Pairing::Within(&g), &Representation::new(PairMode::Concat)).unwrap();
        let names: Vec<_> = t.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["h_A", "h_B"]);
        assert_eq!(
            t.rows,
            numeric_rows(&[&[1.0, 4.0], &[1.0, 10.0], &[4.0, 10.0]])
        );
    }

    #[test]
    fn concat_copies_sequences_verbatim() {
        let s: Arc<[FeatureColumn]> = vec![FeatureColumn::new("sequence", FeatureKind::Sequence)].into();
        let a_cells = vec![vec![FeatureValue::Sequence(vec![0.0, 80.0])]];
        let b_cells = vec![vec![FeatureValue::Sequence(vec![0.0, 95.0, 170.0])]];
        let a = group("a", &s, &a_cells);
        let b = group("b", &s, &b_cells);

        let t = represent(Pairing::Across(&a, &b), &Representation::new(PairMode::Concat)).unwrap();
        assert_eq!(
            t.rows,
            vec![vec![
                FeatureValue::Sequence(vec![0.0, 80.0]),
                FeatureValue::Sequence(vec![0.0, 95.0, 170.0]),
            ]]
        );
    }

    #[test]
    fn diff_mode_rejects_sequences_before_work() {
        let s: Arc<[FeatureColumn]> = vec![FeatureColumn::new("sequence", FeatureKind::Sequence)].into();
        let cells = vec![vec![FeatureValue::Sequence(vec![0.0, 80.0])]];
        let g = group("a", &s, &cells);

        let err = represent(Pairing::Within(&g), &Representation::new(PairMode::AbsDiff)).unwrap_err();
        assert!(matches!(err, PairError::SequenceInDiffMode { ref feature } if feature == "sequence"));
    }

    #[test]
    fn mismatched_schemas_are_rejected() {
        let s1 = schema(&["h"]);
        let s2 = schema(&["f"]);
        let a_cells = numeric_rows(&[&[1.0]]);
        let b_cells = numeric_rows(&[&[2.0]]);
        let a = group("a", &s1, &a_cells);
        let b = group("b", &s2, &b_cells);

        let err = represent(Pairing::Across(&a, &b), &Representation::new(PairMode::Concat)).unwrap_err();
        assert!(matches!(err, PairError::SchemaMismatch(_)));
    }

    #[test]
    fn default_suffixes_match_config_default() {
        let repr = Representation::new(PairMode::Concat);
        assert_eq!(repr.suffixes, PairConfig::default().suffixes);
        assert_eq!(repr, Representation::from_config(&PairConfig::new(["h"], false)));
    }

    #[test]
    fn single_row_group_yields_nothing() {
        let s = schema(&["h"]);
        let cells = numeric_rows(&[&[1.0]]);
        let g = group("a", &s, &cells);

        let t = represent(Pairing::Within(&g), &Representation::new(PairMode::Concat)).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.columns.len(), 2);
    }
}
