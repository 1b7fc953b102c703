use std::collections::{BTreeMap, BTreeSet};

use super::model::{FeatureTable, MetadataValue};

// ---------------------------------------------------------------------------
// Filter predicate: which unique values are selected per metadata column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of accepted values.
/// A column absent from the map places no constraint on rows.
pub type FilterState = BTreeMap<String, BTreeSet<MetadataValue>>;

/// A filter accepting only rows whose `column` equals `value`.
pub fn only(column: &str, value: impl Into<MetadataValue>) -> FilterState {
    let mut state = FilterState::new();
    state
        .entry(column.to_string())
        .or_default()
        .insert(value.into());
    state
}

/// Return indices of observations that pass all filters.
///
/// An observation passes a column filter when:
/// * The column is not present in `filters` → passes (no constraint)
/// * The filter set for that column is empty → nothing selected → fails
/// * The observation's value for that column is in the selected set → passes
/// * The observation lacks the column → passes only if `Null` is selected
pub fn filtered_indices(table: &FeatureTable, filters: &FilterState) -> Vec<usize> {
    table
        .observations()
        .iter()
        .enumerate()
        .filter(|(_, obs)| {
            filters.iter().all(|(col, selected)| {
                if selected.is_empty() {
                    return false;
                }
                if let Some(all_vals) = table.unique_values(col) {
                    // Every value present in the table is selected and rows
                    // missing the column would have surfaced as Null.
                    if selected.is_superset(all_vals) && selected.contains(&MetadataValue::Null) {
                        return true;
                    }
                }
                match obs.metadata.get(col) {
                    Some(val) => selected.contains(val),
                    None => selected.contains(&MetadataValue::Null),
                }
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// A new table with only the observations passing `filters`.
///
/// This is how registration-only data is carved out before pairing:
/// `filter_table(&table, &only("registration", 1))`.
pub fn filter_table(table: &FeatureTable, filters: &FilterState) -> FeatureTable {
    let indices = filtered_indices(table, filters);
    log::debug!(
        "metadata filter kept {} of {} observations",
        indices.len(),
        table.len()
    );
    table.select_rows(&indices)
}
