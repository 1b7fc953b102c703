//! Arrow `RecordBatch` interop for feature tables and pair datasets.
//!
//! No file handling lives here: callers read and write batches with
//! whatever Arrow-speaking tool they already use (Parquet, IPC, Polars,
//! pandas via pyarrow, ...).

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float32Array, Float64Array, Float64Builder, Int32Array,
    Int64Array, Int8Array, LargeListArray, ListArray, ListBuilder,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::model::{FeatureKind, FeatureTable, FeatureValue, MetadataValue, Observation};
use crate::pairs::{PairwiseDataset, LABEL_COLUMN};

/// Default name of the subject identity column.
pub const SUBJECT_COLUMN: &str = "subject_id";

// ---------------------------------------------------------------------------
// RecordBatch → FeatureTable
// ---------------------------------------------------------------------------

/// How a non-subject column of a batch is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnRole {
    Feature(FeatureKind),
    Metadata,
}

impl FeatureTable {
    /// Build a feature table from one Arrow batch.
    ///
    /// Column mapping:
    /// - `subject_column`: Utf8 / LargeUtf8 / Dictionary of either, no nulls
    /// - columns named in `metadata_columns`: metadata of any scalar type
    /// - Float64 / Float32 / Int32 / Int64: numeric features
    /// - List / LargeList of Float64 or Float32: sequence features
    /// - any other Utf8 / LargeUtf8 / Boolean / string Dictionary column: metadata
    /// - anything else is ignored
    ///
    /// A feature column holding nulls does not fail the import. It is kept
    /// out of the table and reported only if a pass asks for it.
    pub fn from_record_batch(
        batch: &RecordBatch,
        subject_column: &str,
        metadata_columns: &[&str],
    ) -> Result<Self> {
        Self::from_record_batches(std::slice::from_ref(batch), subject_column, metadata_columns)
    }

    /// Build one feature table from several batches sharing a schema.
    pub fn from_record_batches(
        batches: &[RecordBatch],
        subject_column: &str,
        metadata_columns: &[&str],
    ) -> Result<Self> {
        let mut observations: Vec<Observation> = Vec::new();
        // feature name → why it cannot be paired on; first failure wins
        let mut unusable: BTreeMap<String, String> = BTreeMap::new();

        for (batch_no, batch) in batches.iter().enumerate() {
            let schema = batch.schema();
            let subject_idx = schema
                .index_of(subject_column)
                .map_err(|_| anyhow::anyhow!("batch {batch_no} has no '{subject_column}' column"))?;
            let subject_col = decode_dictionary(batch.column(subject_idx))
                .with_context(|| format!("batch {batch_no}: reading '{subject_column}'"))?;

            let first = observations.len();
            for row in 0..batch.num_rows() {
                let subject = extract_string(&subject_col, row)
                    .with_context(|| format!("batch {batch_no}, row {row}: reading '{subject_column}'"))?;
                observations.push(Observation::new(subject));
            }
            let rows = &mut observations[first..];

            for (col_idx, field) in schema.fields().iter().enumerate() {
                if col_idx == subject_idx {
                    continue;
                }
                let name = field.name();
                let Some(role) = column_role(name, field.data_type(), metadata_columns) else {
                    log::debug!(
                        "ignoring column '{name}' of unsupported type {:?}",
                        field.data_type()
                    );
                    continue;
                };
                let col = decode_dictionary(batch.column(col_idx))
                    .with_context(|| format!("batch {batch_no}: reading '{name}'"))?;

                match role {
                    ColumnRole::Metadata => {
                        for (row, obs) in rows.iter_mut().enumerate() {
                            let value = extract_metadata_value(&col, row)
                                .with_context(|| format!("batch {batch_no}, row {row}: metadata '{name}'"))?;
                            obs.metadata.insert(name.clone(), value);
                        }
                    }
                    ColumnRole::Feature(kind) => match read_feature_column(&col, kind) {
                        Ok(values) => {
                            for (obs, value) in rows.iter_mut().zip(values) {
                                obs.features.insert(name.clone(), value);
                            }
                        }
                        Err(err) => {
                            let reason = format!("batch {batch_no}, {err:#}");
                            log::debug!("feature '{name}' is unusable: {reason}");
                            unusable.entry(name.clone()).or_insert(reason);
                        }
                    },
                }
            }
        }

        // A column that failed in one batch may have been read from another.
        for obs in &mut observations {
            for name in unusable.keys() {
                obs.features.remove(name);
            }
        }

        log::debug!("read {} observations from {} batch(es)", observations.len(), batches.len());
        let table = FeatureTable::from_observations(observations).context("validating feature table")?;
        Ok(table.with_unusable_features(unusable))
    }
}

/// `None` for columns of a type this adapter does not read.
fn column_role(name: &str, data_type: &DataType, metadata_columns: &[&str]) -> Option<ColumnRole> {
    if metadata_columns.contains(&name) {
        return Some(ColumnRole::Metadata);
    }
    match data_type {
        DataType::Float64 | DataType::Float32 | DataType::Int32 | DataType::Int64 => {
            Some(ColumnRole::Feature(FeatureKind::Numeric))
        }
        DataType::List(_) | DataType::LargeList(_) => Some(ColumnRole::Feature(FeatureKind::Sequence)),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Boolean => Some(ColumnRole::Metadata),
        DataType::Dictionary(_, value) if is_string(value) => Some(ColumnRole::Metadata),
        _ => None,
    }
}

fn is_string(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8)
}

/// Decode a dictionary-encoded (categorical) string column to plain strings.
fn decode_dictionary(col: &ArrayRef) -> Result<ArrayRef> {
    match col.data_type() {
        DataType::Dictionary(_, value) if is_string(value) => {
            cast(col.as_ref(), value.as_ref()).context("decoding dictionary column")
        }
        _ => Ok(Arc::clone(col)),
    }
}

fn read_feature_column(col: &ArrayRef, kind: FeatureKind) -> Result<Vec<FeatureValue>> {
    (0..col.len())
        .map(|row| {
            let value = match kind {
                FeatureKind::Numeric => extract_f64(col, row).map(FeatureValue::Numeric),
                FeatureKind::Sequence => extract_f64_list(col, row).map(FeatureValue::Sequence),
            };
            value.with_context(|| format!("row {row}"))
        })
        .collect()
}

// -- Arrow helpers --

fn extract_string(col: &ArrayRef, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null subject id");
    }
    match col.data_type() {
        DataType::Utf8 => Ok(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("expected a string or string dictionary column, got {other:?}"),
    }
}

fn extract_f64(col: &ArrayRef, row: usize) -> Result<f64> {
    if col.is_null(row) {
        bail!("null value in numeric feature column");
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Float64 => Ok(any.downcast_ref::<Float64Array>().context("expected Float64Array")?.value(row)),
        DataType::Float32 => Ok(any.downcast_ref::<Float32Array>().context("expected Float32Array")?.value(row) as f64),
        DataType::Int32 => Ok(any.downcast_ref::<Int32Array>().context("expected Int32Array")?.value(row) as f64),
        DataType::Int64 => Ok(any.downcast_ref::<Int64Array>().context("expected Int64Array")?.value(row) as f64),
        other => bail!("expected a numeric column, got {other:?}"),
    }
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in sequence feature column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    if let Some(i) = (0..values_array.len()).find(|&i| values_array.is_null(i)) {
        bail!("element {i} of the sequence is null");
    }

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.values().to_vec())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.values().iter().map(|&v| v as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a single metadata value from an Arrow column at a given row.
fn extract_metadata_value(col: &ArrayRef, row: usize) -> Result<MetadataValue> {
    if col.is_null(row) {
        return Ok(MetadataValue::Null);
    }
    let any = col.as_any();
    Ok(match col.data_type() {
        DataType::Utf8 => MetadataValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => MetadataValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => {
            let arr = any.downcast_ref::<Int32Array>().context("expected Int32Array")?;
            MetadataValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = any.downcast_ref::<Int64Array>().context("expected Int64Array")?;
            MetadataValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = any.downcast_ref::<Float32Array>().context("expected Float32Array")?;
            MetadataValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = any.downcast_ref::<Float64Array>().context("expected Float64Array")?;
            MetadataValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = any.downcast_ref::<BooleanArray>().context("expected BooleanArray")?;
            MetadataValue::Bool(arr.value(row))
        }
        other => bail!("unsupported metadata type {other:?}"),
    })
}

// ---------------------------------------------------------------------------
// PairwiseDataset → RecordBatch
// ---------------------------------------------------------------------------

impl PairwiseDataset {
    /// Convert to an Arrow batch: Float64 for numeric features,
    /// List<Float64> for sequence features, and an Int8 `label` column last.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.n_columns());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.n_columns());

        for (c, column) in self.columns().iter().enumerate() {
            match column.kind {
                FeatureKind::Numeric => {
                    let values = self
                        .rows()
                        .iter()
                        .enumerate()
                        .map(|(r, row)| {
                            row.get(c)
                                .and_then(FeatureValue::as_f64)
                                .with_context(|| format!("row {r}: '{}' is not numeric", column.name))
                        })
                        .collect::<Result<Vec<f64>>>()?;
                    fields.push(Field::new(column.name.as_str(), DataType::Float64, false));
                    arrays.push(Arc::new(Float64Array::from(values)));
                }
                FeatureKind::Sequence => {
                    let mut builder = ListBuilder::new(Float64Builder::new());
                    for (r, row) in self.rows().iter().enumerate() {
                        let seq = row
                            .get(c)
                            .and_then(FeatureValue::as_sequence)
                            .with_context(|| format!("row {r}: '{}' is not a sequence", column.name))?;
                        builder.values().append_slice(seq);
                        builder.append(true);
                    }
                    fields.push(Field::new(
                        column.name.as_str(),
                        DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                        false,
                    ));
                    arrays.push(Arc::new(builder.finish()));
                }
            }
        }

        let labels: Vec<i8> = self.labels().iter().map(|l| l.as_u8() as i8).collect();
        fields.push(Field::new(LABEL_COLUMN, DataType::Int8, false));
        arrays.push(Arc::new(Int8Array::from(labels)));

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .context("assembling pair dataset record batch")
    }
}
