//! Arrow round trip: RecordBatch in, pairwise RecordBatch out.

use std::sync::Arc;

use arrow::array::{Array, AsArray, Float64Array, Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Int8Type, Schema};
use arrow::record_batch::RecordBatch;
use pretty_assertions::assert_eq;
use typing_pairs::{
    extract_pairs, filter_table, only, FeatureTable, PairConfig, SUBJECT_COLUMN,
};

fn registration_batch() -> RecordBatch {
    let sequences: [&[f64]; 4] = [
        &[0.0, 95.0, 180.0, 260.0],
        &[0.0, 90.0, 170.0, 255.0],
        &[0.0, 140.0],
        &[0.0, 60.0, 130.0, 200.0],
    ];
    let mut seq = ListBuilder::new(Float64Builder::new());
    for s in sequences {
        seq.values().append_slice(s);
        seq.append(true);
    }

    let schema = Schema::new(vec![
        Field::new(SUBJECT_COLUMN, DataType::Utf8, false),
        Field::new("hold_1", DataType::Float64, false),
        Field::new("flight_1", DataType::Float64, false),
        Field::new(
            "sequence",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("registration", DataType::Int64, false),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(vec!["s002", "s002", "s002", "s007"])),
            Arc::new(Float64Array::from(vec![95.0, 90.0, 140.0, 60.0])),
            Arc::new(Float64Array::from(vec![85.0, 80.0, 0.0, 70.0])),
            Arc::new(seq.finish()),
            Arc::new(Int64Array::from(vec![1, 1, 0, 1])),
        ],
    )
    .unwrap()
}

// ============================================================================
// 1. Diff mode batch
// ============================================================================

#[test]
fn test_diff_dataset_to_record_batch() {
    let table = FeatureTable::from_record_batch(&registration_batch(), SUBJECT_COLUMN, &["registration"]).unwrap();
    let table = filter_table(&table, &only("registration", 1));
    let ds = extract_pairs(&table, &PairConfig::new(["hold_1", "flight_1"], true)).unwrap();
    let batch = ds.to_record_batch().unwrap();

    let names: Vec<String> = batch.schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["hold_1", "flight_1", "label"]);
    assert_eq!(batch.num_rows(), 3);

    let hold = batch.column(0).as_primitive::<arrow::datatypes::Float64Type>();
    assert_eq!(hold.values().to_vec(), vec![35.0, 30.0, 5.0]);
    let label = batch.column(2).as_primitive::<Int8Type>();
    assert_eq!(label.values().to_vec(), vec![0, 0, 1]);
}

// ============================================================================
// 2. Concat mode keeps sequence lists
// ============================================================================

#[test]
fn test_concat_dataset_keeps_sequence_lists() {
    let table = FeatureTable::from_record_batch(&registration_batch(), SUBJECT_COLUMN, &["registration"]).unwrap();
    let table = filter_table(&table, &only("registration", 1));
    let ds = extract_pairs(&table, &PairConfig::new(["sequence"], false)).unwrap();
    let batch = ds.to_record_batch().unwrap();

    let schema = batch.schema();
    assert_eq!(schema.field(0).name(), "sequence_A");
    assert_eq!(schema.field(1).name(), "sequence_B");
    assert!(matches!(schema.field(0).data_type(), DataType::List(_)));

    // Positive pair (row 2): the two s002 registration sequences.
    let b = batch.column(1).as_list::<i32>();
    let last = b.value(2);
    let last = last.as_primitive::<arrow::datatypes::Float64Type>();
    assert_eq!(last.len(), 4);
    assert_eq!(last.value(1), 90.0);
}

// ============================================================================
// 3. Diff mode still rejects sequences read from Arrow
// ============================================================================

#[test]
fn test_sequence_from_arrow_rejected_in_diff_mode() {
    let table = FeatureTable::from_record_batch(&registration_batch(), SUBJECT_COLUMN, &["registration"]).unwrap();
    let err = extract_pairs(&table, &PairConfig::new(["sequence"], true)).unwrap_err();
    assert!(err.to_string().contains("sequence"));
}
