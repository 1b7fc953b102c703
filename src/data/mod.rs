//! Data layer: feature table types, Arrow interop, and row selection.
//!
//! Architecture:
//! ```text
//!   Arrow RecordBatch / Vec<Observation>
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ columnar │  batch → FeatureTable (and PairwiseDataset → batch)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ FeatureTable │  Vec<Observation>, feature schema, metadata index
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter  │  metadata predicates → selected rows (e.g. registration only)
//!   └──────────┘
//! ```

pub mod columnar;
pub mod filter;
pub mod model;
