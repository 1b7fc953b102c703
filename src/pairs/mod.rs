//! Pair generation: partitioning, representation, and assembly.
//!
//! ```text
//!   FeatureTable
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ partition │  subject → RowGroup, PairPlan (negatives, positives)
//!   └───────────┘
//!        │  one WorkItem at a time
//!        ▼
//!   ┌───────────┐
//!   │ represent │  |a - b| or a ++ b over retained row pairs
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ assemble  │  label 0 / 1, concatenate → PairwiseDataset
//!   └───────────┘
//! ```

pub mod assemble;
pub mod partition;
pub mod represent;

/// Name of the trailing label column in every output schema.
pub const LABEL_COLUMN: &str = "label";

pub use assemble::{extract_pairs, LabeledChunk, PairGenerator, PairLabel, PairwiseDataset};
pub use partition::{PairPlan, Partition, RowGroup, WorkItem};
pub use represent::{represent, PairIndices, PairTable, Pairing, Representation};
