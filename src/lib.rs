//! # typing-pairs
//!
//! Turns a table of per-subject feature observations (keystroke timings,
//! typically) into a labeled pairwise dataset for training a
//! same/different-subject classifier.
//!
//! Each pair of rows becomes one output row, labeled `1` when both rows
//! come from the same subject and `0` otherwise. A pair is encoded either
//! as the elementwise absolute difference of the two feature vectors, or as
//! both vectors side by side under `_A` / `_B` suffixed column names.
//!
//! ```rust
//! use typing_pairs::{extract_pairs, FeatureTable, Observation, PairConfig, PairLabel};
//!
//! # fn main() -> typing_pairs::Result<()> {
//! let table = FeatureTable::from_observations(vec![
//!     Observation::new("ada").with_numeric("hold", 92.0),
//!     Observation::new("ada").with_numeric("hold", 88.0),
//!     Observation::new("bob").with_numeric("hold", 120.0),
//! ])?;
//!
//! let pairs = extract_pairs(&table, &PairConfig::new(["hold"], true))?;
//! assert_eq!(pairs.count(PairLabel::Different), 2);
//! assert_eq!(pairs.count(PairLabel::Same), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod pairs;

pub use config::{PairConfig, PairMode, SubjectOrder};
pub use data::columnar::SUBJECT_COLUMN;
pub use data::filter::{filter_table, filtered_indices, only, FilterState};
pub use data::model::{FeatureColumn, FeatureKind, FeatureTable, FeatureValue, MetadataValue, Observation};
pub use error::{ErrorKind, PairError, Result};
pub use pairs::{
    extract_pairs, LabeledChunk, PairGenerator, PairLabel, PairPlan, PairTable, PairwiseDataset,
    LABEL_COLUMN,
};
