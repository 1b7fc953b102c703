//! Error type for pair generation.
//!
//! Every failure is fatal for the whole pass: no partial dataset is ever
//! returned alongside an error.

use thiserror::Error;

/// Broad class of a [`PairError`], used by callers that only need to know
/// whether the configuration, the input table, or a resource bound is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Schema,
    ResourceLimit,
}

/// Errors raised while validating configuration or generating pairs.
#[derive(Debug, Error)]
pub enum PairError {
    #[error(
        "`only_feature_diffs` is set but feature `{feature}` holds variable-length sequences; \
         absolute differences need fixed-width numeric features"
    )]
    SequenceInDiffMode { feature: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("feature `{0}` is not a feature column of the table")]
    MissingFeature(String),

    #[error("feature `{feature}` cannot be paired on: {reason}")]
    UnusableFeature { feature: String, reason: String },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("row {row}: {reason}")]
    RaggedRow { row: usize, reason: String },

    #[error("pair plan needs {planned} rows, above the configured limit of {limit}")]
    RowLimitExceeded { planned: usize, limit: usize },
}

impl PairError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PairError::SequenceInDiffMode { .. } | PairError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            PairError::MissingFeature(_)
            | PairError::UnusableFeature { .. }
            | PairError::SchemaMismatch(_)
            | PairError::RaggedRow { .. } => ErrorKind::Schema,
            PairError::RowLimitExceeded { .. } => ErrorKind::ResourceLimit,
        }
    }
}

pub type Result<T> = std::result::Result<T, PairError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_offending_feature() {
        let err = PairError::SequenceInDiffMode {
            feature: "sequence".into(),
        };
        assert!(err.to_string().contains("`sequence`"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(PairError::MissingFeature("h".into()).kind(), ErrorKind::Schema);
        let err = PairError::UnusableFeature {
            feature: "hold".into(),
            reason: "batch 0, row 1: null value in numeric feature column".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.to_string().contains("`hold`"));
        assert_eq!(
            PairError::RowLimitExceeded { planned: 10, limit: 5 }.kind(),
            ErrorKind::ResourceLimit
        );
    }
}
