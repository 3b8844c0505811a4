//! Error types for the screening engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("Unknown feature '{feature}' referenced by rule '{rule}'")]
    UnknownFeature { rule: String, feature: String },

    #[error("Rule '{rule}' needs feature '{feature}', which this dataset cannot provide")]
    FeatureUnavailable { rule: String, feature: String },

    #[error("Rule bank parse error: {0}")]
    RuleBankFormat(#[from] serde_json::Error),

    #[error("Feature table has {features} rows but dataset has {dataset}")]
    RowMismatch { features: usize, dataset: usize },
}

pub type EngineResult<T> = Result<T, EngineError>;
