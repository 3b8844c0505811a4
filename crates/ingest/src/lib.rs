//! Loading layer for the odds screener
//!
//! Reads match tables from CSV or spreadsheet files, negotiates the dataset
//! schema from the header row, filters leagues, and loads rule banks and
//! run configuration from JSON.

pub mod csv_source;
pub mod leagues;
pub mod table;
pub mod xlsx_source;

use std::path::Path;

use engine::{FeatureCatalog, MatchDataset, RuleBank, ScreenerConfig};
use thiserror::Error;
use tracing::info;

pub use leagues::{LeagueAllowList, LeagueFilterOutcome};
pub use table::RawTable;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file format: {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not detect the CSV delimiter (tried ',' and ';')")]
    Delimiter,

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("File has no header row: {0}")]
    Empty(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] engine::EngineError),
}

pub type IngestResult<T> = Result<T, IngestError>;

pub(crate) fn read_to_string(path: &Path) -> IngestResult<String> {
    std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Load a match dataset, choosing the reader by file extension
pub fn load_dataset(path: impl AsRef<Path>) -> IngestResult<MatchDataset> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" => csv_source::read_csv(path)?,
        "xlsx" | "xlsm" | "xls" | "ods" => xlsx_source::read_workbook(path)?,
        _ => return Err(IngestError::UnsupportedFormat(path.display().to_string())),
    };

    let dataset = table.into_dataset()?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        odds_columns = dataset.schema.odds.len(),
        league = dataset.schema.has_league,
        results = dataset.schema.has_results,
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Load and validate a JSON rule bank
pub fn load_rule_bank(path: impl AsRef<Path>, catalog: &FeatureCatalog) -> IngestResult<RuleBank> {
    let path = path.as_ref();
    let json = read_to_string(path)?;
    let bank = RuleBank::from_json(&json, catalog)?;
    info!(path = %path.display(), rules = bank.len(), "Loaded rule bank");
    Ok(bank)
}

/// Load a JSON run configuration; absent fields keep their defaults
pub fn load_config(path: impl AsRef<Path>) -> IngestResult<ScreenerConfig> {
    let json = read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&json)?)
}
