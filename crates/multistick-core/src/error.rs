// crates/multistick-core/src/error.rs

use std::path::PathBuf;

use multistick_parser::ParserError;
use thiserror::Error;

use crate::dataset::{DatasetError, StickId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateMismatch {
    #[error("stick_num mismatch between data and calibration: no calibration entry for sticks {missing:?}")]
    StickNum { missing: Vec<StickId> },

    #[error("z-coordinates do not match calibration table: dataset {dataset:?}, table {table:?}")]
    Depth { dataset: Vec<f64>, table: Vec<f64> },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("dataset does not contain required field '{field}'")]
    MissingField { field: &'static str },

    #[error(transparent)]
    CoordinateMismatch(#[from] CoordinateMismatch),

    #[error("dataset already carries calibration output ('{field}'); refusing to apply offsets twice")]
    AlreadyCalibrated { field: &'static str },

    #[error("invalid calibration table: {0}")]
    InvalidTable(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Could not read path from glob pattern: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("No log files matched pattern '{pattern}'")]
    NoFilesMatched { pattern: String },

    #[error("Failed to parse {path}: {source}")]
    Parser {
        path: PathBuf,
        #[source]
        source: ParserError,
    },

    #[error("Calibration failed: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
