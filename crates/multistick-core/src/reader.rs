use std::path::{Path, PathBuf};

use multistick_parser::{parse_multistick_file, ParsedLogFile};
use tracing::{info, warn};

use crate::assembly::assemble_dataset;
use crate::calibration::{
    apply_temperature_calibration_with, multistick_calibration, CalibrationTable,
};
use crate::config::MultistickConfig;
use crate::dataset::MultistickDataset;
use crate::error::{PipelineError, Result};

/// Reads every log matching `pattern` and returns the calibrated dataset, using
/// the default configuration and the deployed calibration table.
pub fn read_multistick_data(pattern: &str) -> Result<MultistickDataset> {
    read_multistick_data_with(pattern, &MultistickConfig::default(), multistick_calibration())
}

pub fn read_multistick_data_with(
    pattern: &str,
    config: &MultistickConfig,
    table: &CalibrationTable,
) -> Result<MultistickDataset> {
    let paths = discover_log_files(pattern)?;
    info!(pattern, files = paths.len(), "Reading multistick logs");

    let mut parsed = Vec::with_capacity(paths.len());
    for path in &paths {
        match read_log_file(path) {
            Ok(file) => parsed.push(file),
            Err(err) if config.reader.skip_invalid_files => {
                warn!(path = %path.display(), "Skipping log file: {err}");
            }
            Err(err) => return Err(err),
        }
    }

    let raw = assemble_dataset(&parsed, &config.reader)?;
    if !config.calibration.apply {
        info!("Calibration disabled; returning raw temperatures");
        return Ok(raw);
    }

    let options = config.calibration.options()?;
    let calibrated = apply_temperature_calibration_with(&raw, table, &options)?;
    Ok(calibrated)
}

/// Files matching `pattern`, sorted by path. Directories are ignored.
pub fn discover_log_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry?;
        if path.is_file() {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(PipelineError::NoFilesMatched {
            pattern: pattern.to_string(),
        });
    }
    paths.sort();
    Ok(paths)
}

pub fn read_log_file(path: &Path) -> Result<ParsedLogFile> {
    let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_multistick_file(&content).map_err(|source| PipelineError::Parser {
        path: path.to_path_buf(),
        source,
    })
}
