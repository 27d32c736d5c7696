use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use multistick_parser::ParsedLogFile;
use tracing::debug;

use crate::config::ReaderConfig;
use crate::dataset::{
    Coordinates, DataVariable, MultistickDataset, StickId, TEMPERATURE, UNITS_DEG_C,
};
use crate::error::{PipelineError, Result};

/// Pivots parsed readings onto a (stick_num, z, datetime) grid.
///
/// The stick and datetime axes are the sorted union over all files. Cells that
/// no file reports, and readings the logger marked missing, are `NaN`. A
/// (stick, datetime) pair logged twice with identical values is kept once; any
/// disagreement is a validation error.
pub fn assemble_dataset(files: &[ParsedLogFile], config: &ReaderConfig) -> Result<MultistickDataset> {
    let Some(first) = files.iter().find(|file| !file.readings.is_empty()) else {
        return Err(PipelineError::Validation(
            "no readings to assemble".to_string(),
        ));
    };
    let depth_count = first.depth_count;
    if let Some(other) = files.iter().find(|file| file.depth_count != depth_count) {
        return Err(PipelineError::Validation(format!(
            "log files disagree on depth count: {depth_count} vs {} (file {})",
            other.depth_count, other.file_hash
        )));
    }

    let sticks: Vec<StickId> = files
        .iter()
        .flat_map(|file| file.readings.iter().map(|r| r.stick))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let timestamps: Vec<NaiveDateTime> = files
        .iter()
        .flat_map(|file| file.readings.iter().map(|r| r.timestamp))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let coords = Coordinates::new(sticks, config.depths(depth_count)?, timestamps)?;
    let mut values = vec![f64::NAN; coords.len()];
    let mut filled = vec![false; coords.len()];

    for file in files {
        for reading in &file.readings {
            let (Ok(stick_idx), Ok(time_idx)) = (
                coords.stick_num().binary_search(&reading.stick),
                coords.datetime().binary_search(&reading.timestamp),
            ) else {
                continue;
            };
            if reading.temperatures.len() != depth_count {
                return Err(PipelineError::Validation(format!(
                    "stick {} at {} (line {}) carries {} readings, expected {depth_count} (file {})",
                    reading.stick,
                    reading.timestamp,
                    reading.line_index,
                    reading.temperatures.len(),
                    file.file_hash
                )));
            }

            for (z_idx, temperature) in reading.temperatures.iter().enumerate() {
                let idx = coords.flat_index(stick_idx, z_idx, time_idx);
                let value = temperature.unwrap_or(f64::NAN);
                if filled[idx] {
                    if !same_reading(values[idx], value) {
                        return Err(PipelineError::Validation(format!(
                            "conflicting readings for stick {} at {} (depth index {z_idx}, line {}): {} vs {}",
                            reading.stick, reading.timestamp, reading.line_index, values[idx], value
                        )));
                    }
                    continue;
                }
                values[idx] = value;
                filled[idx] = true;
            }
        }
    }

    let [stick_count, depth_count, time_count] = coords.shape();
    debug!(
        sticks = stick_count,
        depths = depth_count,
        timestamps = time_count,
        "Assembled multistick dataset"
    );

    let mut ds = MultistickDataset::new(coords).with_variable(
        TEMPERATURE,
        DataVariable::new(values).with_attr("units", UNITS_DEG_C),
    )?;
    ds.attrs_mut()
        .insert("source_files".to_string(), (files.len() as i64).into());
    Ok(ds)
}

fn same_reading(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}
