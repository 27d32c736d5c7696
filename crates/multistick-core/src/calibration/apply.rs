use tracing::debug;

use super::table::{CalibrationTable, DepthTolerance};
use crate::dataset::{
    Coordinates, DataVariable, MultistickDataset, APPLIED_OFFSET, RAW_TEMPERATURE, TEMPERATURE,
    UNITS_DEG_C,
};
use crate::error::{CalibrationError, CoordinateMismatch};

pub const CALIBRATION_DESCRIPTION: &str = "Subtracted T_diff(stick_num, z)";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationOptions {
    pub depth_tolerance: DepthTolerance,
}

/// Subtracts the per-(stick, depth) offsets of `table` from `T_deg`.
///
/// The result keeps the input's coordinates and adds `T_raw` (the untouched
/// readings) and `T_diff` (the offsets broadcast over time), so that
/// `T_deg == T_raw - T_diff` holds exactly for every cell. The input is never
/// modified.
///
/// Checks run in order and the first failure is returned:
/// 1. `T_deg` is present ([`CalibrationError::MissingField`]);
/// 2. the dataset is not already calibrated ([`CalibrationError::AlreadyCalibrated`]);
/// 3. every stick has a table row ([`CoordinateMismatch::StickNum`]);
/// 4. depths match the table within the default [`DepthTolerance`]
///    ([`CoordinateMismatch::Depth`]).
pub fn apply_temperature_calibration(
    ds: &MultistickDataset,
    table: &CalibrationTable,
) -> Result<MultistickDataset, CalibrationError> {
    apply_temperature_calibration_with(ds, table, &CalibrationOptions::default())
}

pub fn apply_temperature_calibration_with(
    ds: &MultistickDataset,
    table: &CalibrationTable,
    options: &CalibrationOptions,
) -> Result<MultistickDataset, CalibrationError> {
    let temperature = ds.get(TEMPERATURE).ok_or(CalibrationError::MissingField {
        field: TEMPERATURE,
    })?;
    ensure_not_calibrated(ds, temperature)?;
    check_sticks(ds.coords(), table)?;
    check_depths(ds.coords(), table, &options.depth_tolerance)?;

    let offsets = broadcast_offsets(table, ds.coords())?;
    let corrected: Vec<f64> = temperature
        .values()
        .iter()
        .zip(&offsets)
        .map(|(raw, offset)| raw - offset)
        .collect();

    let raw = temperature.clone().with_attr("units", UNITS_DEG_C);
    let applied = DataVariable::new(offsets).with_attr("units", UNITS_DEG_C);
    let calibrated_field = DataVariable::new(corrected)
        .with_attr("calibrated", true)
        .with_attr("calibration", CALIBRATION_DESCRIPTION)
        .with_attr("units", UNITS_DEG_C);

    let mut calibrated = ds.clone();
    calibrated.insert(RAW_TEMPERATURE, raw)?;
    calibrated.insert(APPLIED_OFFSET, applied)?;
    calibrated.insert(TEMPERATURE, calibrated_field)?;

    let [sticks, depths, timestamps] = calibrated.shape();
    debug!(sticks, depths, timestamps, "Applied temperature calibration");

    Ok(calibrated)
}

/// Expands the table's (stick, z) offsets to the dataset's (stick, z, datetime)
/// layout, repeating each offset for every timestamp.
///
/// Sticks are matched by identifier. Depths are matched by position, so callers
/// must have checked the depth coordinates against the table first (as
/// [`apply_temperature_calibration`] does); a depth count that differs from the
/// table is still reported as [`CoordinateMismatch::Depth`].
pub fn broadcast_offsets(
    table: &CalibrationTable,
    coords: &Coordinates,
) -> Result<Vec<f64>, CalibrationError> {
    if coords.z().len() != table.z().len() {
        return Err(depth_mismatch(coords, table));
    }

    let timestamps = coords.datetime().len();
    let mut offsets = Vec::with_capacity(coords.len());
    for stick in coords.stick_num() {
        let row = table.row(*stick).ok_or_else(|| CoordinateMismatch::StickNum {
            missing: vec![*stick],
        })?;
        for offset in row {
            offsets.extend(std::iter::repeat(*offset).take(timestamps));
        }
    }
    Ok(offsets)
}

fn ensure_not_calibrated(
    ds: &MultistickDataset,
    temperature: &DataVariable,
) -> Result<(), CalibrationError> {
    let flagged = temperature
        .attr("calibrated")
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    if flagged {
        return Err(CalibrationError::AlreadyCalibrated { field: TEMPERATURE });
    }
    for field in [RAW_TEMPERATURE, APPLIED_OFFSET] {
        if ds.contains(field) {
            return Err(CalibrationError::AlreadyCalibrated { field });
        }
    }
    Ok(())
}

fn check_sticks(coords: &Coordinates, table: &CalibrationTable) -> Result<(), CalibrationError> {
    let mut missing: Vec<_> = coords
        .stick_num()
        .iter()
        .copied()
        .filter(|stick| !table.contains_stick(*stick))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort_unstable();
    Err(CoordinateMismatch::StickNum { missing }.into())
}

fn check_depths(
    coords: &Coordinates,
    table: &CalibrationTable,
    tolerance: &DepthTolerance,
) -> Result<(), CalibrationError> {
    if tolerance.all_close(coords.z(), table.z()) {
        Ok(())
    } else {
        Err(depth_mismatch(coords, table))
    }
}

fn depth_mismatch(coords: &Coordinates, table: &CalibrationTable) -> CalibrationError {
    CoordinateMismatch::Depth {
        dataset: coords.z().to_vec(),
        table: table.z().to_vec(),
    }
    .into()
}
