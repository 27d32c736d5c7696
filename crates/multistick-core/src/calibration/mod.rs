mod apply;
mod table;

pub use apply::{
    apply_temperature_calibration, apply_temperature_calibration_with, broadcast_offsets,
    CalibrationOptions, CALIBRATION_DESCRIPTION,
};
pub use table::{multistick_calibration, CalibrationTable, DepthTolerance};
