pub mod assembly;
pub mod calibration;
pub mod config;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod reader;

pub use calibration::{
    apply_temperature_calibration, multistick_calibration, CalibrationTable, DepthTolerance,
};
pub use dataset::{Coordinates, DataVariable, MultistickDataset};
pub use error::{CalibrationError, CoordinateMismatch, PipelineError, Result};
pub use reader::{read_multistick_data, read_multistick_data_with};
