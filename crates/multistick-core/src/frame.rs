use polars::prelude::*;
use serde_json::{json, Map, Value};

use crate::dataset::{MultistickDataset, DEPTH_COORD, STICK_COORD, TIME_COORD};

/// Flattens the dataset to one row per (stick, depth, timestamp) cell, in the
/// dataset's row-major order, with one `f64` column per variable.
pub fn to_dataframe(ds: &MultistickDataset) -> PolarsResult<DataFrame> {
    let coords = ds.coords();
    let len = coords.len();

    let mut stick_col = Vec::with_capacity(len);
    let mut depth_col = Vec::with_capacity(len);
    let mut time_col = Vec::with_capacity(len);
    for stick in coords.stick_num() {
        for depth in coords.z() {
            for timestamp in coords.datetime() {
                stick_col.push(*stick);
                depth_col.push(*depth);
                time_col.push(timestamp.and_utc().timestamp_micros());
            }
        }
    }

    let time_series = Series::new(TIME_COORD.into(), time_col)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

    let mut columns: Vec<Column> = vec![
        Series::new(STICK_COORD.into(), stick_col).into(),
        Series::new(DEPTH_COORD.into(), depth_col).into(),
        time_series.into(),
    ];
    for (name, variable) in ds.variables() {
        columns.push(Series::new(name.into(), variable.values()).into());
    }

    DataFrame::new(columns)
}

/// Dataset and per-variable attributes, for writing next to exported tables.
pub fn attrs_json(ds: &MultistickDataset) -> Value {
    let variables: Map<String, Value> = ds
        .variables()
        .map(|(name, variable)| (name.to_string(), json!(variable.attrs())))
        .collect();
    json!({
        "attrs": ds.attrs(),
        "variables": variables,
    })
}
