//! Labeled (stick_num, z, datetime) temperature dataset.
//!
//! Every data variable spans all three axes and is stored row-major: the
//! datetime axis varies fastest, then depth, then stick.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

pub use multistick_parser::StickId;

pub const TEMPERATURE: &str = "T_deg";
pub const RAW_TEMPERATURE: &str = "T_raw";
pub const APPLIED_OFFSET: &str = "T_diff";

pub const STICK_COORD: &str = "stick_num";
pub const DEPTH_COORD: &str = "z";
pub const TIME_COORD: &str = "datetime";

pub const UNITS_DEG_C: &str = "degC";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("coordinate '{coord}' is invalid: {message}")]
    InvalidCoordinate { coord: &'static str, message: String },

    #[error("variable '{name}' has {found} values, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(value) => write!(f, "{value}"),
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Float(value) => write!(f, "{value}"),
            AttrValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    stick_num: Vec<StickId>,
    z: Vec<f64>,
    datetime: Vec<NaiveDateTime>,
}

impl Coordinates {
    /// Stick identifiers must be unique; depths finite and strictly increasing;
    /// timestamps strictly increasing.
    pub fn new(
        stick_num: Vec<StickId>,
        z: Vec<f64>,
        datetime: Vec<NaiveDateTime>,
    ) -> Result<Self, DatasetError> {
        let mut seen = stick_num.clone();
        seen.sort_unstable();
        if let Some(pair) = seen.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(DatasetError::InvalidCoordinate {
                coord: STICK_COORD,
                message: format!("stick {} appears more than once", pair[0]),
            });
        }

        if let Some(bad) = z.iter().find(|value| !value.is_finite()) {
            return Err(DatasetError::InvalidCoordinate {
                coord: DEPTH_COORD,
                message: format!("depth {bad} is not finite"),
            });
        }
        if let Some(pair) = z.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(DatasetError::InvalidCoordinate {
                coord: DEPTH_COORD,
                message: format!("depths must increase, found {} then {}", pair[0], pair[1]),
            });
        }

        if let Some(pair) = datetime.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(DatasetError::InvalidCoordinate {
                coord: TIME_COORD,
                message: format!("timestamps must increase, found {} then {}", pair[0], pair[1]),
            });
        }

        Ok(Self {
            stick_num,
            z,
            datetime,
        })
    }

    pub fn stick_num(&self) -> &[StickId] {
        &self.stick_num
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn datetime(&self) -> &[NaiveDateTime] {
        &self.datetime
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.stick_num.len(), self.z.len(), self.datetime.len()]
    }

    pub fn len(&self) -> usize {
        self.stick_num.len() * self.z.len() * self.datetime.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stick_index(&self, stick: StickId) -> Option<usize> {
        self.stick_num.iter().position(|id| *id == stick)
    }

    pub fn flat_index(&self, stick_idx: usize, z_idx: usize, time_idx: usize) -> usize {
        (stick_idx * self.z.len() + z_idx) * self.datetime.len() + time_idx
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    values: Vec<f64>,
    attrs: Attrs,
}

impl DataVariable {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultistickDataset {
    coords: Coordinates,
    data_vars: BTreeMap<String, DataVariable>,
    attrs: Attrs,
}

impl MultistickDataset {
    pub fn new(coords: Coordinates) -> Self {
        Self {
            coords,
            data_vars: BTreeMap::new(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        variable: DataVariable,
    ) -> Result<Self, DatasetError> {
        self.insert(name, variable)?;
        Ok(self)
    }

    /// Adds or replaces a variable, returning the one it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        variable: DataVariable,
    ) -> Result<Option<DataVariable>, DatasetError> {
        let name = name.into();
        let expected = self.coords.len();
        if variable.values.len() != expected {
            return Err(DatasetError::ShapeMismatch {
                name,
                expected,
                found: variable.values.len(),
            });
        }
        Ok(self.data_vars.insert(name, variable))
    }

    pub fn get(&self, name: &str) -> Option<&DataVariable> {
        self.data_vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataVariable> {
        self.data_vars.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data_vars.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &DataVariable)> {
        self.data_vars
            .iter()
            .map(|(name, variable)| (name.as_str(), variable))
    }

    pub fn coords(&self) -> &Coordinates {
        &self.coords
    }

    pub fn shape(&self) -> [usize; 3] {
        self.coords.shape()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    /// Value of `name` at a stick identifier and depth/time positions.
    pub fn value(&self, name: &str, stick: StickId, z_idx: usize, time_idx: usize) -> Option<f64> {
        let [_, depths, times] = self.shape();
        if z_idx >= depths || time_idx >= times {
            return None;
        }
        let stick_idx = self.coords.stick_index(stick)?;
        let variable = self.get(name)?;
        variable
            .values
            .get(self.coords.flat_index(stick_idx, z_idx, time_idx))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn flat_index_is_row_major_with_time_fastest() {
        let coords = Coordinates::new(vec![3, 5], vec![0.0, 0.02, 0.04], vec![ts(0), ts(1)]).unwrap();
        assert_eq!(coords.shape(), [2, 3, 2]);
        assert_eq!(coords.flat_index(0, 0, 1), 1);
        assert_eq!(coords.flat_index(0, 1, 0), 2);
        assert_eq!(coords.flat_index(1, 0, 0), 6);
        assert_eq!(coords.flat_index(1, 2, 1), 11);
    }

    #[test]
    fn coordinates_reject_duplicates_and_disorder() {
        assert!(matches!(
            Coordinates::new(vec![1, 1], vec![0.0], vec![ts(0)]),
            Err(DatasetError::InvalidCoordinate { coord: "stick_num", .. })
        ));
        assert!(matches!(
            Coordinates::new(vec![1], vec![0.02, 0.0], vec![ts(0)]),
            Err(DatasetError::InvalidCoordinate { coord: "z", .. })
        ));
        assert!(matches!(
            Coordinates::new(vec![1], vec![f64::NAN], vec![ts(0)]),
            Err(DatasetError::InvalidCoordinate { coord: "z", .. })
        ));
        assert!(matches!(
            Coordinates::new(vec![1], vec![0.0], vec![ts(1), ts(1)]),
            Err(DatasetError::InvalidCoordinate { coord: "datetime", .. })
        ));
    }

    #[test]
    fn insert_checks_shape() {
        let coords = Coordinates::new(vec![0, 1], vec![0.0], vec![ts(0)]).unwrap();
        let mut ds = MultistickDataset::new(coords);
        let err = ds.insert(TEMPERATURE, DataVariable::new(vec![1.0])).unwrap_err();
        assert_eq!(
            err,
            DatasetError::ShapeMismatch {
                name: TEMPERATURE.to_string(),
                expected: 2,
                found: 1,
            }
        );
        assert!(ds.insert(TEMPERATURE, DataVariable::new(vec![1.0, 2.0])).unwrap().is_none());
        assert_eq!(ds.value(TEMPERATURE, 1, 0, 0), Some(2.0));
        assert_eq!(ds.value(TEMPERATURE, 9, 0, 0), None);
        assert_eq!(ds.value(TEMPERATURE, 1, 1, 0), None);
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let coords = Coordinates::new(vec![0], vec![0.0], vec![ts(0)]).unwrap();
        let original = MultistickDataset::new(coords)
            .with_variable(TEMPERATURE, DataVariable::new(vec![4.0]))
            .unwrap();
        let mut copy = original.clone();
        copy.get_mut(TEMPERATURE).unwrap().values_mut()[0] = -1.0;
        assert_eq!(original.value(TEMPERATURE, 0, 0, 0), Some(4.0));
    }
}
