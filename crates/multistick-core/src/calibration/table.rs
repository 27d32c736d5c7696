use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::dataset::StickId;
use crate::error::CalibrationError;

/// Closeness test used when cross-checking depth coordinates, with numpy
/// `allclose` semantics: `|value - reference| <= atol + rtol * |reference|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthTolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl DepthTolerance {
    pub const DEFAULT_RTOL: f64 = 1e-5;
    pub const DEFAULT_ATOL: f64 = 1e-8;

    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }

    pub fn is_close(&self, value: f64, reference: f64) -> bool {
        (value - reference).abs() <= self.atol + self.rtol * reference.abs()
    }

    /// Sequences of different length never match.
    pub fn all_close(&self, values: &[f64], reference: &[f64]) -> bool {
        values.len() == reference.len()
            && values
                .iter()
                .zip(reference)
                .all(|(value, reference)| self.is_close(*value, *reference))
    }
}

impl Default for DepthTolerance {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RTOL, Self::DEFAULT_ATOL)
    }
}

/// Per-(stick, depth) temperature offsets in degC. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    stick_num: Vec<StickId>,
    z: Vec<f64>,
    offsets: Vec<f64>,
}

impl CalibrationTable {
    /// `rows[i]` holds the offsets of `stick_num[i]`, one per entry of `z`.
    pub fn new(
        stick_num: Vec<StickId>,
        z: Vec<f64>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, CalibrationError> {
        if rows.len() != stick_num.len() {
            return Err(CalibrationError::InvalidTable(format!(
                "{} rows for {} sticks",
                rows.len(),
                stick_num.len()
            )));
        }

        let mut sorted = stick_num.clone();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CalibrationError::InvalidTable(format!(
                "stick {} listed more than once",
                pair[0]
            )));
        }

        if z.is_empty() {
            return Err(CalibrationError::InvalidTable(
                "table needs at least one depth".to_string(),
            ));
        }
        if z.iter().any(|depth| !depth.is_finite()) || z.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(CalibrationError::InvalidTable(format!(
                "depths must be finite and strictly increasing, got {z:?}"
            )));
        }

        let mut offsets = Vec::with_capacity(stick_num.len() * z.len());
        for (stick, row) in stick_num.iter().zip(&rows) {
            if row.len() != z.len() {
                return Err(CalibrationError::InvalidTable(format!(
                    "stick {stick} has {} offsets for {} depths",
                    row.len(),
                    z.len()
                )));
            }
            if let Some(bad) = row.iter().find(|value| !value.is_finite()) {
                return Err(CalibrationError::InvalidTable(format!(
                    "stick {stick} has non-finite offset {bad}"
                )));
            }
            offsets.extend_from_slice(row);
        }

        Ok(Self {
            stick_num,
            z,
            offsets,
        })
    }

    fn from_const<const S: usize, const Z: usize>(
        stick_num: &[StickId; S],
        z: &[f64; Z],
        rows: &[[f64; Z]; S],
    ) -> Self {
        Self {
            stick_num: stick_num.to_vec(),
            z: z.to_vec(),
            offsets: rows.iter().flatten().copied().collect(),
        }
    }

    pub fn stick_num(&self) -> &[StickId] {
        &self.stick_num
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.stick_num.len(), self.z.len()]
    }

    pub fn contains_stick(&self, stick: StickId) -> bool {
        self.stick_num.contains(&stick)
    }

    /// Offsets for one stick, ordered like [`CalibrationTable::z`].
    pub fn row(&self, stick: StickId) -> Option<&[f64]> {
        let idx = self.stick_num.iter().position(|id| *id == stick)?;
        let width = self.z.len();
        self.offsets.get(idx * width..(idx + 1) * width)
    }

    pub fn rows(&self) -> impl Iterator<Item = (StickId, &[f64])> {
        self.stick_num
            .iter()
            .copied()
            .zip(self.offsets.chunks(self.z.len()))
    }

    pub fn offset(&self, stick: StickId, z_idx: usize) -> Option<f64> {
        self.row(stick)?.get(z_idx).copied()
    }

    /// Looks an offset up by depth value rather than position.
    pub fn offset_at(&self, stick: StickId, depth: f64, tolerance: &DepthTolerance) -> Option<f64> {
        let z_idx = self
            .z
            .iter()
            .position(|reference| tolerance.is_close(depth, *reference))?;
        self.offset(stick, z_idx)
    }
}

const MULTISTICK_STICKS: [StickId; 5] = [0, 1, 2, 3, 4];

const MULTISTICK_DEPTHS_M: [f64; 8] = [0.00, 0.02, 0.04, 0.06, 0.08, 0.10, 0.12, 0.14];

#[rustfmt::skip]
const MULTISTICK_T_DIFF: [[f64; 8]; 5] = [
    [ 0.01688127,  0.04002413,  0.09416699,  0.20345270,  0.10845270,  0.13288127,  0.11530985,  0.16573842],
    [ 0.21075705,  0.01467009,  0.14032227,  0.04901792,  0.11017734, -0.01489512,  0.05655415,  0.04075705],
    [ 0.17162662,  0.18032227,  0.17162662,  0.05858314,  0.11945270,  0.11930778,  0.77162662,  0.09003241],
    [-0.03402556,  0.11640922,  0.11438024,  0.04249618,  0.04611937,  0.16553966,  0.02945270,  0.06162662],
    [ 0.10829328,  0.11742372, -0.01054730,  0.08800343,  0.16206140,  0.11640922,  0.04075705,  0.04336575],
];

static MULTISTICK_CALIBRATION: Lazy<CalibrationTable> = Lazy::new(|| {
    CalibrationTable::from_const(&MULTISTICK_STICKS, &MULTISTICK_DEPTHS_M, &MULTISTICK_T_DIFF)
});

/// Offsets for the deployed five-stick array, depths 0.00-0.14 m.
pub fn multistick_calibration() -> &'static CalibrationTable {
    &MULTISTICK_CALIBRATION
}
