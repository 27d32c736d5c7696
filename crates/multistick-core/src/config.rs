use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationOptions, DepthTolerance};
use crate::error::{PipelineError, Result};

pub const CONFIG_ENV_VAR: &str = "MULTISTICK_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MultistickConfig {
    pub reader: ReaderConfig,
    pub calibration: CalibrationConfig,
}

impl MultistickConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.calibration.options()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Distance between neighbouring thermistors on a stick, metres.
    pub depth_spacing_m: f64,
    pub depth_origin_m: f64,
    /// Explicit depths; overrides origin/spacing when set.
    pub depths_m: Option<Vec<f64>>,
    pub skip_invalid_files: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            depth_spacing_m: 0.02,
            depth_origin_m: 0.0,
            depths_m: None,
            skip_invalid_files: false,
        }
    }
}

impl ReaderConfig {
    /// Depth coordinate for a stick carrying `depth_count` thermistors.
    pub fn depths(&self, depth_count: usize) -> Result<Vec<f64>> {
        if let Some(depths) = &self.depths_m {
            if depths.len() != depth_count {
                return Err(PipelineError::Validation(format!(
                    "configured {} depths but log files carry {depth_count} readings per stick",
                    depths.len()
                )));
            }
            return Ok(depths.clone());
        }

        if !self.depth_spacing_m.is_finite() || self.depth_spacing_m <= 0.0 {
            return Err(PipelineError::Validation(format!(
                "depth_spacing_m must be positive, got {}",
                self.depth_spacing_m
            )));
        }
        if !self.depth_origin_m.is_finite() {
            return Err(PipelineError::Validation(format!(
                "depth_origin_m must be finite, got {}",
                self.depth_origin_m
            )));
        }

        Ok((0..depth_count)
            .map(|idx| self.depth_origin_m + idx as f64 * self.depth_spacing_m)
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    pub apply: bool,
    pub rtol: f64,
    pub atol: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            apply: true,
            rtol: DepthTolerance::DEFAULT_RTOL,
            atol: DepthTolerance::DEFAULT_ATOL,
        }
    }
}

impl CalibrationConfig {
    /// Tolerances must be finite and non-negative.
    pub fn options(&self) -> Result<CalibrationOptions> {
        for (name, value) in [("rtol", self.rtol), ("atol", self.atol)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::Validation(format!(
                    "calibration.{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(CalibrationOptions {
            depth_tolerance: DepthTolerance::new(self.rtol, self.atol),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = MultistickConfig::from_toml_str("").unwrap();
        assert_eq!(config, MultistickConfig::default());
        assert!(config.calibration.apply);
        assert_eq!(
            config.calibration.options().unwrap(),
            CalibrationOptions::default()
        );
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let config = MultistickConfig::from_toml_str(
            r#"
            [reader]
            skip_invalid_files = true

            [calibration]
            atol = 1e-6
            "#,
        )
        .unwrap();
        assert!(config.reader.skip_invalid_files);
        assert_eq!(config.reader.depth_spacing_m, 0.02);
        assert_eq!(config.calibration.atol, 1e-6);
        assert_eq!(config.calibration.rtol, 1e-5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = MultistickConfig::from_toml_str("[reader]\nspacing = 0.05\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn bad_tolerances_are_rejected_on_load() {
        for document in [
            "[calibration]\natol = -1e-8\n",
            "[calibration]\nrtol = nan\n",
            "[calibration]\nrtol = inf\n",
        ] {
            let err = MultistickConfig::from_toml_str(document).unwrap_err();
            assert!(
                matches!(&err, PipelineError::Validation(msg) if msg.starts_with("calibration.")),
                "{document:?}: {err:?}"
            );
        }

        let built = CalibrationConfig {
            atol: f64::NAN,
            ..CalibrationConfig::default()
        };
        assert!(matches!(built.options(), Err(PipelineError::Validation(_))));
    }

    #[test]
    fn depths_from_spacing_or_explicit_list() {
        let reader = ReaderConfig::default();
        let depths = reader.depths(3).unwrap();
        assert_eq!(depths.len(), 3);
        assert!((depths[2] - 0.04).abs() < 1e-12);

        let explicit = ReaderConfig {
            depths_m: Some(vec![0.0, 0.05]),
            ..ReaderConfig::default()
        };
        assert_eq!(explicit.depths(2).unwrap(), vec![0.0, 0.05]);
        assert!(matches!(explicit.depths(3), Err(PipelineError::Validation(_))));

        let broken = ReaderConfig {
            depth_spacing_m: 0.0,
            ..ReaderConfig::default()
        };
        assert!(broken.depths(2).is_err());
    }
}
