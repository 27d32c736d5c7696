use chrono::NaiveDateTime;

use crate::errors::ParserError;
use crate::model::{LogMetadata, StickId};

/// Logger value written when a thermistor could not be read.
const MISSING_SENTINEL: f64 = -99.0;

pub(crate) fn file_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Splits a `# key: value` comment line. Plain comments yield `None`.
pub(crate) fn split_header_comment(line: &str) -> Option<(String, String)> {
    let body = line.trim_start().strip_prefix('#')?;
    let (key, value) = body.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key.to_ascii_lowercase(), value.trim().to_string()))
}

pub(crate) fn apply_header_entry(metadata: &mut LogMetadata, key: &str, value: String) {
    let value = clean_optional(&value);
    match key {
        "logger" => metadata.logger_name = value,
        "site" => metadata.site = value,
        "firmware" => metadata.firmware = value,
        _ => {}
    }
}

fn clean_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn parse_timestamp(
    parser: &'static str,
    value: &str,
    line_index: usize,
) -> Result<NaiveDateTime, ParserError> {
    static FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];
    let trimmed = value.trim();
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }
    Err(ParserError::DataRow {
        parser,
        line_index,
        message: format!("invalid timestamp '{trimmed}'"),
    })
}

pub(crate) fn parse_stick_id(
    parser: &'static str,
    value: &str,
    line_index: usize,
) -> Result<StickId, ParserError> {
    let trimmed = value.trim();
    let parsed = trimmed
        .parse::<StickId>()
        .map_err(|err| ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse stick number '{trimmed}': {err}"),
        })?;
    if parsed < 0 {
        return Err(ParserError::DataRow {
            parser,
            line_index,
            message: format!("stick number must be non-negative, got {parsed}"),
        });
    }
    Ok(parsed)
}

pub(crate) fn parse_optional_f64(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(parsed) => {
            if (parsed - MISSING_SENTINEL).abs() < f64::EPSILON {
                Ok(None)
            } else if !parsed.is_finite() {
                Err(ParserError::DataRow {
                    parser,
                    line_index,
                    message: format!("column '{column}' is not a finite number"),
                })
            } else {
                Ok(Some(parsed))
            }
        }
        Err(err) => Err(ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse column '{column}' as float: {err}"),
        }),
    }
}
