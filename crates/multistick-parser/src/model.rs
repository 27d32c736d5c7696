use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Integer index of a multi-depth probe ("stick") on a logger.
pub type StickId = i64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMetadata {
    pub file_format: String,
    pub logger_name: Option<String>,
    pub site: Option<String>,
    pub firmware: Option<String>,
}

impl LogMetadata {
    pub fn new(file_format: impl Into<String>) -> Self {
        Self {
            file_format: file_format.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedLogFile {
    pub file_hash: String,
    pub metadata: LogMetadata,
    /// Number of temperature values carried by every reading in the file.
    pub depth_count: usize,
    pub readings: Vec<StickReading>,
}

impl ParsedLogFile {
    pub fn stick_ids(&self) -> Vec<StickId> {
        let mut ids: Vec<StickId> = self.readings.iter().map(|r| r.stick).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// One logged line: every depth of a single stick at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct StickReading {
    pub line_index: usize,
    pub timestamp: NaiveDateTime,
    pub stick: StickId,
    pub temperatures: Vec<Option<f64>>,
}
