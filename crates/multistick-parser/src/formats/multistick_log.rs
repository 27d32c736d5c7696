use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::{LogMetadata, ParsedLogFile, StickReading};
use crate::registry::MultistickParser;

use super::{
    apply_header_entry, file_hash, parse_optional_f64, parse_stick_id, parse_timestamp,
    split_header_comment,
};

/// Comma-separated multistick export: `timestamp,stick,T_0,...,T_n-1` per line,
/// `#` comments, optional `# key: value` header entries.
pub struct MultistickLogParser;

impl Default for MultistickLogParser {
    fn default() -> Self {
        Self
    }
}

impl MultistickLogParser {
    const NAME: &'static str = "MULTISTICK_LOG";
    const LEADING_COLUMNS: usize = 2;

    fn reader_builder() -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All);
        builder
    }

    fn parse_metadata(content: &str) -> Result<LogMetadata, ParserError> {
        let mut metadata = LogMetadata::new(Self::NAME);
        for line in content.lines() {
            let Some((key, value)) = split_header_comment(line) else {
                continue;
            };
            if key == "format" {
                if !value.eq_ignore_ascii_case(Self::NAME) {
                    return Err(ParserError::FormatMismatch {
                        parser: Self::NAME,
                        reason: format!("declared format '{value}' is not {}", Self::NAME),
                    });
                }
                continue;
            }
            apply_header_entry(&mut metadata, &key, value);
        }
        Ok(metadata)
    }

    fn parse_record(
        record: &StringRecord,
        line_index: usize,
        depth_count: Option<usize>,
    ) -> Result<StickReading, ParserError> {
        if record.len() <= Self::LEADING_COLUMNS {
            return Err(ParserError::DataRow {
                parser: Self::NAME,
                line_index,
                message: format!(
                    "expected a timestamp, a stick number and at least one temperature, found {} fields",
                    record.len()
                ),
            });
        }

        let found = record.len() - Self::LEADING_COLUMNS;
        if let Some(expected) = depth_count {
            if found != expected {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!("expected {expected} depth values but found {found}"),
                });
            }
        }

        let timestamp = parse_timestamp(Self::NAME, record.get(0).unwrap_or(""), line_index)?;
        let stick = parse_stick_id(Self::NAME, record.get(1).unwrap_or(""), line_index)?;

        let mut temperatures = Vec::with_capacity(found);
        for (depth_index, value) in record.iter().skip(Self::LEADING_COLUMNS).enumerate() {
            let column = format!("T_{depth_index}");
            temperatures.push(parse_optional_f64(Self::NAME, value, line_index, &column)?);
        }

        Ok(StickReading {
            line_index,
            timestamp,
            stick,
            temperatures,
        })
    }

    fn parse_with_builder(
        &self,
        builder: csv::ReaderBuilder,
        content: &str,
    ) -> Result<ParsedLogFile, ParserError> {
        let metadata = Self::parse_metadata(content)?;
        let mut reader = builder.from_reader(content.as_bytes());

        let mut readings: Vec<StickReading> = Vec::new();
        let mut depth_count: Option<usize> = None;

        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            let line_index = record
                .position()
                .map_or(row_idx + 1, |pos| pos.line() as usize);

            let reading = match Self::parse_record(&record, line_index, depth_count) {
                Ok(reading) => reading,
                // A first line that does not look like a multistick reading means this is
                // some other kind of file, not a corrupt multistick log.
                Err(ParserError::DataRow { message, .. }) if readings.is_empty() => {
                    return Err(ParserError::FormatMismatch {
                        parser: Self::NAME,
                        reason: format!("line {line_index}: {message}"),
                    });
                }
                Err(err) => return Err(err),
            };

            depth_count.get_or_insert(reading.temperatures.len());
            readings.push(reading);
        }

        let Some(depth_count) = depth_count else {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        };

        Ok(ParsedLogFile {
            file_hash: file_hash(content),
            metadata,
            depth_count,
            readings,
        })
    }

    #[cfg(test)]
    pub(crate) fn parse_with_custom_builder(
        &self,
        builder: csv::ReaderBuilder,
        content: &str,
    ) -> Result<ParsedLogFile, ParserError> {
        self.parse_with_builder(builder, content)
    }
}

impl MultistickParser for MultistickLogParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedLogFile, ParserError> {
        self.parse_with_builder(Self::reader_builder(), content)
    }
}
