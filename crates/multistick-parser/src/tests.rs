use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use csv::ReaderBuilder;

use crate::errors::ParserError;
use crate::formats::MultistickLogParser;
use crate::model::ParsedLogFile;
use crate::parse_multistick_file;
use crate::registry::{parse_with_parsers, MultistickParser};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn parses_multistick_log_with_header() {
    let content = fixture("multistick_20240601.log");
    let parsed = parse_multistick_file(&content).expect("multistick parse failed");

    assert_eq!(parsed.metadata.file_format, "MULTISTICK_LOG");
    assert_eq!(parsed.metadata.logger_name.as_deref(), Some("MS-03"));
    assert_eq!(parsed.metadata.site.as_deref(), Some("North Fen transect"));
    assert_eq!(parsed.metadata.firmware.as_deref(), Some("2.4.1"));
    assert_eq!(parsed.depth_count, 8);
    assert_eq!(parsed.readings.len(), 6);
    assert_eq!(parsed.stick_ids(), vec![0, 1, 2]);

    let first = &parsed.readings[0];
    let expected_ts = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert_eq!(first.timestamp, expected_ts);
    assert_eq!(first.stick, 0);
    assert_eq!(first.temperatures[0], Some(14.812));
    assert_eq!(first.temperatures[7], Some(13.804));
}

#[test]
fn sentinel_and_nan_readings_become_missing() {
    let content = fixture("multistick_20240601.log");
    let parsed = parse_multistick_file(&content).expect("multistick parse failed");

    let stick1 = &parsed.readings[4];
    assert_eq!(stick1.stick, 1);
    assert_eq!(stick1.temperatures[2], None);

    let stick2 = &parsed.readings[5];
    assert_eq!(stick2.stick, 2);
    assert_eq!(stick2.temperatures[4], None);
    assert_eq!(stick2.temperatures[5], Some(14.210));
}

#[test]
fn blank_lines_are_skipped() {
    let content = fixture("multistick_20240602.log");
    let parsed = parse_multistick_file(&content).expect("multistick parse failed");

    assert_eq!(parsed.readings.len(), 3);
    assert_eq!(parsed.stick_ids(), vec![0, 1, 3]);
    assert_eq!(parsed.metadata.site, None);
}

#[test]
fn file_hash_is_stable_and_content_sensitive() {
    let content = fixture("multistick_20240601.log");
    let a = parse_multistick_file(&content).unwrap();
    let b = parse_multistick_file(&content).unwrap();
    assert_eq!(a.file_hash, b.file_hash);
    assert_eq!(a.file_hash.len(), 64);

    let other = parse_multistick_file(&fixture("multistick_20240602.log")).unwrap();
    assert_ne!(a.file_hash, other.file_hash);
}

#[test]
fn toa5_file_is_not_recognized() {
    let content = fixture("toa5_table.dat");
    let err = parse_multistick_file(&content).expect_err("TOA5 should not parse");
    match err {
        ParserError::NoMatchingParser { attempts } => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].parser, "MULTISTICK_LOG");
            assert!(attempts[0].message.contains("invalid timestamp"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn declared_foreign_format_is_a_mismatch() {
    let content = "# format: TOA5\n2024-06-01 12:00:00,0,1.0\n";
    let err = MultistickLogParser.parse(content).expect_err("format header ignored");
    assert!(matches!(err, ParserError::FormatMismatch { .. }));
}

#[test]
fn inconsistent_depth_count_is_a_data_row_error() {
    let content = "\
2024-06-01 12:00:00,0,1.0,2.0,3.0
2024-06-01 12:00:00,1,1.0,2.0
";
    let err = parse_multistick_file(content).expect_err("ragged rows accepted");
    match err {
        ParserError::DataRow {
            line_index,
            message,
            ..
        } => {
            assert_eq!(line_index, 2);
            assert!(message.contains("expected 3 depth values but found 2"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn bad_value_after_first_row_is_a_data_row_error() {
    let content = "\
2024-06-01 12:00:00,0,1.0,2.0
2024-06-01 12:10:00,0,1.0,warm
";
    let err = parse_multistick_file(content).expect_err("non-numeric reading accepted");
    assert!(matches!(err, ParserError::DataRow { line_index: 2, .. }));
}

#[test]
fn comment_only_file_is_empty() {
    let content = "# logger: MS-01\n# nothing recorded\n";
    let err = parse_multistick_file(content).expect_err("empty file accepted");
    assert!(matches!(err, ParserError::EmptyData { .. }));
}

#[test]
fn iso_t_separator_and_fractional_seconds_parse() {
    let content = "2024-06-01T12:00:00.5,4,1.25\n";
    let parsed = parse_multistick_file(content).unwrap();
    assert_eq!(parsed.readings[0].stick, 4);
    assert_eq!(
        parsed.readings[0].timestamp.and_utc().timestamp_millis() % 1000,
        500
    );
}

#[test]
fn custom_builder_respects_delimiter() {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .delimiter(b';');
    let content = "2024-06-01 12:00:00;0;1.5;2.5\n";
    let parsed = MultistickLogParser
        .parse_with_custom_builder(builder, content)
        .expect("semicolon parse failed");
    assert_eq!(parsed.depth_count, 2);
    assert_eq!(parsed.readings[0].temperatures, vec![Some(1.5), Some(2.5)]);
}

struct AlwaysMismatch;

impl MultistickParser for AlwaysMismatch {
    fn name(&self) -> &'static str {
        "ALWAYS_MISMATCH"
    }

    fn parse(&self, _content: &str) -> Result<ParsedLogFile, ParserError> {
        Err(ParserError::FormatMismatch {
            parser: "ALWAYS_MISMATCH",
            reason: "never matches".to_string(),
        })
    }
}

#[test]
fn registry_falls_through_format_mismatches() {
    let content = fixture("multistick_20240602.log");
    let mismatch = AlwaysMismatch;
    let multistick = MultistickLogParser;
    let parsers: [&dyn MultistickParser; 2] = [&mismatch, &multistick];
    let parsed = parse_with_parsers(&content, &parsers).expect("fallthrough failed");
    assert_eq!(parsed.readings.len(), 3);

    let only_mismatch: [&dyn MultistickParser; 1] = [&mismatch];
    let err = parse_with_parsers(&content, &only_mismatch).unwrap_err();
    assert!(matches!(err, ParserError::NoMatchingParser { attempts } if attempts.len() == 1));
}
