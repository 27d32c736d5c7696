use crate::errors::{ParserAttempt, ParserError};
use crate::formats::MultistickLogParser;
use crate::model::ParsedLogFile;

pub trait MultistickParser {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<ParsedLogFile, ParserError>;
}

pub fn parse_multistick_file(content: &str) -> Result<ParsedLogFile, ParserError> {
    let multistick_log = MultistickLogParser;
    let parsers: [&dyn MultistickParser; 1] = [&multistick_log];
    parse_with_parsers(content, &parsers)
}

pub fn parse_with_parsers(
    content: &str,
    parsers: &[&dyn MultistickParser],
) -> Result<ParsedLogFile, ParserError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match parser.parse(content) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(ParserAttempt::new(parser.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}
