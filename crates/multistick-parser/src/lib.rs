pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{ParserAttempt, ParserError};
pub use model::{LogMetadata, ParsedLogFile, StickId, StickReading};
pub use registry::{parse_multistick_file, parse_with_parsers, MultistickParser};

#[cfg(test)]
mod tests;
