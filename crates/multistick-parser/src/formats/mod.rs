mod common;
mod multistick_log;

pub use multistick_log::MultistickLogParser;

pub(crate) use common::{
    apply_header_entry, file_hash, parse_optional_f64, parse_stick_id, parse_timestamp,
    split_header_comment,
};
