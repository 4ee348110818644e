//! iCalendar text → component tree.
//!
//! Structural problems (unbalanced BEGIN/END, malformed content lines) fail the
//! whole document. Values that do not match their expected type are kept as
//! [`Value::Unknown`](crate::rfc::ical::core::Value::Unknown) so consumers can
//! reject just the affected component.

mod error;
mod lexer;
mod parser;
mod values;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use lexer::{parse_content_line, split_lines};
pub use parser::parse;
pub use values::{parse_date, parse_datetime, parse_duration, unescape_text};

use crate::error::RfcResult;
use crate::rfc::ical::core::ICalendar;

/// Turns raw calendar text into a component tree.
pub trait ComponentParser: Send + Sync {
    /// ## Errors
    /// Returns an error if the input is not a well-formed calendar document.
    fn parse(&self, input: &str) -> RfcResult<ICalendar>;
}

/// The built-in RFC 5545 parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcalParser;

impl ComponentParser for IcalParser {
    fn parse(&self, input: &str) -> RfcResult<ICalendar> {
        Ok(parser::parse(input)?)
    }
}
