//! iCalendar (RFC 5545) component tree and parser.

pub mod core;
pub mod parse;
