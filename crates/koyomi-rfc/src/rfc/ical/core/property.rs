//! Content lines and the properties built from them.

use super::{DateTime, Duration, Parameter, Value};

/// One unfolded line split into name, parameters and untouched value text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Uppercased property name.
    pub name: String,
    pub params: Vec<Parameter>,
    /// Value text, still escaped.
    pub raw_value: String,
}

impl ContentLine {
    /// First value of the parameter called `name`, compared case-insensitively.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|param| param.name.eq_ignore_ascii_case(name))
            .and_then(Parameter::value)
    }

    #[must_use]
    pub fn value_type(&self) -> Option<&str> {
        self.param("VALUE")
    }

    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        self.param("TZID")
    }
}

/// A content line with its value typed.
///
/// `raw_value` keeps the original text so callers can report or hash it.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub params: Vec<Parameter>,
    pub value: Value,
    pub raw_value: String,
}

impl Property {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_text()
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        self.value.as_integer()
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<&DateTime> {
        self.value.as_datetime()
    }

    #[must_use]
    pub fn as_duration(&self) -> Option<&Duration> {
        self.value.as_duration()
    }
}

/// Property names the feed reader looks up.
pub mod names {
    pub const UID: &str = "UID";
    pub const SUMMARY: &str = "SUMMARY";
    pub const DESCRIPTION: &str = "DESCRIPTION";

    pub const DTSTART: &str = "DTSTART";
    pub const DTEND: &str = "DTEND";
    pub const DURATION: &str = "DURATION";
    pub const TZID: &str = "TZID";

    pub const RRULE: &str = "RRULE";
    pub const RDATE: &str = "RDATE";
    pub const EXDATE: &str = "EXDATE";
    pub const RECURRENCE_ID: &str = "RECURRENCE-ID";
    pub const SEQUENCE: &str = "SEQUENCE";
}
