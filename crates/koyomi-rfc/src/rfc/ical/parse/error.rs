//! iCalendar parse error types.

use std::fmt;

/// Result type for iCalendar parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// An error that occurred while parsing an iCalendar document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Line number where the error occurred (1-based).
    pub line: usize,
    /// Column where the error occurred (1-based).
    pub column: usize,
    /// Additional context.
    pub context: Option<String>,
}

impl ParseError {
    #[must_use]
    pub const fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            line,
            column,
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.kind)?;
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// The kind of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Document or component does not start with BEGIN.
    MissingBegin,
    /// Component is never closed.
    MissingEnd,
    /// END does not match the open component.
    MismatchedComponent,
    /// Content line has no name.
    MissingPropertyName,
    /// Property name contains invalid characters.
    InvalidPropertyName,
    /// Content line has no value separator.
    MissingColon,
    /// Malformed parameter.
    InvalidParameter,
    /// Quoted parameter value is never closed.
    UnclosedQuote,
    InvalidDate,
    InvalidTime,
    InvalidDateTime,
    InvalidDuration,
    InvalidInteger,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingBegin => "missing BEGIN",
            Self::MissingEnd => "missing END",
            Self::MismatchedComponent => "mismatched component",
            Self::MissingPropertyName => "missing property name",
            Self::InvalidPropertyName => "invalid property name",
            Self::MissingColon => "missing ':'",
            Self::InvalidParameter => "invalid parameter",
            Self::UnclosedQuote => "unclosed quote",
            Self::InvalidDate => "invalid date",
            Self::InvalidTime => "invalid time",
            Self::InvalidDateTime => "invalid date-time",
            Self::InvalidDuration => "invalid duration",
            Self::InvalidInteger => "invalid integer",
        };
        f.write_str(text)
    }
}
