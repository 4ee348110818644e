//! iCalendar document parser (RFC 5545).
//!
//! Parses complete iCalendar documents into typed structures.

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::{parse_content_line, split_lines};
use super::values::{parse_date, parse_datetime, parse_duration, parse_integer, unescape_text};
use crate::rfc::ical::core::{Component, ComponentKind, ContentLine, ICalendar, Property, Value};

/// Parses an iCalendar document from a string.
///
/// ## Errors
///
/// Returns an error if the input is not structurally valid iCalendar.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> ParseResult<ICalendar> {
    tracing::debug!("Parsing iCalendar document");

    let lines = split_lines(input.trim_start_matches('\u{feff}'));

    if lines.is_empty() {
        tracing::warn!("Empty iCalendar input");
        return Err(ParseError::new(ParseErrorKind::MissingBegin, 1, 1));
    }

    let content_lines: Vec<(usize, ContentLine)> = lines
        .into_iter()
        .map(|(line_num, line)| parse_content_line(&line, line_num).map(|cl| (line_num, cl)))
        .collect::<ParseResult<_>>()?;

    tracing::trace!(count = content_lines.len(), "Parsed content lines");

    let mut iter = content_lines.into_iter();
    let (line_num, begin) = iter
        .next()
        .ok_or_else(|| ParseError::new(ParseErrorKind::MissingBegin, 1, 1))?;
    if begin.name != "BEGIN" {
        return Err(ParseError::new(ParseErrorKind::MissingBegin, line_num, 1));
    }

    let root = parse_component(&mut iter, line_num, &begin.raw_value)?;

    if root.kind != ComponentKind::Calendar {
        tracing::warn!(component = %root.name, "Root component is not VCALENDAR");
        return Err(
            ParseError::new(ParseErrorKind::MissingBegin, line_num, 1)
                .with_context("expected VCALENDAR"),
        );
    }

    if let Some((line_num, trailing)) = iter.next() {
        tracing::debug!(line = line_num, name = %trailing.name, "Ignoring content after END:VCALENDAR");
    }

    tracing::debug!(
        events = root.children_of_kind(ComponentKind::Event).len(),
        "iCalendar document parsed successfully"
    );

    Ok(ICalendar { root })
}

/// Parses the body of a component whose BEGIN line was already consumed.
fn parse_component(
    iter: &mut impl Iterator<Item = (usize, ContentLine)>,
    begin_line_num: usize,
    component_name: &str,
) -> ParseResult<Component> {
    let mut component = Component::begin(component_name);
    let mut last_line_num = begin_line_num;

    loop {
        let Some((line_num, content_line)) = iter.next() else {
            return Err(
                ParseError::new(ParseErrorKind::MissingEnd, last_line_num, 1)
                    .with_context(format!("missing END:{}", component.name)),
            );
        };
        last_line_num = line_num;

        match content_line.name.as_str() {
            "BEGIN" => {
                let nested = parse_component(iter, line_num, &content_line.raw_value)?;
                component.children.push(nested);
            }
            "END" => {
                let end_name = content_line.raw_value.to_ascii_uppercase();
                if end_name != component.name {
                    return Err(
                        ParseError::new(ParseErrorKind::MismatchedComponent, line_num, 1)
                            .with_context(format!(
                                "expected END:{}, got END:{end_name}",
                                component.name
                            )),
                    );
                }
                return Ok(component);
            }
            _ => component.properties.push(parse_property(content_line, line_num)),
        }
    }
}

/// Parses a property from a content line, resolving the value type.
///
/// A value that does not match its type is kept as `Value::Unknown`.
fn parse_property(cl: ContentLine, line_num: usize) -> Property {
    let value_type = determine_value_type(&cl);

    let value = parse_value(&cl.raw_value, value_type, cl.tzid(), line_num).unwrap_or_else(|err| {
        tracing::debug!(property = %cl.name, error = %err, "Keeping untyped property value");
        Value::Unknown(cl.raw_value.clone())
    });

    Property {
        name: cl.name,
        params: cl.params,
        value,
        raw_value: cl.raw_value,
    }
}

/// Internal enum for value type handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Date,
    DateTime,
    Duration,
    Integer,
    Text,
    Raw,
}

impl ValueType {
    fn from_param(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "DATE" => Self::Date,
            "DATE-TIME" => Self::DateTime,
            "DURATION" => Self::Duration,
            "INTEGER" => Self::Integer,
            "TEXT" => Self::Text,
            _ => Self::Raw,
        }
    }
}

/// Determines the value type for a property.
fn determine_value_type(cl: &ContentLine) -> ValueType {
    if let Some(value_type) = cl.value_type() {
        return ValueType::from_param(value_type);
    }

    match cl.name.as_str() {
        "DTSTART" | "DTEND" | "DTSTAMP" | "CREATED" | "LAST-MODIFIED" | "COMPLETED" | "DUE"
        | "RECURRENCE-ID" | "EXDATE" | "RDATE" => {
            // Lenient: date-only values without VALUE=DATE
            if cl.raw_value.contains('T') {
                ValueType::DateTime
            } else {
                ValueType::Date
            }
        }
        "DURATION" => ValueType::Duration,
        "PERCENT-COMPLETE" | "PRIORITY" | "REPEAT" | "SEQUENCE" => ValueType::Integer,
        // Structured values (RRULE, GEO, URIs, offsets) stay raw for their consumers.
        "RRULE" | "EXRULE" | "GEO" | "URL" | "TZURL" | "SOURCE" | "ATTENDEE" | "ORGANIZER"
        | "TZOFFSETFROM" | "TZOFFSETTO" | "TRIGGER" | "FREEBUSY" => ValueType::Raw,
        _ => ValueType::Text,
    }
}

/// Parses a raw value string into a typed Value.
fn parse_value(
    raw: &str,
    value_type: ValueType,
    tzid: Option<&str>,
    line_num: usize,
) -> ParseResult<Value> {
    match value_type {
        ValueType::Text => Ok(Value::Text(unescape_text(raw))),
        ValueType::DateTime if raw.contains(',') => Ok(Value::DateTimeList(
            raw.split(',')
                .map(|s| parse_datetime(s.trim(), tzid, line_num, 1))
                .collect::<ParseResult<_>>()?,
        )),
        ValueType::DateTime => Ok(Value::DateTime(parse_datetime(raw, tzid, line_num, 1)?)),
        ValueType::Date if raw.contains(',') => Ok(Value::DateList(
            raw.split(',')
                .map(|s| parse_date(s.trim(), line_num, 1))
                .collect::<ParseResult<_>>()?,
        )),
        ValueType::Date => Ok(Value::Date(parse_date(raw, line_num, 1)?)),
        ValueType::Duration => Ok(Value::Duration(parse_duration(raw, line_num, 1)?)),
        ValueType::Integer => Ok(Value::Integer(parse_integer(raw, line_num, 1)?)),
        ValueType::Raw => Ok(Value::Text(raw.to_string())),
    }
}
