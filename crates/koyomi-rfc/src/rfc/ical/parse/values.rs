//! Value type parsers for iCalendar (RFC 5545 §3.3).
#![expect(
    clippy::map_err_ignore,
    reason = "Value parsers report position and kind, the std parse error adds nothing"
)]

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::rfc::ical::core::{Date, DateTime, DateTimeForm, Duration, Time};

/// Parses a DATE value (RFC 5545 §3.3.4).
///
/// Format: YYYYMMDD (e.g., "19970714")
///
/// ## Errors
/// Returns an error if the string is not a valid 8-digit date.
pub fn parse_date(s: &str, line: usize, col: usize) -> ParseResult<Date> {
    let err = || ParseError::new(ParseErrorKind::InvalidDate, line, col);

    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let year = s[0..4].parse::<u16>().map_err(|_| err())?;
    let month = s[4..6].parse::<u8>().map_err(|_| err())?;
    let day = s[6..8].parse::<u8>().map_err(|_| err())?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(err());
    }

    Ok(Date { year, month, day })
}

/// Parses a TIME value (RFC 5545 §3.3.12).
///
/// Format: HHMMSS[Z] (e.g., "133000", "133000Z")
///
/// ## Errors
/// Returns an error if the string is not a valid 6-digit time.
pub fn parse_time(s: &str, line: usize, col: usize) -> ParseResult<Time> {
    let err = || ParseError::new(ParseErrorKind::InvalidTime, line, col);

    let (time_str, is_utc) = match s.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (s, false),
    };

    if time_str.len() != 6 || !time_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let hour = time_str[0..2].parse::<u8>().map_err(|_| err())?;
    let minute = time_str[2..4].parse::<u8>().map_err(|_| err())?;
    let second = time_str[4..6].parse::<u8>().map_err(|_| err())?;

    // 60 is a leap second
    if hour > 23 || minute > 59 || second > 60 {
        return Err(err());
    }

    Ok(Time {
        hour,
        minute,
        second,
        is_utc,
    })
}

/// Parses a DATE-TIME value (RFC 5545 §3.3.5).
///
/// Format: YYYYMMDD"T"HHMMSS[Z] (e.g., "19970714T133000Z")
///
/// TZID comes from the property parameters. A trailing `Z` wins over TZID.
///
/// ## Errors
/// Returns an error if the string is not a valid datetime format.
pub fn parse_datetime(
    s: &str,
    tzid: Option<&str>,
    line: usize,
    col: usize,
) -> ParseResult<DateTime> {
    let (date_str, time_str) = s
        .split_once('T')
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidDateTime, line, col))?;

    let date = parse_date(date_str, line, col)?;
    let time = parse_time(time_str, line, col + date_str.len() + 1)?;

    let form = if time.is_utc {
        DateTimeForm::Utc
    } else if let Some(tz) = tzid {
        DateTimeForm::Zoned {
            tzid: tz.to_string(),
        }
    } else {
        DateTimeForm::Floating
    };

    Ok(DateTime {
        year: date.year,
        month: date.month,
        day: date.day,
        hour: time.hour,
        minute: time.minute,
        second: time.second,
        form,
    })
}

/// Parses a DURATION value (RFC 5545 §3.3.6).
///
/// Format: [+|-]P[nW] or [+|-]P[nD][T[nH][nM][nS]]
///
/// ## Errors
/// Returns an error if the string is not a valid duration format.
pub fn parse_duration(s: &str, line: usize, col: usize) -> ParseResult<Duration> {
    let err = || ParseError::new(ParseErrorKind::InvalidDuration, line, col);

    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let body = rest.strip_prefix('P').ok_or_else(err)?;
    if body.is_empty() {
        return Err(err());
    }

    let mut dur = Duration {
        negative,
        ..Duration::zero()
    };
    let mut in_time = false;
    let mut digits = String::new();
    let mut saw_component = false;

    for c in body.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if c == 'T' {
            if in_time || !digits.is_empty() {
                return Err(err());
            }
            in_time = true;
            continue;
        }

        let value = digits.parse::<u32>().map_err(|_| err())?;
        digits.clear();
        match (c, in_time) {
            ('W', false) => dur.weeks = value,
            ('D', false) => dur.days = value,
            ('H', true) => dur.hours = value,
            ('M', true) => dur.minutes = value,
            ('S', true) => dur.seconds = value,
            _ => return Err(err()),
        }
        saw_component = true;
    }

    if !digits.is_empty() || !saw_component {
        return Err(err());
    }

    Ok(dur)
}

/// Parses an INTEGER value (RFC 5545 §3.3.8).
///
/// ## Errors
/// Returns an error if the string is not a valid integer.
pub fn parse_integer(s: &str, line: usize, col: usize) -> ParseResult<i32> {
    s.trim()
        .parse::<i32>()
        .map_err(|_| ParseError::new(ParseErrorKind::InvalidInteger, line, col))
}

/// Unescapes a TEXT value (RFC 5545 §3.3.11).
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => result.push('\n'),
            Some(',') => result.push(','),
            Some(';') => result.push(';'),
            Some('\\') | None => result.push('\\'),
            Some(other) => {
                // Invalid escape, preserve as-is
                result.push('\\');
                result.push(other);
            }
        }
    }

    result
}
