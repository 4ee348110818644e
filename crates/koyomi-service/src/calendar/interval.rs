//! Calendar-aware instants, query windows and the overlap test.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};
use serde::Serialize;

/// A point on the calendar at one of two granularities.
///
/// A date never equals a timed instant, even one at midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Instant {
    /// All-day granularity.
    Date(NaiveDate),
    /// Timed granularity, normalized to UTC.
    DateTime(DateTime<Utc>),
}

impl Instant {
    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// ## Summary
    /// Projects the instant onto the UTC timeline. Dates map to midnight UTC.
    #[must_use]
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN).and_utc(),
            Self::DateTime(dt) => *dt,
        }
    }

    /// ## Summary
    /// Adds a signed offset, keeping the granularity.
    ///
    /// Dates only move by the whole days contained in `delta`.
    #[must_use]
    pub fn checked_add(&self, delta: TimeDelta) -> Option<Self> {
        match self {
            Self::Date(date) => date
                .checked_add_signed(TimeDelta::days(delta.num_days()))
                .map(Self::Date),
            Self::DateTime(dt) => dt.checked_add_signed(delta).map(Self::DateTime),
        }
    }

    /// ## Summary
    /// Returns the same granularity as `self`, placed at `utc`.
    ///
    /// Used to carry an end instant along when its series start moves.
    #[must_use]
    pub fn with_granularity_of(utc: DateTime<Utc>, template: &Self) -> Self {
        match template {
            Self::Date(_) => Self::Date(utc.date_naive()),
            Self::DateTime(_) => Self::DateTime(utc),
        }
    }

    /// ## Summary
    /// Canonical text form used for instance identifiers.
    ///
    /// Dates render as `YYYY-MM-DD`. Timed instants render as RFC 3339 in UTC
    /// with a `Z` suffix and only as much sub-second precision as they carry.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

impl std::fmt::Display for Instant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// ## Summary
/// Parses the textual instant forms found in identifiers and local records.
///
/// Accepts RFC 3339 (`2024-01-08T09:00:00Z`, `2024-01-08T10:00:00+01:00`),
/// iCalendar basic forms (`20240108T090000Z`, `20240108T090000`, `20240108`),
/// ISO dates (`2024-01-08`) and ISO local date-times without an offset.
/// Times without an offset are read as UTC.
#[must_use]
pub fn parse_instant_text(text: &str) -> Option<Instant> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Instant::DateTime(dt.with_timezone(&Utc)));
    }

    for format in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(Instant::Date(date));
        }
    }

    let floating = text.strip_suffix('Z').unwrap_or(text);
    ["%Y%m%dT%H%M%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(floating, format).ok())
        .map(|naive| Instant::DateTime(naive.and_utc()))
}

/// An optionally bounded query window. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Window {
    #[must_use]
    pub const fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    #[must_use]
    pub const fn after(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    #[must_use]
    pub const fn before(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// ## Summary
    /// Builds a horizon around `now`. A missing offset leaves that side open.
    #[must_use]
    pub fn relative_to(now: DateTime<Utc>, past: Option<TimeDelta>, future: Option<TimeDelta>) -> Self {
        Self {
            start: past.and_then(|past| now.checked_sub_signed(past)),
            end: future.and_then(|future| now.checked_add_signed(future)),
        }
    }

    /// Whether `instant` lies within the window bounds.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| instant >= start) && self.end.is_none_or(|end| instant <= end)
    }
}

/// ## Summary
/// End used by the overlap test.
///
/// Entries without an end use their start. All-day entries whose end lies
/// after their start lose one millisecond, so the exclusive midnight after the
/// last day does not touch a window starting that midnight.
#[must_use]
pub fn effective_end_for_overlap(start: &Instant, end: Option<&Instant>) -> DateTime<Utc> {
    let start_utc = start.to_utc();
    let Some(end) = end else {
        return start_utc;
    };

    let end_utc = end.to_utc();
    if start.is_date() && end.is_date() && end_utc > start_utc {
        end_utc - TimeDelta::milliseconds(1)
    } else {
        end_utc
    }
}

/// ## Summary
/// Inclusive overlap test between an entry and a window.
#[must_use]
pub fn overlaps(start: &Instant, end: Option<&Instant>, window: &Window) -> bool {
    let starts_in_time = window.end.is_none_or(|window_end| start.to_utc() <= window_end);
    starts_in_time
        && window
            .start
            .is_none_or(|window_start| effective_end_for_overlap(start, end) >= window_start)
}
