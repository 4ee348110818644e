//! Entry shapes produced by feed extraction and consumed by the expander.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::interval::{self, Instant, Window};
use super::rule::RecurrenceRule;

/// A titled span on the calendar. All-day when its start is a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: Instant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Instant>,
}

impl CalendarEntry {
    #[must_use]
    pub fn new(title: impl Into<String>, start: Instant) -> Self {
        Self {
            title: title.into(),
            description: None,
            start,
            end: None,
        }
    }

    #[must_use]
    pub const fn with_end(mut self, end: Instant) -> Self {
        self.end = Some(end);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn is_all_day(&self) -> bool {
        self.start.is_date()
    }

    #[must_use]
    pub fn effective_end_for_overlap(&self) -> DateTime<Utc> {
        interval::effective_end_for_overlap(&self.start, self.end.as_ref())
    }

    #[must_use]
    pub fn overlaps(&self, window: &Window) -> bool {
        interval::overlaps(&self.start, self.end.as_ref(), window)
    }

    /// ## Summary
    /// Copies the entry to a new start, preserving its duration.
    ///
    /// The end keeps its own granularity. Returns `None` when the shifted end
    /// falls outside the representable range.
    #[must_use]
    pub fn moved_to(&self, start: Instant) -> Option<Self> {
        let end = match &self.end {
            Some(end) => {
                let duration = end.to_utc() - self.start.to_utc();
                let shifted = start.to_utc().checked_add_signed(duration)?;
                Some(Instant::with_granularity_of(shifted, end))
            }
            None => None,
        };

        Some(Self {
            title: self.title.clone(),
            description: self.description.clone(),
            start,
            end,
        })
    }
}

/// A recurring entry: a base entry repeated under a rule.
#[derive(Debug, Clone)]
pub struct Series<R = RecurrenceRule> {
    pub uid: String,
    pub base: CalendarEntry,
    pub rule: R,
    /// Candidates removed from the series (EXDATE).
    pub exclusions: Vec<Instant>,
    pub exceptions: Vec<Exception>,
}

impl<R> Series<R> {
    #[must_use]
    pub fn new(uid: impl Into<String>, base: CalendarEntry, rule: R) -> Self {
        Self {
            uid: uid.into(),
            base,
            rule,
            exclusions: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_exclusion(mut self, instant: Instant) -> Self {
        self.exclusions.push(instant);
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: Exception) -> Self {
        self.exceptions.push(exception);
        self
    }
}

/// A replacement for one instance of a series, keyed by the instant it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub series_id: String,
    pub recurrence_id: Instant,
    /// Revision number; the highest wins when one instance has several.
    pub sequence: i32,
    pub entry: CalendarEntry,
}

impl Exception {
    #[must_use]
    pub fn new(series_id: impl Into<String>, recurrence_id: Instant, entry: CalendarEntry) -> Self {
        Self {
            series_id: series_id.into(),
            recurrence_id,
            sequence: 0,
            entry,
        }
    }

    #[must_use]
    pub const fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = sequence;
        self
    }
}

/// A non-recurring entry with its own identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Singleton {
    pub uid: String,
    pub entry: CalendarEntry,
}

impl Singleton {
    #[must_use]
    pub fn new(uid: impl Into<String>, entry: CalendarEntry) -> Self {
        Self {
            uid: uid.into(),
            entry,
        }
    }
}
