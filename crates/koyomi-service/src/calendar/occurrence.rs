//! Occurrence identity and reconciliation of expansion results.

use std::collections::HashSet;

use serde::Serialize;

use super::entry::{CalendarEntry, Singleton};
use super::interval::Instant;

/// Where an occurrence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Singleton,
    Series,
    Exception,
}

impl Provenance {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Series => "series",
            Self::Exception => "exception",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expansion output before identifiers are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOccurrence {
    Singleton {
        uid: String,
        entry: CalendarEntry,
    },
    Series {
        series_id: String,
        recurrence_id: Instant,
        entry: CalendarEntry,
    },
    Exception {
        series_id: String,
        recurrence_id: Instant,
        entry: CalendarEntry,
    },
}

impl RawOccurrence {
    #[must_use]
    pub const fn provenance(&self) -> Provenance {
        match self {
            Self::Singleton { .. } => Provenance::Singleton,
            Self::Series { .. } => Provenance::Series,
            Self::Exception { .. } => Provenance::Exception,
        }
    }

    #[must_use]
    pub const fn entry(&self) -> &CalendarEntry {
        match self {
            Self::Singleton { entry, .. }
            | Self::Series { entry, .. }
            | Self::Exception { entry, .. } => entry,
        }
    }

    /// Assigns the external identity.
    #[must_use]
    pub fn into_occurrence(self) -> Occurrence {
        let provenance = self.provenance();
        let (series_id, instance_id, entry) = match self {
            Self::Singleton { uid, entry } => (uid, String::new(), entry),
            Self::Series {
                series_id,
                recurrence_id,
                entry,
            }
            | Self::Exception {
                series_id,
                recurrence_id,
                entry,
            } => (series_id, recurrence_id.canonical(), entry),
        };

        Occurrence {
            series_id,
            instance_id,
            provenance,
            entry,
        }
    }
}

impl From<&Singleton> for RawOccurrence {
    fn from(singleton: &Singleton) -> Self {
        Self::Singleton {
            uid: singleton.uid.clone(),
            entry: singleton.entry.clone(),
        }
    }
}

/// A concrete, externally visible calendar occurrence.
///
/// `(series_id, instance_id)` is unique within one expansion. `instance_id`
/// is empty for singletons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub series_id: String,
    pub instance_id: String,
    pub provenance: Provenance,
    #[serde(flatten)]
    pub entry: CalendarEntry,
}

impl Occurrence {
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.series_id, &self.instance_id)
    }

    #[must_use]
    pub const fn is_all_day(&self) -> bool {
        self.entry.is_all_day()
    }
}

/// ## Summary
/// Merges expansion results into identified occurrences.
///
/// Inputs are concatenated in order (`raw`, then `exceptions_applied`, then
/// `singletons`). A later occurrence whose identity was already seen is dropped.
#[must_use]
pub fn reconcile(
    raw: Vec<RawOccurrence>,
    exceptions_applied: Vec<RawOccurrence>,
    singletons: &[Singleton],
) -> Vec<Occurrence> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut occurrences = Vec::with_capacity(raw.len() + exceptions_applied.len() + singletons.len());

    let inputs = raw
        .into_iter()
        .chain(exceptions_applied)
        .chain(singletons.iter().map(RawOccurrence::from));

    for raw in inputs {
        let occurrence = raw.into_occurrence();
        if seen.insert((occurrence.series_id.clone(), occurrence.instance_id.clone())) {
            occurrences.push(occurrence);
        } else {
            tracing::debug!(
                series_id = %occurrence.series_id,
                instance_id = %occurrence.instance_id,
                "Dropping duplicate occurrence"
            );
        }
    }

    occurrences
}

/// ## Summary
/// Sorts occurrences by start, then all-day first, then identity.
pub fn sort_occurrences(occurrences: &mut [Occurrence]) {
    occurrences.sort_by(|a, b| {
        a.entry
            .start
            .to_utc()
            .cmp(&b.entry.start.to_utc())
            .then_with(|| b.is_all_day().cmp(&a.is_all_day()))
            .then_with(|| a.key().cmp(&b.key()))
    });
}
