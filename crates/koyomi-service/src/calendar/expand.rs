//! Bounded recurrence expansion within a query window.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use koyomi_core::config::ExpansionConfig;
use koyomi_core::constants::DEFAULT_MAX_ITERATIONS;

use super::entry::{Exception, Series, Singleton};
use super::interval::{Instant, Window};
use super::occurrence::{Occurrence, RawOccurrence, reconcile, sort_occurrences};
use super::rule::CandidateRule;

/// Safety bound on rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionLimits {
    /// Maximum number of candidates pulled from a rule per series.
    pub max_iterations: usize,
}

impl ExpansionLimits {
    #[must_use]
    pub const fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl Default for ExpansionLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS as usize)
    }
}

impl From<&ExpansionConfig> for ExpansionLimits {
    fn from(config: &ExpansionConfig) -> Self {
        Self::new(config.max_iterations as usize)
    }
}

/// Result of expanding one series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Base entry instances shifted onto rule candidates.
    pub occurrences: Vec<RawOccurrence>,
    /// Exceptions that replaced a candidate or were added outright.
    pub exceptions_applied: Vec<RawOccurrence>,
}

/// Indexes exceptions by the instant they replace.
///
/// The highest sequence wins; on equal sequence the later exception wins.
fn index_exceptions(exceptions: &[Exception]) -> HashMap<Instant, &Exception> {
    let mut index: HashMap<Instant, &Exception> = HashMap::with_capacity(exceptions.len());
    for exception in exceptions {
        match index.entry(exception.recurrence_id) {
            Entry::Vacant(slot) => {
                slot.insert(exception);
            }
            Entry::Occupied(mut slot) => {
                if exception.sequence >= slot.get().sequence {
                    slot.insert(exception);
                }
            }
        }
    }
    index
}

fn exception_occurrence(exception: &Exception) -> RawOccurrence {
    RawOccurrence::Exception {
        series_id: exception.series_id.clone(),
        recurrence_id: exception.recurrence_id,
        entry: exception.entry.clone(),
    }
}

/// ## Summary
/// Expands a series into the instances that overlap `window`.
///
/// Candidates are pulled from the rule until it is exhausted, a candidate
/// starts after the window end, or `limits.max_iterations` candidates have
/// been evaluated. Hitting the bound truncates silently.
///
/// Excluded candidates are dropped together with any exception for them.
/// Exceptions never reached by a candidate are added when they overlap.
#[must_use]
pub fn expand<R: CandidateRule>(
    series: &Series<R>,
    window: &Window,
    limits: ExpansionLimits,
) -> Expansion {
    let exclusions: HashSet<Instant> = series.exclusions.iter().copied().collect();
    let mut pending = index_exceptions(&series.exceptions);
    let mut expansion = Expansion::default();

    let mut candidates = series.rule.candidates();
    let mut evaluated: usize = 0;

    loop {
        evaluated += 1;
        if evaluated > limits.max_iterations {
            tracing::debug!(
                uid = %series.uid,
                max_iterations = limits.max_iterations,
                "Recurrence expansion truncated"
            );
            break;
        }

        let Some(candidate) = candidates.next() else {
            break;
        };

        if window.end.is_some_and(|end| candidate.to_utc() > end) {
            break;
        }

        if exclusions.contains(&candidate) {
            pending.remove(&candidate);
            continue;
        }

        if let Some(exception) = pending.remove(&candidate) {
            if exception.entry.overlaps(window) {
                expansion
                    .exceptions_applied
                    .push(exception_occurrence(exception));
            }
            continue;
        }

        let Some(entry) = series.base.moved_to(candidate) else {
            tracing::warn!(uid = %series.uid, candidate = %candidate, "Occurrence end out of range");
            continue;
        };

        if entry.overlaps(window) {
            expansion.occurrences.push(RawOccurrence::Series {
                series_id: series.uid.clone(),
                recurrence_id: candidate,
                entry,
            });
        }
    }

    let mut unmatched: Vec<&Exception> = pending
        .into_values()
        .filter(|exception| !exclusions.contains(&exception.recurrence_id))
        .filter(|exception| exception.entry.overlaps(window))
        .collect();
    unmatched.sort_by_key(|exception| (exception.recurrence_id.to_utc(), !exception.recurrence_id.is_date()));
    expansion
        .exceptions_applied
        .extend(unmatched.into_iter().map(exception_occurrence));

    tracing::trace!(
        uid = %series.uid,
        evaluated = evaluated.min(limits.max_iterations),
        occurrences = expansion.occurrences.len(),
        exceptions = expansion.exceptions_applied.len(),
        "Expanded series"
    );

    expansion
}

/// ## Summary
/// Expands every series, keeps overlapping singletons and reconciles the
/// result into identified occurrences sorted by start.
#[must_use]
pub fn expand_window<R: CandidateRule>(
    series: &[Series<R>],
    singletons: &[Singleton],
    window: &Window,
    limits: ExpansionLimits,
) -> Vec<Occurrence> {
    expand_window_with_orphans(series, singletons, &[], window, limits)
}

/// Like [`expand_window`], also adding exceptions that belong to no series.
pub(crate) fn expand_window_with_orphans<R: CandidateRule>(
    series: &[Series<R>],
    singletons: &[Singleton],
    orphans: &[Exception],
    window: &Window,
    limits: ExpansionLimits,
) -> Vec<Occurrence> {
    let mut raw = Vec::new();
    let mut exceptions_applied = Vec::new();

    for series in series {
        let expansion = expand(series, window, limits);
        raw.extend(expansion.occurrences);
        exceptions_applied.extend(expansion.exceptions_applied);
    }

    exceptions_applied.extend(
        orphans
            .iter()
            .filter(|orphan| orphan.entry.overlaps(window))
            .map(exception_occurrence),
    );

    let visible: Vec<Singleton> = singletons
        .iter()
        .filter(|singleton| singleton.entry.overlaps(window))
        .cloned()
        .collect();

    let mut occurrences = reconcile(raw, exceptions_applied, &visible);
    sort_occurrences(&mut occurrences);
    occurrences
}
