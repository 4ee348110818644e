//! Suppression of occurrences that were promoted to local records.

use std::collections::{HashMap, HashSet};

use super::interval::parse_instant_text;
use super::occurrence::Occurrence;

/// Identity a local record claims over a feed occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverrideMarker {
    /// The whole event, keyed by its identifier.
    Event { ics_id: String },
    /// One instance of a recurring series.
    Instance {
        base_event_id: String,
        instance_id: String,
    },
}

impl OverrideMarker {
    /// ## Summary
    /// Builds a marker from the identity fields stored on a local record.
    ///
    /// A base event id together with an instance id describes one instance and
    /// takes precedence over the plain event id. Blank fields count as absent.
    #[must_use]
    pub fn from_note_fields(
        ics_id: Option<&str>,
        base_event_id: Option<&str>,
        instance_id: Option<&str>,
    ) -> Option<Self> {
        fn present(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }

        if let (Some(base_event_id), Some(instance_id)) =
            (present(base_event_id), present(instance_id))
        {
            return Some(Self::Instance {
                base_event_id: base_event_id.to_string(),
                instance_id: instance_id.to_string(),
            });
        }

        present(ics_id).map(|ics_id| Self::Event {
            ics_id: ics_id.to_string(),
        })
    }

    /// ## Summary
    /// Returns the canonical `(series_id, instance_id)` key.
    #[must_use]
    pub fn key(&self) -> (String, String) {
        match self {
            Self::Event { ics_id } => (ics_id.trim().to_string(), String::new()),
            Self::Instance {
                base_event_id,
                instance_id,
            } => (
                base_event_id.trim().to_string(),
                canonical_instance_id(instance_id),
            ),
        }
    }
}

/// ## Summary
/// Normalizes an instance identifier to the form occurrences carry.
///
/// Identifiers that do not parse as an instant are returned trimmed.
#[must_use]
pub fn canonical_instance_id(raw: &str) -> String {
    let trimmed = raw.trim();
    parse_instant_text(trimmed).map_or_else(|| trimmed.to_string(), |instant| instant.canonical())
}

/// Set of `(series_id, instance_id)` keys claimed by local records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideIndex {
    keys: HashMap<String, HashSet<String>>,
}

impl OverrideIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key. Returns `false` if it was already present.
    pub fn insert(&mut self, series_id: impl Into<String>, instance_id: impl Into<String>) -> bool {
        self.keys
            .entry(series_id.into())
            .or_default()
            .insert(instance_id.into())
    }

    pub fn insert_marker(&mut self, marker: &OverrideMarker) -> bool {
        let (series_id, instance_id) = marker.key();
        self.insert(series_id, instance_id)
    }

    #[must_use]
    pub fn contains(&self, series_id: &str, instance_id: &str) -> bool {
        self.keys
            .get(series_id)
            .is_some_and(|instances| instances.contains(instance_id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.values().map(HashSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in sorted order.
    #[must_use]
    pub fn sorted_keys(&self) -> Vec<(&str, &str)> {
        let mut keys: Vec<(&str, &str)> = self
            .keys
            .iter()
            .flat_map(|(series_id, instances)| {
                instances
                    .iter()
                    .map(move |instance_id| (series_id.as_str(), instance_id.as_str()))
            })
            .collect();
        keys.sort_unstable();
        keys
    }
}

impl FromIterator<OverrideMarker> for OverrideIndex {
    fn from_iter<I: IntoIterator<Item = OverrideMarker>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl Extend<OverrideMarker> for OverrideIndex {
    fn extend<I: IntoIterator<Item = OverrideMarker>>(&mut self, iter: I) {
        for marker in iter {
            self.insert_marker(&marker);
        }
    }
}

/// ## Summary
/// Drops every occurrence whose identity is in the index, keeping order.
#[must_use]
pub fn filter_overrides(
    occurrences: impl IntoIterator<Item = Occurrence>,
    index: &OverrideIndex,
) -> Vec<Occurrence> {
    occurrences
        .into_iter()
        .filter(|occurrence| !index.contains(&occurrence.series_id, &occurrence.instance_id))
        .collect()
}
