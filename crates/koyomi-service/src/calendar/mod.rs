//! Calendar feed expansion and override reconciliation.

pub mod entry;
pub mod expand;
pub mod extract;
pub mod interval;
pub mod occurrence;
pub mod overrides;
pub mod rule;
pub mod vtimezone;

pub use entry::{CalendarEntry, Exception, Series, Singleton};
pub use expand::{Expansion, ExpansionLimits, expand, expand_window};
pub use extract::{CalendarFeed, EntryError, ResolvedZone, TimeZoneResolver};
pub use interval::{Instant, Window, parse_instant_text};
pub use occurrence::{Occurrence, Provenance, RawOccurrence, reconcile, sort_occurrences};
pub use overrides::{OverrideIndex, OverrideMarker, canonical_instance_id, filter_overrides};
pub use rule::{CandidateRule, RecurrenceRule};
pub use vtimezone::{UtcOffset, ZoneDefinition, ZoneDefinitionError};
