//! Zones declared by VTIMEZONE components inside a feed.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use koyomi_rfc::rfc::ical::core::{Component, ComponentKind, Property, names};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};
use thiserror::Error;

use super::rule::normalize_until;

const TZOFFSETTO: &str = "TZOFFSETTO";
const TZOFFSETFROM: &str = "TZOFFSETFROM";

#[derive(Debug, Error)]
pub enum ZoneDefinitionError {
    #[error("VTIMEZONE without TZID")]
    MissingTzid,

    #[error("VTIMEZONE {0} declares no STANDARD or DAYLIGHT rules")]
    NoRules(String),

    #[error("{kind} rule is missing {property}")]
    MissingProperty {
        kind: ComponentKind,
        property: &'static str,
    },

    #[error("invalid {property} value '{raw}'")]
    InvalidValue { property: &'static str, raw: String },

    #[error("invalid observance rule '{raw}': {reason}")]
    InvalidRule { raw: String, reason: String },
}

/// Offset from UTC in seconds, positive east of Greenwich.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset(i32);

impl UtcOffset {
    #[must_use]
    pub const fn seconds(self) -> i32 {
        self.0
    }

    /// Parses `+HHMM` or `-HHMMSS`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (sign, digits) = match text.trim().split_at_checked(1)? {
            ("+", digits) => (1, digits),
            ("-", digits) => (-1, digits),
            _ => return None,
        };
        if !matches!(digits.len(), 4 | 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let field = |at: usize| digits.get(at..at + 2)?.parse::<i32>().ok();
        let hours = field(0)?;
        let minutes = field(2)?;
        let seconds = if digits.len() == 6 { field(4)? } else { 0 };
        if minutes > 59 || seconds > 59 {
            return None;
        }
        Some(Self(sign * (hours * 3600 + minutes * 60 + seconds)))
    }
}

/// One STANDARD or DAYLIGHT block.
#[derive(Debug, Clone)]
struct Observance {
    start: NaiveDateTime,
    offset_from: UtcOffset,
    offset_to: UtcOffset,
    /// Later onsets from RRULE and RDATE, evaluated on the local time line.
    onsets: Option<RRuleSet>,
}

impl Observance {
    fn from_component(component: &Component) -> Result<Self, ZoneDefinitionError> {
        let required = |property: &'static str| {
            component
                .get_property(property)
                .ok_or(ZoneDefinitionError::MissingProperty {
                    kind: component.kind,
                    property,
                })
        };
        let offset = |property: &'static str| -> Result<UtcOffset, ZoneDefinitionError> {
            let raw = &required(property)?.raw_value;
            UtcOffset::parse(raw).ok_or_else(|| ZoneDefinitionError::InvalidValue {
                property,
                raw: raw.clone(),
            })
        };

        let start_raw = &required(names::DTSTART)?.raw_value;
        let start = parse_local(start_raw).ok_or_else(|| ZoneDefinitionError::InvalidValue {
            property: names::DTSTART,
            raw: start_raw.clone(),
        })?;

        let mut observance = Self {
            start,
            offset_from: offset(TZOFFSETFROM)?,
            offset_to: offset(TZOFFSETTO)?,
            onsets: None,
        };
        observance.onsets = observance.build_onsets(component)?;
        Ok(observance)
    }

    fn build_onsets(&self, component: &Component) -> Result<Option<RRuleSet>, ZoneDefinitionError> {
        let dt_start = Tz::UTC.from_utc_datetime(&self.start);
        let rdates = component
            .get_properties(names::RDATE)
            .into_iter()
            .flat_map(|rdate| rdate.raw_value.split(','))
            .map(|raw| {
                parse_local(raw)
                    .map(|local| Tz::UTC.from_utc_datetime(&local))
                    .ok_or_else(|| ZoneDefinitionError::InvalidValue {
                        property: names::RDATE,
                        raw: raw.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let set = match component.get_property(names::RRULE) {
            Some(rrule) => Some(build_rule(rrule, dt_start)?),
            None if rdates.is_empty() => None,
            None => Some(RRuleSet::new(dt_start)),
        };
        Ok(set.map(|set| if rdates.is_empty() { set } else { set.set_rdates(rdates) }))
    }

    /// Latest onset of this observance at or before `local`.
    fn latest_onset(&self, local: NaiveDateTime) -> Option<NaiveDateTime> {
        if local < self.start {
            return None;
        }
        let Some(onsets) = &self.onsets else {
            return Some(self.start);
        };
        let latest = onsets
            .into_iter()
            .map(|onset| onset.naive_utc())
            .take_while(|onset| *onset <= local)
            .last();
        Some(latest.map_or(self.start, |onset| onset.max(self.start)))
    }
}

fn build_rule(rrule: &Property, dt_start: DateTime<Tz>) -> Result<RRuleSet, ZoneDefinitionError> {
    let invalid = |reason: String| ZoneDefinitionError::InvalidRule {
        raw: rrule.raw_value.clone(),
        reason,
    };
    normalize_until(&rrule.raw_value, Tz::UTC)
        .parse::<RRule<Unvalidated>>()
        .map_err(|err| invalid(err.to_string()))?
        .build(dt_start)
        .map_err(|err| invalid(err.to_string()))
}

fn parse_local(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_end_matches(['Z', 'z']);
    NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S").ok()
}

/// A zone whose offsets come from the feed itself.
#[derive(Debug, Clone)]
pub struct ZoneDefinition {
    tzid: String,
    observances: Vec<Observance>,
}

impl ZoneDefinition {
    /// ## Summary
    /// Reads a VTIMEZONE component.
    ///
    /// ## Errors
    /// Fails when TZID is missing, no observance is declared, or an
    /// observance lacks a valid DTSTART, TZOFFSETFROM or TZOFFSETTO.
    pub fn from_component(component: &Component) -> Result<Self, ZoneDefinitionError> {
        let tzid = component
            .get_property(names::TZID)
            .map(|tzid| tzid.raw_value.trim().to_string())
            .filter(|tzid| !tzid.is_empty())
            .ok_or(ZoneDefinitionError::MissingTzid)?;

        let observances = component
            .children
            .iter()
            .filter(|child| matches!(child.kind, ComponentKind::Standard | ComponentKind::Daylight))
            .map(Observance::from_component)
            .collect::<Result<Vec<_>, _>>()?;
        if observances.is_empty() {
            return Err(ZoneDefinitionError::NoRules(tzid));
        }

        Ok(Self { tzid, observances })
    }

    #[must_use]
    pub fn tzid(&self) -> &str {
        &self.tzid
    }

    /// ## Summary
    /// Offset in effect at a wall-clock time.
    ///
    /// Before the first onset the zone uses the earliest observance's
    /// TZOFFSETFROM.
    #[must_use]
    pub fn offset_at(&self, local: NaiveDateTime) -> UtcOffset {
        let current = self
            .observances
            .iter()
            .filter_map(|observance| Some((observance.latest_onset(local)?, observance.offset_to)))
            .max_by_key(|(onset, _)| *onset);
        if let Some((_, offset)) = current {
            return offset;
        }
        self.observances
            .iter()
            .min_by_key(|observance| observance.start)
            .map_or(UtcOffset(0), |observance| observance.offset_from)
    }

    /// Converts a wall-clock time in this zone to UTC.
    #[must_use]
    pub fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        let offset = TimeDelta::seconds(i64::from(self.offset_at(local).seconds()));
        Some(local.checked_sub_signed(offset)?.and_utc())
    }
}
