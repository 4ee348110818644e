//! Extraction of series, singletons and exceptions from a parsed calendar.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;
use koyomi_rfc::rfc::ical::core::{
    Component, Date as IcalDate, DateTime as IcalDateTime, DateTimeForm, ICalendar, Property,
    Value, names,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::entry::{CalendarEntry, Exception, Series, Singleton};
use super::expand::{ExpansionLimits, expand_window_with_orphans};
use super::interval::{Instant, Window};
use super::occurrence::Occurrence;
use super::rule::RecurrenceRule;
use super::vtimezone::ZoneDefinition;

/// Reason a single VEVENT was skipped.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("missing DTSTART")]
    MissingStart,

    #[error("invalid {property} value '{raw}'")]
    InvalidValue { property: String, raw: String },

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),
}

/// Resolver for TZID parameters, caching successful lookups.
///
/// Known IANA, alias and Windows names map to a chrono-tz zone. Other
/// identifiers fall back to the VTIMEZONE definitions the feed carries.
#[derive(Debug, Default)]
pub struct TimeZoneResolver {
    cache: HashMap<String, chrono_tz::Tz>,
    defined: HashMap<String, ZoneDefinition>,
}

/// Zone a TZID resolved to.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedZone<'a> {
    Known(chrono_tz::Tz),
    Defined(&'a ZoneDefinition),
}

impl TimeZoneResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Builds a resolver that also knows the calendar's VTIMEZONE components.
    ///
    /// Definitions that cannot be read are logged and skipped.
    #[must_use]
    pub fn for_calendar(calendar: &ICalendar) -> Self {
        let mut resolver = Self::new();
        for component in calendar.timezones() {
            match ZoneDefinition::from_component(component) {
                Ok(zone) => resolver.define(zone),
                Err(err) => tracing::warn!(error = %err, "Skipping VTIMEZONE"),
            }
        }
        resolver
    }

    pub fn define(&mut self, zone: ZoneDefinition) {
        tracing::trace!(tzid = zone.tzid(), "Registered feed timezone");
        self.defined.insert(zone.tzid().to_string(), zone);
    }

    /// ## Summary
    /// Resolves a TZID to an IANA zone.
    ///
    /// ## Errors
    /// Returns `EntryError::UnknownTimezone` if the identifier is not a known zone.
    pub fn resolve(&mut self, tzid: &str) -> Result<chrono_tz::Tz, EntryError> {
        if let Some(tz) = self.cache.get(tzid) {
            return Ok(*tz);
        }

        let tz = chrono_tz::Tz::from_str(&normalize_tzid(tzid))
            .map_err(|_e| EntryError::UnknownTimezone(tzid.to_string()))?;
        self.cache.insert(tzid.to_string(), tz);
        Ok(tz)
    }

    /// ## Summary
    /// Resolves a TZID, falling back to the feed's own definitions.
    ///
    /// ## Errors
    /// Returns `EntryError::UnknownTimezone` if neither a known zone nor a
    /// VTIMEZONE matches.
    pub fn zone(&mut self, tzid: &str) -> Result<ResolvedZone<'_>, EntryError> {
        match self.resolve(tzid) {
            Ok(tz) => Ok(ResolvedZone::Known(tz)),
            Err(err) => self
                .defined
                .get(tzid.trim().trim_matches('"'))
                .map(ResolvedZone::Defined)
                .ok_or(err),
        }
    }
}

fn strip_vendor_prefix(tzid: &str) -> &str {
    let tzid = tzid.trim().trim_matches('"');
    tzid.strip_prefix("/mozilla.org/20070129_1/")
        .or_else(|| tzid.strip_prefix("/mozilla.org/"))
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid)
}

/// ## Summary
/// Maps a TZID to the canonical IANA name.
///
/// Vendor prefixes are stripped. Windows names go through the CLDR mapping
/// and IANA aliases resolve to their canonical zone. Unrecognized names are
/// returned without their prefix.
fn normalize_tzid(tzid: &str) -> String {
    let tzid = strip_vendor_prefix(tzid);
    let iana = IanaParserExtended::new();

    let windows = WindowsParser::new()
        .parse(tzid, None)
        .and_then(|zone| iana.iter().find(|entry| entry.time_zone == zone));
    if let Some(entry) = windows {
        return entry.canonical.to_string();
    }

    let parsed = iana.parse(tzid);
    if parsed.time_zone == icu::time::TimeZone::UNKNOWN {
        tzid.to_string()
    } else {
        parsed.canonical.to_string()
    }
}

/// ## Summary
/// Places a wall-clock time in a zone.
///
/// Ambiguous times take the earlier offset. Times inside a DST gap move
/// forward by one hour.
fn localize(naive: NaiveDateTime, tz: chrono_tz::Tz) -> Option<DateTime<Utc>> {
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => tz
            .from_local_datetime(&naive.checked_add_signed(TimeDelta::hours(1))?)
            .earliest()?,
    };
    Some(local.with_timezone(&Utc))
}

fn to_naive_date(date: &IcalDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        i32::from(date.year),
        u32::from(date.month),
        u32::from(date.day),
    )
}

fn to_naive_datetime(dt: &IcalDateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(u32::from(dt.hour), u32::from(dt.minute), u32::from(dt.second))
}

/// An instant together with the zone its series is evaluated in.
#[derive(Debug, Clone)]
struct Resolved {
    instant: Instant,
    zone: rrule::Tz,
}

fn invalid(property: &Property) -> EntryError {
    EntryError::InvalidValue {
        property: property.name.clone(),
        raw: property.raw_value.clone(),
    }
}

/// Converts a parsed date-time, reading floating times as UTC.
fn resolve_datetime(
    property: &Property,
    dt: &IcalDateTime,
    resolver: &mut TimeZoneResolver,
) -> Result<Resolved, EntryError> {
    let naive = to_naive_datetime(dt).ok_or_else(|| invalid(property))?;

    let (utc, zone) = match &dt.form {
        DateTimeForm::Utc | DateTimeForm::Floating => (naive.and_utc(), rrule::Tz::UTC),
        DateTimeForm::Zoned { tzid } => match resolver.zone(tzid)? {
            ResolvedZone::Known(tz) => {
                let utc = localize(naive, tz).ok_or_else(|| invalid(property))?;
                (utc, rrule::Tz::Tz(tz))
            }
            ResolvedZone::Defined(zone) => {
                let utc = zone.to_utc(naive).ok_or_else(|| invalid(property))?;
                (utc, rrule::Tz::UTC)
            }
        },
    };

    Ok(Resolved {
        instant: Instant::DateTime(utc),
        zone,
    })
}

fn resolve_date(property: &Property, date: &IcalDate) -> Result<Resolved, EntryError> {
    let date = to_naive_date(date).ok_or_else(|| invalid(property))?;
    Ok(Resolved {
        instant: Instant::Date(date),
        zone: rrule::Tz::UTC,
    })
}

/// Resolves a single-valued instant property.
fn resolve_instant(
    property: &Property,
    resolver: &mut TimeZoneResolver,
) -> Result<Resolved, EntryError> {
    match &property.value {
        Value::DateTime(dt) => resolve_datetime(property, dt, resolver),
        Value::Date(date) => resolve_date(property, date),
        _ => Err(invalid(property)),
    }
}

/// Resolves every value of the named list properties (EXDATE, RDATE).
fn resolve_instant_list(
    component: &Component,
    name: &str,
    resolver: &mut TimeZoneResolver,
) -> Result<Vec<Instant>, EntryError> {
    let mut instants = Vec::new();
    for property in component.get_properties(name) {
        match &property.value {
            Value::DateTime(dt) => instants.push(resolve_datetime(property, dt, resolver)?.instant),
            Value::DateTimeList(list) => {
                for dt in list {
                    instants.push(resolve_datetime(property, dt, resolver)?.instant);
                }
            }
            Value::Date(date) => instants.push(resolve_date(property, date)?.instant),
            Value::DateList(list) => {
                for date in list {
                    instants.push(resolve_date(property, date)?.instant);
                }
            }
            _ => {
                tracing::warn!(
                    property = %property.name,
                    raw = %property.raw_value,
                    "Ignoring unsupported date list value"
                );
            }
        }
    }
    Ok(instants)
}

/// Reads the shared entry fields and returns the zone of DTSTART.
fn extract_entry(
    component: &Component,
    resolver: &mut TimeZoneResolver,
) -> Result<(CalendarEntry, rrule::Tz), EntryError> {
    let dtstart = component
        .get_property(names::DTSTART)
        .ok_or(EntryError::MissingStart)?;
    let Resolved { instant: start, zone } = resolve_instant(dtstart, resolver)?;

    let end = if let Some(dtend) = component.get_property(names::DTEND) {
        Some(resolve_instant(dtend, resolver)?.instant)
    } else if let Some(duration) = component.get_property(names::DURATION) {
        let value = duration.as_duration().ok_or_else(|| invalid(duration))?;
        let delta = TimeDelta::seconds(value.total_seconds());
        Some(start.checked_add(delta).ok_or_else(|| invalid(duration))?)
    } else {
        None
    };

    let mut entry = CalendarEntry::new(component.summary().unwrap_or_default(), start);
    entry.end = end;
    entry.description = component.description().map(String::from);

    Ok((entry, zone))
}

/// Identifier for an event, derived from its content when UID is missing.
fn event_uid(component: &Component) -> String {
    if let Some(uid) = component.uid().map(str::trim).filter(|uid| !uid.is_empty()) {
        return uid.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(component.summary().unwrap_or_default().as_bytes());
    hasher.update(b"\n");
    if let Some(dtstart) = component.get_property(names::DTSTART) {
        hasher.update(dtstart.raw_value.as_bytes());
    }
    let uid = hex::encode(hasher.finalize());
    tracing::debug!(uid = %uid, "Derived identifier for event without UID");
    uid
}

enum Master {
    Series(Series),
    Singleton(Singleton),
}

fn extract_master(
    component: &Component,
    uid: String,
    resolver: &mut TimeZoneResolver,
) -> Result<Master, EntryError> {
    let (entry, zone) = extract_entry(component, resolver)?;

    let rrule_text = component
        .get_property(names::RRULE)
        .map(|rrule| rrule.raw_value.as_str());
    let rdates = resolve_instant_list(component, names::RDATE, resolver)?;

    if rrule_text.is_none() && rdates.is_empty() {
        return Ok(Master::Singleton(Singleton::new(uid, entry)));
    }

    let all_day = entry.is_all_day();
    let dt_start = entry.start.to_utc().with_timezone(&zone);
    let rdates = rdates
        .iter()
        .map(|rdate| rdate.to_utc().with_timezone(&zone))
        .collect();
    let rule = RecurrenceRule::build(rrule_text, dt_start, rdates, all_day)
        .map_err(|err| EntryError::InvalidRule(err.to_string()))?;

    let mut series = Series::new(uid, entry, rule);
    series.exclusions = resolve_instant_list(component, names::EXDATE, resolver)?;
    Ok(Master::Series(series))
}

fn extract_exception(
    component: &Component,
    uid: &str,
    resolver: &mut TimeZoneResolver,
) -> Result<Exception, EntryError> {
    let recurrence_id = component
        .get_property(names::RECURRENCE_ID)
        .ok_or(EntryError::MissingStart)?;
    let recurrence_id = resolve_instant(recurrence_id, resolver)?.instant;
    let (entry, _zone) = extract_entry(component, resolver)?;
    let sequence = component
        .get_property(names::SEQUENCE)
        .and_then(Property::as_integer)
        .unwrap_or_default();

    Ok(Exception::new(uid, recurrence_id, entry).with_sequence(sequence))
}

/// Series, singletons and unattached exceptions read from one feed.
#[derive(Debug, Clone, Default)]
pub struct CalendarFeed {
    /// Display name (`X-WR-CALNAME`), when the feed declares one.
    pub name: Option<String>,
    pub series: Vec<Series>,
    pub singletons: Vec<Singleton>,
    /// Exceptions whose series is not part of the feed.
    pub orphans: Vec<Exception>,
}

impl CalendarFeed {
    /// ## Summary
    /// Reads every VEVENT of a parsed calendar.
    ///
    /// Events are grouped by UID. A VEVENT with RECURRENCE-ID is an exception;
    /// one with RRULE or RDATE is a series; anything else is a singleton. An
    /// event that cannot be read is logged and skipped without affecting its
    /// siblings.
    #[must_use]
    pub fn from_calendar(calendar: &ICalendar) -> Self {
        let mut resolver = TimeZoneResolver::for_calendar(calendar);
        let mut feed = Self {
            name: calendar.name().map(String::from),
            ..Self::default()
        };
        let mut series_by_uid: HashMap<String, usize> = HashMap::new();
        let mut exceptions: Vec<Exception> = Vec::new();

        for component in calendar.events() {
            let uid = event_uid(component);

            if component.is_recurrence_exception() {
                match extract_exception(component, &uid, &mut resolver) {
                    Ok(exception) => exceptions.push(exception),
                    Err(err) => {
                        tracing::warn!(uid = %uid, error = %err, "Skipping recurrence exception");
                    }
                }
                continue;
            }

            match extract_master(component, uid.clone(), &mut resolver) {
                Ok(Master::Series(series)) => {
                    series_by_uid.entry(uid).or_insert(feed.series.len());
                    feed.series.push(series);
                }
                Ok(Master::Singleton(singleton)) => feed.singletons.push(singleton),
                Err(err) => {
                    tracing::warn!(uid = %uid, error = %err, "Skipping event");
                }
            }
        }

        for exception in exceptions {
            match series_by_uid.get(&exception.series_id) {
                Some(&index) => feed.series[index].exceptions.push(exception),
                None => feed.orphans.push(exception),
            }
        }

        tracing::debug!(
            series = feed.series.len(),
            singletons = feed.singletons.len(),
            orphans = feed.orphans.len(),
            "Extracted calendar feed"
        );

        feed
    }

    /// ## Summary
    /// Expands the feed into identified occurrences within `window`.
    #[must_use]
    pub fn expand(&self, window: &Window, limits: ExpansionLimits) -> Vec<Occurrence> {
        expand_window_with_orphans(
            &self.series,
            &self.singletons,
            &self.orphans,
            window,
            limits,
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len() + self.singletons.len() + self.orphans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
