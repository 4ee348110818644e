//! Recurrence rule evaluation.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};

use super::interval::Instant;

/// Source of candidate start instants for a series.
///
/// Implementations yield candidates in non-decreasing order and may be
/// unbounded; the expander decides how many it pulls.
pub trait CandidateRule: std::fmt::Debug {
    fn candidates(&self) -> Box<dyn Iterator<Item = Instant> + '_>;
}

/// Candidate rule backed by an `rrule` recurrence set.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    set: RRuleSet,
    all_day: bool,
}

impl RecurrenceRule {
    /// Wraps an already built set. `all_day` makes candidates dates.
    #[must_use]
    pub const fn new(set: RRuleSet, all_day: bool) -> Self {
        Self { set, all_day }
    }

    /// ## Summary
    /// Builds a rule from RRULE text, RDATE values and the series start.
    ///
    /// `dt_start` carries the zone the rule is evaluated in. When there is no
    /// RRULE the start itself becomes the first explicit date.
    ///
    /// A date or floating `UNTIL` is read in the zone of `dt_start` and
    /// rewritten as UTC before the rule is validated.
    ///
    /// ## Errors
    /// Returns an error if the RRULE text does not parse or fails validation
    /// against the start.
    pub fn build(
        rrule_text: Option<&str>,
        dt_start: DateTime<Tz>,
        rdates: Vec<DateTime<Tz>>,
        all_day: bool,
    ) -> Result<Self, rrule::RRuleError> {
        let set = match rrule_text {
            Some(text) => {
                let text = normalize_until(text, dt_start.timezone());
                tracing::trace!(rrule = %text, "Building recurrence set");
                let rrule = text.parse::<RRule<Unvalidated>>()?;
                let set = rrule.build(dt_start)?;
                if rdates.is_empty() {
                    set
                } else {
                    set.set_rdates(rdates)
                }
            }
            None => {
                let mut dates = Vec::with_capacity(rdates.len() + 1);
                dates.push(dt_start);
                dates.extend(rdates);
                dates.sort();
                dates.dedup();
                RRuleSet::new(dt_start).set_rdates(dates)
            }
        };

        Ok(Self::new(set, all_day))
    }

    #[must_use]
    pub const fn is_all_day(&self) -> bool {
        self.all_day
    }
}

/// ## Summary
/// Rewrites a local `UNTIL` bound as a UTC instant.
///
/// A date bound covers its whole day. A floating date-time is taken as wall
/// clock time in `zone`. Text without a local bound is returned unchanged.
pub(super) fn normalize_until(rrule_text: &str, zone: Tz) -> Cow<'_, str> {
    let mut rewritten = false;
    let parts: Vec<Cow<'_, str>> = rrule_text
        .split(';')
        .map(|part| {
            let Some((key, value)) = part.split_once('=') else {
                return Cow::Borrowed(part);
            };
            if !key.trim().eq_ignore_ascii_case("UNTIL") {
                return Cow::Borrowed(part);
            }
            match local_until_to_utc(value.trim(), zone) {
                Some(until) => {
                    rewritten = true;
                    Cow::Owned(format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")))
                }
                None => Cow::Borrowed(part),
            }
        })
        .collect();

    if rewritten {
        Cow::Owned(parts.join(";"))
    } else {
        Cow::Borrowed(rrule_text)
    }
}

fn local_until_to_utc(value: &str, zone: Tz) -> Option<DateTime<Utc>> {
    if value.ends_with(['Z', 'z']) {
        return None;
    }
    let local = if value.contains(['T', 't']) {
        NaiveDateTime::parse_from_str(&value.to_ascii_uppercase(), "%Y%m%dT%H%M%S").ok()?
    } else {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()?
            .and_hms_opt(23, 59, 59)?
    };
    zone.from_local_datetime(&local)
        .earliest()
        .map(|until| until.with_timezone(&Utc))
}

impl CandidateRule for RecurrenceRule {
    fn candidates(&self) -> Box<dyn Iterator<Item = Instant> + '_> {
        let all_day = self.all_day;
        Box::new((&self.set).into_iter().map(move |dt| {
            if all_day {
                Instant::Date(dt.date_naive())
            } else {
                Instant::DateTime(dt.with_timezone(&Utc))
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_rule_yields_utc_candidates() {
        let start = Tz::UTC.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let rule = RecurrenceRule::build(Some("FREQ=WEEKLY;COUNT=3"), start, Vec::new(), false)
            .unwrap();

        let candidates: Vec<_> = rule.candidates().collect();
        assert_eq!(
            candidates,
            vec![
                Instant::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
                Instant::DateTime(Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()),
                Instant::DateTime(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()),
            ]
        );
    }

    #[test]
    fn all_day_rule_yields_dates() {
        let start = Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rule =
            RecurrenceRule::build(Some("FREQ=DAILY;COUNT=2"), start, Vec::new(), true).unwrap();

        let candidates: Vec<_> = rule.candidates().collect();
        assert_eq!(
            candidates,
            vec![
                Instant::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                Instant::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            ]
        );
    }

    #[test]
    fn zoned_rule_keeps_wall_clock_across_dst() {
        let zone = Tz::Tz(chrono_tz::America::New_York);
        let start = zone.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let rule =
            RecurrenceRule::build(Some("FREQ=WEEKLY;COUNT=2"), start, Vec::new(), false).unwrap();

        let candidates: Vec<_> = rule.candidates().collect();
        assert_eq!(
            candidates,
            vec![
                Instant::DateTime(Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap()),
                Instant::DateTime(Utc.with_ymd_and_hms(2024, 3, 11, 13, 0, 0).unwrap()),
            ]
        );
    }

    #[test]
    fn rdate_only_series_includes_start() {
        let start = Tz::UTC.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let extra = Tz::UTC.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let rule = RecurrenceRule::build(None, start, vec![extra], false).unwrap();

        assert_eq!(rule.candidates().count(), 2);
    }

    #[test]
    fn date_until_includes_last_day() {
        let start = Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rule = RecurrenceRule::build(
            Some("FREQ=WEEKLY;UNTIL=20240115"),
            start,
            Vec::new(),
            true,
        )
        .unwrap();

        let candidates: Vec<_> = rule.candidates().collect();
        assert_eq!(
            candidates,
            vec![
                Instant::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                Instant::Date(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()),
                Instant::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            ]
        );
    }

    #[test]
    fn floating_until_is_read_in_start_zone() {
        let zone = Tz::Tz(chrono_tz::Europe::Berlin);
        let start = zone.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let rule = RecurrenceRule::build(
            Some("FREQ=WEEKLY;UNTIL=20240115T090000"),
            start,
            Vec::new(),
            false,
        )
        .unwrap();

        let candidates: Vec<_> = rule.candidates().collect();
        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates.last(),
            Some(&Instant::DateTime(
                Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn until_rewrite_leaves_utc_bounds_alone() {
        let text = "FREQ=DAILY;UNTIL=20240115T090000Z";
        assert!(matches!(normalize_until(text, Tz::UTC), Cow::Borrowed(_)));
        assert_eq!(
            normalize_until("FREQ=DAILY;until=20240115;INTERVAL=2", Tz::UTC),
            "FREQ=DAILY;UNTIL=20240115T235959Z;INTERVAL=2"
        );
        assert_eq!(
            normalize_until(
                "FREQ=DAILY;UNTIL=20240115T090000",
                Tz::Tz(chrono_tz::America::New_York)
            ),
            "FREQ=DAILY;UNTIL=20240115T140000Z"
        );
    }

    #[test]
    fn invalid_rule_is_rejected() {
        let start = Tz::UTC.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert!(RecurrenceRule::build(Some("FREQ=SOMETIMES"), start, Vec::new(), false).is_err());
    }
}
