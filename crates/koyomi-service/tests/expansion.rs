use std::cell::Cell;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use koyomi_rfc::rfc::ical::parse::{ComponentParser, IcalParser};
use koyomi_service::calendar::{
    CalendarEntry, CalendarFeed, CandidateRule, Exception, ExpansionLimits, Instant,
    OverrideIndex, OverrideMarker, Provenance, Series, Singleton, Window, expand, expand_window,
    filter_overrides,
};

include!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/expansion_cases_data/mod.rs"
));

fn utc(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
}

fn date(y: i32, m: u32, d: u32) -> Instant {
    Instant::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

/// Every week from `first`, without end.
#[derive(Debug)]
struct Weekly {
    first: DateTime<Utc>,
}

impl CandidateRule for Weekly {
    fn candidates(&self) -> Box<dyn Iterator<Item = Instant> + '_> {
        let first = self.first;
        Box::new((0_i64..).map(move |week| Instant::DateTime(first + TimeDelta::weeks(week))))
    }
}

/// Unbounded hourly rule that counts how many candidates were pulled.
#[derive(Debug, Default)]
struct CountingRule {
    pulled: Cell<usize>,
}

impl CandidateRule for CountingRule {
    fn candidates(&self) -> Box<dyn Iterator<Item = Instant> + '_> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Box::new((0_i64..).map(move |hour| {
            self.pulled.set(self.pulled.get() + 1);
            Instant::DateTime(start + TimeDelta::hours(hour))
        }))
    }
}

fn at(text: &str) -> Instant {
    Instant::DateTime(utc(text))
}

fn weekly_series() -> Series<Weekly> {
    Series::new(
        "weekly",
        CalendarEntry::new("Planning", at("2024-01-01T09:00:00Z"))
            .with_end(at("2024-01-01T10:00:00Z")),
        Weekly {
            first: utc("2024-01-01T09:00:00Z"),
        },
    )
}

fn first_half_of_january() -> Window {
    Window::between(utc("2024-01-01T00:00:00Z"), utc("2024-01-15T00:00:00Z"))
}

#[test_log::test]
fn expansion_cases_match() {
    let parser = IcalParser;

    for case in expansion_cases() {
        let input = format!("BEGIN:VCALENDAR\nVERSION:2.0\n{}END:VCALENDAR\n", case.events);
        let calendar = parser.parse(&input).unwrap();
        let feed = CalendarFeed::from_calendar(&calendar);
        let window = Window::between(utc(case.from), utc(case.to));

        let actual: Vec<(String, String, String)> = feed
            .expand(&window, ExpansionLimits::default())
            .into_iter()
            .map(|o| (o.series_id, o.instance_id, o.entry.title))
            .collect();
        let expected: Vec<(String, String, String)> = case
            .expected
            .iter()
            .map(|(s, i, t)| ((*s).to_string(), (*i).to_string(), (*t).to_string()))
            .collect();

        assert_eq!(actual, expected, "case {}", case.name);
    }
}

#[test]
fn exception_substitutes_its_instance() {
    let series = weekly_series().with_exception(Exception::new(
        "weekly",
        at("2024-01-08T09:00:00Z"),
        CalendarEntry::new("Rescheduled", at("2024-01-09T14:00:00Z"))
            .with_end(at("2024-01-09T15:00:00Z")),
    ));

    let occurrences = expand_window(
        &[series],
        &[],
        &first_half_of_january(),
        ExpansionLimits::default(),
    );

    let titles: Vec<_> = occurrences.iter().map(|o| o.entry.title.as_str()).collect();
    assert_eq!(titles, ["Planning", "Rescheduled"]);
    assert_eq!(occurrences[1].provenance, Provenance::Exception);
    assert_eq!(occurrences[1].instance_id, "2024-01-08T09:00:00Z");
    assert_eq!(occurrences[1].entry.start, at("2024-01-09T14:00:00Z"));
    assert_eq!(
        occurrences
            .iter()
            .filter(|o| o.instance_id == "2024-01-08T09:00:00Z")
            .count(),
        1
    );
}

#[test]
fn exclusion_removes_instance() {
    let series = weekly_series().with_exclusion(at("2024-01-08T09:00:00Z"));

    let occurrences = expand_window(
        &[series],
        &[],
        &first_half_of_january(),
        ExpansionLimits::default(),
    );

    let ids: Vec<_> = occurrences.iter().map(|o| o.instance_id.as_str()).collect();
    assert_eq!(ids, ["2024-01-01T09:00:00Z"]);
}

#[test]
fn exclusion_also_suppresses_exception() {
    let series = weekly_series()
        .with_exclusion(at("2024-01-08T09:00:00Z"))
        .with_exception(Exception::new(
            "weekly",
            at("2024-01-08T09:00:00Z"),
            CalendarEntry::new("Rescheduled", at("2024-01-09T09:00:00Z")),
        ));

    let expansion = expand(&series, &first_half_of_january(), ExpansionLimits::default());
    assert!(expansion.exceptions_applied.is_empty());
    assert_eq!(expansion.occurrences.len(), 1);
}

#[test]
fn unbounded_rule_stops_at_iteration_limit() {
    let series = Series::new(
        "hourly",
        CalendarEntry::new("Ping", Instant::DateTime(utc("2024-01-01T00:00:00Z"))),
        CountingRule::default(),
    );

    let expansion = expand(&series, &Window::unbounded(), ExpansionLimits::new(100));

    assert_eq!(series.rule.pulled.get(), 100);
    assert_eq!(expansion.occurrences.len(), 100);
}

#[test]
fn window_far_ahead_is_truncated_silently() {
    let series = Series::new(
        "hourly",
        CalendarEntry::new("Ping", Instant::DateTime(utc("2024-01-01T00:00:00Z"))),
        CountingRule::default(),
    );

    let window = Window::after(utc("2030-01-01T00:00:00Z"));
    let expansion = expand(&series, &window, ExpansionLimits::new(100));

    assert!(expansion.occurrences.is_empty());
    assert!(series.rule.pulled.get() <= 100);
}

#[test]
fn all_day_boundary() {
    let holiday = [Singleton::new(
        "holiday",
        CalendarEntry::new("Holiday", date(2024, 1, 8)).with_end(date(2024, 1, 9)),
    )];

    let same_day = Window::between(utc("2024-01-08T00:00:00Z"), utc("2024-01-08T23:59:59Z"));
    let next_day = Window::after(utc("2024-01-09T00:00:00Z"));

    let included = expand_window::<Weekly>(&[], &holiday, &same_day, ExpansionLimits::default());
    let excluded = expand_window::<Weekly>(&[], &holiday, &next_day, ExpansionLimits::default());

    assert_eq!(included.len(), 1);
    assert!(included[0].is_all_day());
    assert!(excluded.is_empty());
}

#[test]
fn singletons_are_returned_exactly_when_overlapping() {
    let singletons = [
        Singleton::new(
            "inside",
            CalendarEntry::new("Inside", Instant::DateTime(utc("2024-01-05T10:00:00Z"))),
        ),
        Singleton::new(
            "straddling",
            CalendarEntry::new("Straddling", Instant::DateTime(utc("2023-12-31T23:00:00Z")))
                .with_end(Instant::DateTime(utc("2024-01-01T01:00:00Z"))),
        ),
        Singleton::new(
            "after",
            CalendarEntry::new("After", Instant::DateTime(utc("2024-01-15T00:00:01Z"))),
        ),
    ];

    let occurrences = expand_window::<Weekly>(
        &[],
        &singletons,
        &first_half_of_january(),
        ExpansionLimits::default(),
    );

    let ids: Vec<_> = occurrences.iter().map(|o| o.series_id.as_str()).collect();
    assert_eq!(ids, ["straddling", "inside"]);
    assert!(occurrences.iter().all(|o| o.instance_id.is_empty()));
}

#[test]
fn filter_never_returns_indexed_identities() {
    let mut occurrences = expand_window(
        &[weekly_series()],
        &[Singleton::new(
            "lunch",
            CalendarEntry::new("Lunch", Instant::DateTime(utc("2024-01-03T12:00:00Z"))),
        )],
        &first_half_of_january(),
        ExpansionLimits::default(),
    );
    assert_eq!(occurrences.len(), 3);

    let index: OverrideIndex = [
        OverrideMarker::from_note_fields(None, Some("weekly"), Some("20240108T090000Z")).unwrap(),
        OverrideMarker::from_note_fields(Some("lunch"), None, None).unwrap(),
    ]
    .into_iter()
    .collect();

    for _ in 0..2 {
        occurrences.reverse();
        let filtered = filter_overrides(occurrences.clone(), &index);
        assert!(
            filtered
                .iter()
                .all(|o| !index.contains(&o.series_id, &o.instance_id))
        );

        let ids: Vec<_> = filtered.iter().map(|o| o.instance_id.as_str()).collect();
        assert_eq!(ids, ["2024-01-01T09:00:00Z"]);

        assert_eq!(filter_overrides(filtered.clone(), &index), filtered);
    }
}
