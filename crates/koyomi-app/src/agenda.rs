use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use koyomi_core::config::Settings;
use koyomi_rfc::rfc::ical::parse::IcalParser;
use koyomi_service::cache::{CachePolicy, FeedCache, FeedSnapshot, FeedSource, HttpTransport};
use koyomi_service::calendar::{
    ExpansionLimits, Occurrence, RecurrenceRule, Window, expand_window, filter_overrides,
};
use serde::Serialize;

use crate::cli::AgendaArgs;
use crate::notes::{LocalNotes, scan_notes};

/// Days shown when `--to` is omitted.
pub const DEFAULT_AGENDA_DAYS: i64 = 7;

/// Source name of events read from the notes folder.
pub const NOTES_SOURCE: &str = "notes";

/// One line of the agenda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItem {
    pub source: String,
    pub all_day: bool,
    #[serde(flatten)]
    pub occurrence: Occurrence,
}

/// A feed whose occurrences could not be refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedNotice {
    pub feed: String,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Agenda {
    pub items: Vec<AgendaItem>,
    pub notices: Vec<FeedNotice>,
}

/// ## Summary
/// Resolves the displayed window from the command line.
///
/// `--from` defaults to `today`, `--to` to `DEFAULT_AGENDA_DAYS` after
/// `--from`. Both days are included in full.
///
/// ## Errors
/// Returns an error if `--to` is before `--from`.
pub fn agenda_window(args: &AgendaArgs, today: NaiveDate) -> Result<Window> {
    let from = args.from.unwrap_or(today);
    let to = args
        .to
        .unwrap_or_else(|| from + TimeDelta::days(DEFAULT_AGENDA_DAYS));
    anyhow::ensure!(to >= from, "--to ({to}) is before --from ({from})");

    let start = from.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = (to + TimeDelta::days(1)).and_time(chrono::NaiveTime::MIN).and_utc()
        - TimeDelta::seconds(1);
    Ok(Window::between(start, end))
}

/// ## Summary
/// Cache policy from `settings`, widened so the expansion horizon covers `window`.
#[must_use]
pub fn policy_for(settings: &Settings, window: &Window, now: DateTime<Utc>) -> CachePolicy {
    let mut policy = CachePolicy::from_settings(settings);

    if let (Some(start), Some(past)) = (window.start, policy.past) {
        policy.past = Some(past.max(now - start));
    }
    if let (Some(end), Some(future)) = (window.end, policy.future) {
        policy.future = Some(future.max(end - now));
    }
    policy
}

/// ## Summary
/// Merges feed snapshots with local notes into a sorted agenda.
///
/// Feed occurrences claimed by a note are dropped. Only occurrences
/// overlapping `window` are kept.
#[must_use]
pub fn assemble(
    feeds: Vec<(FeedSource, FeedSnapshot)>,
    notes: &LocalNotes,
    window: &Window,
    limits: ExpansionLimits,
) -> Agenda {
    let mut agenda = Agenda::default();

    for (source, snapshot) in feeds {
        if snapshot.is_stale || snapshot.error.is_some() {
            agenda.notices.push(FeedNotice {
                feed: source.name.clone(),
                stale: snapshot.is_stale,
                fetched_at: snapshot.fetched_at,
                error: snapshot.error.as_ref().map(ToString::to_string),
            });
        }

        let visible = snapshot
            .occurrences
            .iter()
            .filter(|occurrence| occurrence.entry.overlaps(window))
            .cloned();
        agenda.items.extend(
            filter_overrides(visible, &notes.overrides)
                .into_iter()
                .map(|occurrence| AgendaItem {
                    source: source.name.clone(),
                    all_day: occurrence.is_all_day(),
                    occurrence,
                }),
        );
    }

    let local = expand_window::<RecurrenceRule>(&[], &notes.events, window, limits);
    agenda
        .items
        .extend(local.into_iter().map(|occurrence| AgendaItem {
            source: NOTES_SOURCE.to_string(),
            all_day: occurrence.is_all_day(),
            occurrence,
        }));

    agenda.items.sort_by(|a, b| {
        a.occurrence
            .entry
            .start
            .to_utc()
            .cmp(&b.occurrence.entry.start.to_utc())
            .then_with(|| b.all_day.cmp(&a.all_day))
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.occurrence.key().cmp(&b.occurrence.key()))
    });
    agenda
}

/// ## Summary
/// Writes the agenda as text, one occurrence per line.
///
/// ## Errors
/// Returns an error if writing fails.
pub fn render_text(agenda: &Agenda, out: &mut impl Write) -> std::io::Result<()> {
    if agenda.items.is_empty() {
        writeln!(out, "No events.")?;
    }

    for item in &agenda.items {
        let entry = &item.occurrence.entry;
        let when = match &entry.end {
            Some(end) if end != &entry.start => format!("{} - {end}", entry.start),
            _ => entry.start.to_string(),
        };
        writeln!(out, "{when}  {}  [{}]", entry.title, item.source)?;
    }
    Ok(())
}

/// ## Summary
/// Writes the agenda as pretty-printed JSON.
///
/// ## Errors
/// Returns an error if serialization or writing fails.
pub fn render_json(agenda: &Agenda, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, agenda)?;
    writeln!(out)?;
    Ok(())
}

/// ## Summary
/// Writes one warning line per feed that failed to refresh.
///
/// ## Errors
/// Returns an error if writing fails.
pub fn report_notices(agenda: &Agenda, err: &mut impl Write) -> std::io::Result<()> {
    for notice in &agenda.notices {
        let reason = notice.error.as_deref().unwrap_or("refresh failed");
        match (notice.stale, notice.fetched_at) {
            (true, Some(fetched_at)) => writeln!(
                err,
                "warning: feed '{}' is stale (last fetched {}): {reason}",
                notice.feed,
                fetched_at.to_rfc3339()
            )?,
            _ => writeln!(err, "warning: feed '{}' is unavailable: {reason}", notice.feed)?,
        }
    }
    Ok(())
}

/// ## Summary
/// Runs the `agenda` command.
///
/// ## Errors
/// Returns an error if the window is invalid, the notes folder cannot be
/// listed, the HTTP client cannot be built or output fails.
#[tracing::instrument(skip_all, fields(feeds = settings.feeds.len()))]
pub async fn run(settings: &Settings, args: &AgendaArgs) -> Result<()> {
    let now = Utc::now();
    let window = agenda_window(args, now.date_naive())?;
    let notes = scan_notes(Path::new(&settings.notes.folder))?;

    let policy = policy_for(settings, &window, now);
    let limits = policy.limits;
    let transport = Arc::new(HttpTransport::new(settings.cache.fetch_timeout())?);
    let cache = FeedCache::new(transport, Arc::new(IcalParser), policy);

    let sources: Vec<FeedSource> = settings.feeds.iter().map(FeedSource::from).collect();
    if args.refresh {
        for source in &sources {
            cache.invalidate(source).await;
        }
    }
    let snapshots = cache.get_all(&sources).await;

    let agenda = assemble(
        sources.into_iter().zip(snapshots).collect(),
        &notes,
        &window,
        limits,
    );
    tracing::debug!(
        items = agenda.items.len(),
        notices = agenda.notices.len(),
        "Agenda assembled"
    );

    report_notices(&agenda, &mut std::io::stderr().lock())?;
    let mut stdout = std::io::stdout().lock();
    if args.json {
        render_json(&agenda, &mut stdout)?;
    } else {
        render_text(&agenda, &mut stdout)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use koyomi_service::calendar::{CalendarEntry, Instant, Provenance, Singleton};
    use koyomi_service::error::ServiceError;

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn occurrence(series_id: &str, instance_id: &str, title: &str, start: &str) -> Occurrence {
        Occurrence {
            series_id: series_id.to_string(),
            instance_id: instance_id.to_string(),
            provenance: if instance_id.is_empty() {
                Provenance::Singleton
            } else {
                Provenance::Series
            },
            entry: CalendarEntry::new(title, Instant::DateTime(utc(start))),
        }
    }

    fn snapshot(occurrences: Vec<Occurrence>) -> FeedSnapshot {
        FeedSnapshot {
            occurrences: Arc::from(occurrences),
            is_stale: false,
            fetched_at: Some(utc("2024-01-08T00:00:00Z")),
            error: None,
        }
    }

    fn week_of_jan_8() -> Window {
        let args = AgendaArgs {
            from: NaiveDate::from_ymd_opt(2024, 1, 8),
            to: NaiveDate::from_ymd_opt(2024, 1, 14),
            ..AgendaArgs::default()
        };
        agenda_window(&args, NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()).unwrap()
    }

    #[test]
    fn window_defaults_to_a_week_from_today() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let window = agenda_window(&AgendaArgs::default(), today).unwrap();

        assert_eq!(window.start, Some(utc("2024-01-08T00:00:00Z")));
        assert_eq!(window.end, Some(utc("2024-01-15T23:59:59Z")));
    }

    #[test]
    fn window_rejects_reversed_range() {
        let args = AgendaArgs {
            from: NaiveDate::from_ymd_opt(2024, 1, 8),
            to: NaiveDate::from_ymd_opt(2024, 1, 7),
            ..AgendaArgs::default()
        };
        assert!(agenda_window(&args, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).is_err());
    }

    #[test]
    fn policy_widens_to_cover_window() {
        let settings = Settings::from_toml("").unwrap();
        let now = utc("2024-06-01T00:00:00Z");
        let policy = policy_for(&settings, &week_of_jan_8(), now);

        let horizon = policy.horizon(now);
        assert!(horizon.start.unwrap() <= utc("2024-01-08T00:00:00Z"));
        assert_eq!(policy.future, Some(TimeDelta::days(90)));
    }

    #[test_log::test]
    fn overridden_occurrences_are_replaced_by_notes() {
        let feed = snapshot(vec![
            occurrence("standup", "2024-01-08T09:00:00Z", "Standup", "2024-01-08T09:00:00Z"),
            occurrence("standup", "2024-01-09T09:00:00Z", "Standup", "2024-01-09T09:00:00Z"),
            occurrence("old", "", "Last year", "2023-01-01T09:00:00Z"),
        ]);

        let mut notes = LocalNotes::default();
        notes.overrides.insert("standup", "2024-01-08T09:00:00Z");
        notes.events.push(Singleton::new(
            "note:Standup.md",
            CalendarEntry::new("Standup (notes)", Instant::DateTime(utc("2024-01-08T09:30:00Z"))),
        ));

        let agenda = assemble(
            vec![(FeedSource::new("work", "https://example.com/work.ics"), feed)],
            &notes,
            &week_of_jan_8(),
            ExpansionLimits::default(),
        );

        let lines: Vec<_> = agenda
            .items
            .iter()
            .map(|item| (item.source.as_str(), item.occurrence.entry.title.as_str()))
            .collect();
        assert_eq!(
            lines,
            [("notes", "Standup (notes)"), ("work", "Standup")]
        );
        assert!(agenda.notices.is_empty());
    }

    #[test]
    fn stale_feed_produces_one_notice() {
        let mut feed = snapshot(vec![occurrence(
            "lunch",
            "",
            "Lunch",
            "2024-01-10T12:00:00Z",
        )]);
        feed.is_stale = true;
        feed.error = Some(Arc::new(ServiceError::JoinError("boom".to_string())));

        let agenda = assemble(
            vec![(FeedSource::new("home", "https://example.com/home.ics"), feed)],
            &LocalNotes::default(),
            &week_of_jan_8(),
            ExpansionLimits::default(),
        );

        assert_eq!(agenda.items.len(), 1);
        assert_eq!(agenda.notices.len(), 1);
        assert!(agenda.notices[0].stale);

        let mut err = Vec::new();
        report_notices(&agenda, &mut err).unwrap();
        let text = String::from_utf8(err).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("warning: feed 'home' is stale"));
    }

    #[test]
    fn text_and_json_rendering() {
        let agenda = assemble(
            vec![(
                FeedSource::new("work", "https://example.com/work.ics"),
                snapshot(vec![occurrence("lunch", "", "Lunch", "2024-01-10T12:00:00Z")]),
            )],
            &LocalNotes::default(),
            &week_of_jan_8(),
            ExpansionLimits::default(),
        );

        let mut text = Vec::new();
        render_text(&agenda, &mut text).unwrap();
        assert_eq!(
            String::from_utf8(text).unwrap(),
            "2024-01-10T12:00:00Z  Lunch  [work]\n"
        );

        let mut json = Vec::new();
        render_json(&agenda, &mut json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        let item = &value["items"][0];
        assert_eq!(item["source"], "work");
        assert_eq!(item["seriesId"], "lunch");
        assert_eq!(item["allDay"], false);
        assert_eq!(item["title"], "Lunch");
    }

    #[test]
    fn empty_agenda_says_so() {
        let mut text = Vec::new();
        render_text(&Agenda::default(), &mut text).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "No events.\n");
    }
}
