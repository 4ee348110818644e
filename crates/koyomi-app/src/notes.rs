//! Local markdown notes: override markers and locally owned events.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use koyomi_service::calendar::{
    CalendarEntry, Instant, OverrideIndex, OverrideMarker, Singleton, parse_instant_text,
};
use serde::{Deserialize, Deserializer};

const FRONTMATTER_FENCE: &str = "---";

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("Invalid frontmatter: {0}")]
    Frontmatter(#[from] serde_yaml::Error),

    #[error("Invalid {field} '{value}'")]
    InvalidTime { field: &'static str, value: String },
}

/// Frontmatter keys read from a note. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFrontmatter {
    #[serde(default, deserialize_with = "scalar_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub description: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, deserialize_with = "scalar_string")]
    pub ics_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub ics_base_event_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub ics_instance_id: Option<String>,
}

/// Accepts unquoted YAML scalars (`icsInstanceId: 20240108`) as strings.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(text)) => Some(text),
        Some(serde_yaml::Value::Number(number)) => Some(number.to_string()),
        Some(serde_yaml::Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

/// What one note contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub marker: Option<OverrideMarker>,
    pub event: Option<Singleton>,
}

/// Everything read from the notes folder.
#[derive(Debug, Default)]
pub struct LocalNotes {
    pub overrides: OverrideIndex,
    pub events: Vec<Singleton>,
    pub skipped: usize,
}

/// ## Summary
/// Returns the YAML between the leading `---` fences, if the note has any.
#[must_use]
pub fn split_frontmatter(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content.strip_prefix(FRONTMATTER_FENCE)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_FENCE {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

/// ## Summary
/// Reads the contribution of one note.
///
/// `uid` identifies the local event the note describes, `stem` is its
/// default title.
///
/// ## Errors
/// Returns `NoteError` if the frontmatter is not valid YAML or a time field
/// does not parse.
pub fn parse_note(uid: &str, stem: &str, content: &str) -> Result<Note, NoteError> {
    let Some(yaml) = split_frontmatter(content) else {
        return Ok(Note {
            marker: None,
            event: None,
        });
    };

    let frontmatter: NoteFrontmatter = if yaml.trim().is_empty() {
        NoteFrontmatter::default()
    } else {
        serde_yaml::from_str(yaml)?
    };

    let marker = OverrideMarker::from_note_fields(
        frontmatter.ics_id.as_deref(),
        frontmatter.ics_base_event_id.as_deref(),
        frontmatter.ics_instance_id.as_deref(),
    );

    let event = match frontmatter.start_time.as_deref() {
        Some(start) if !start.trim().is_empty() => {
            Some(note_event(uid, stem, start, &frontmatter)?)
        }
        _ => None,
    };

    Ok(Note { marker, event })
}

fn note_event(
    uid: &str,
    stem: &str,
    start: &str,
    frontmatter: &NoteFrontmatter,
) -> Result<Singleton, NoteError> {
    let start = note_instant("startTime", start, frontmatter.all_day)?;
    let title = frontmatter
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(stem);

    let mut entry = CalendarEntry::new(title, start);
    if let Some(end) = frontmatter
        .end_time
        .as_deref()
        .filter(|end| !end.trim().is_empty())
    {
        let end = note_instant("endTime", end, frontmatter.all_day)?;
        if end.to_utc() >= start.to_utc() {
            entry = entry.with_end(end);
        } else {
            tracing::warn!(uid = %uid, "Note ends before it starts, ignoring endTime");
        }
    }
    if let Some(description) = frontmatter
        .description
        .as_deref()
        .filter(|description| !description.trim().is_empty())
    {
        entry = entry.with_description(description);
    }

    Ok(Singleton::new(uid, entry))
}

/// All-day notes keep the written calendar date, whatever offset follows it.
fn note_instant(field: &'static str, text: &str, all_day: bool) -> Result<Instant, NoteError> {
    let text = text.trim();
    let invalid = || NoteError::InvalidTime {
        field,
        value: text.to_string(),
    };

    if all_day {
        let date = text
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            .or_else(|| match parse_instant_text(text)? {
                Instant::Date(date) => Some(date),
                Instant::DateTime(utc) => Some(utc.date_naive()),
            })
            .ok_or_else(invalid)?;
        return Ok(Instant::Date(date));
    }

    parse_instant_text(text).ok_or_else(invalid)
}

/// ## Summary
/// Lists the markdown notes below `folder`, recursively and in path order.
///
/// ## Errors
/// Returns an error if the folder path cannot be turned into a glob pattern.
pub fn note_paths(folder: &Path) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&folder.to_string_lossy());
    let pattern = format!("{escaped}/**/*.md");

    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid notes folder: {}", folder.display()))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable note path");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

/// ## Summary
/// Reads every note below `folder` into an override index and local events.
///
/// A missing folder yields nothing. Notes that cannot be read or parsed are
/// skipped with a warning.
///
/// ## Errors
/// Returns an error if the folder cannot be listed.
#[tracing::instrument(skip(folder), fields(folder = %folder.display()))]
pub fn scan_notes(folder: &Path) -> Result<LocalNotes> {
    let mut notes = LocalNotes::default();

    if !folder.is_dir() {
        tracing::debug!("Notes folder does not exist");
        return Ok(notes);
    }

    for path in note_paths(folder)? {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable note");
                notes.skipped += 1;
                continue;
            }
        };

        let relative = path.strip_prefix(folder).unwrap_or(&path);
        let uid = format!("note:{}", relative.display());
        let stem = path
            .file_stem()
            .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned());

        match parse_note(&uid, &stem, &content) {
            Ok(note) => {
                if let Some(marker) = &note.marker {
                    notes.overrides.insert_marker(marker);
                }
                if let Some(event) = note.event {
                    notes.events.push(event);
                }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Skipping note");
                notes.skipped += 1;
            }
        }
    }

    tracing::debug!(
        overrides = notes.overrides.len(),
        events = notes.events.len(),
        skipped = notes.skipped,
        "Notes scanned"
    );
    Ok(notes)
}
