//! Small read-only commands.

use std::io::Write;

use koyomi_core::config::FeedConfig;
use koyomi_service::calendar::OverrideIndex;

/// ## Summary
/// Writes one `name<TAB>url` line per configured feed.
///
/// ## Errors
/// Returns an error if writing fails.
pub fn list_feeds(feeds: &[FeedConfig], out: &mut impl Write) -> std::io::Result<()> {
    if feeds.is_empty() {
        writeln!(out, "No feeds configured.")?;
    }
    for feed in feeds {
        writeln!(out, "{}\t{}", feed.name, feed.url)?;
    }
    Ok(())
}

/// ## Summary
/// Writes the normalized override keys, sorted. Whole-event keys have an
/// empty instance column.
///
/// ## Errors
/// Returns an error if writing fails.
pub fn list_overrides(index: &OverrideIndex, out: &mut impl Write) -> std::io::Result<()> {
    for (series_id, instance_id) in index.sorted_keys() {
        writeln!(out, "{series_id}\t{instance_id}")?;
    }
    Ok(())
}
