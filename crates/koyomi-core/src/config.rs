use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use serde::Deserialize;

use crate::constants::{
    CONFIG_FILE, DEFAULT_CACHE_TTL_SECS, DEFAULT_FAILURE_BACKOFF_SECS, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_FUTURE_DAYS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_ITERATIONS, DEFAULT_NOTES_FOLDER,
    DEFAULT_PAST_DAYS, ENV_PREFIX, ENV_SEPARATOR,
};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    pub notes: NotesConfig,
    pub cache: CacheConfig,
    pub expansion: ExpansionConfig,
    pub logging: LoggingConfig,
}

/// A remote iCalendar feed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Folder of locally-owned notes that may override feed events.
#[derive(Debug, Clone, Deserialize)]
pub struct NotesConfig {
    pub folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub failure_backoff_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl CacheConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub const fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    pub max_iterations: u32,
    pub past_days: u32,
    pub future_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("notes.folder", DEFAULT_NOTES_FOLDER)?
        .set_default("cache.ttl_secs", i64::from(DEFAULT_CACHE_TTL_SECS))?
        .set_default(
            "cache.failure_backoff_secs",
            i64::from(DEFAULT_FAILURE_BACKOFF_SECS),
        )?
        .set_default(
            "cache.fetch_timeout_secs",
            i64::from(DEFAULT_FETCH_TIMEOUT_SECS),
        )?
        .set_default("expansion.max_iterations", i64::from(DEFAULT_MAX_ITERATIONS))?
        .set_default("expansion.past_days", i64::from(DEFAULT_PAST_DAYS))?
        .set_default("expansion.future_days", i64::from(DEFAULT_FUTURE_DAYS))?
        .set_default("logging.level", DEFAULT_LOG_LEVEL)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .ignore_empty(true)
        .try_parsing(true)
}

impl Settings {
    /// ## Summary
    /// Loads configuration from defaults, an optional TOML file and environment variables.
    /// Environment variables take precedence over file values.
    ///
    /// When `path` is `None` the optional `koyomi.toml` in the working directory is used.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it or validating it fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(CONFIG_FILE).required(false),
        };

        let settings = defaults()?
            .add_source(file)
            .add_source(environment())
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Builds settings from a TOML document layered over the defaults.
    ///
    /// ## Errors
    /// Returns an error if the document is not valid TOML or fails validation.
    pub fn from_toml(source: &str) -> CoreResult<Self> {
        let settings = defaults()?
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Checks invariants that deserialization cannot express.
    ///
    /// ## Errors
    /// Returns `CoreError::ValidationError` for empty or duplicate feed names and empty URLs.
    pub fn validate(&self) -> CoreResult<()> {
        let mut names = HashSet::new();
        for feed in &self.feeds {
            if feed.name.trim().is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "feed with url '{}' has an empty name",
                    feed.url
                )));
            }
            if feed.url.trim().is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "feed '{}' has an empty url",
                    feed.name
                )));
            }
            if !names.insert(feed.name.as_str()) {
                return Err(CoreError::ValidationError(format!(
                    "duplicate feed name '{}'",
                    feed.name
                )));
            }
        }

        if self.cache.ttl_secs == 0 {
            tracing::warn!("cache.ttl_secs is 0, every read refreshes its feed");
        }

        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables, `.env` and the optional config file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_any_source() {
        let settings = Settings::from_toml("").unwrap();

        assert!(settings.feeds.is_empty());
        assert_eq!(settings.notes.folder, "Calendar");
        assert_eq!(settings.cache.ttl(), Duration::from_secs(300));
        assert_eq!(settings.cache.failure_backoff(), Duration::from_secs(60));
        assert_eq!(settings.expansion.max_iterations, 1000);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = Settings::from_toml(
            r#"
            [[feeds]]
            name = "work"
            url = "https://example.com/work.ics"

            [[feeds]]
            name = "holidays"
            url = "https://example.com/holidays.ics"

            [cache]
            ttl_secs = 60

            [expansion]
            max_iterations = 250
            "#,
        )
        .unwrap();

        assert_eq!(settings.feeds.len(), 2);
        assert_eq!(settings.feeds[1].name, "holidays");
        assert_eq!(settings.cache.ttl_secs, 60);
        assert_eq!(settings.cache.fetch_timeout_secs, 30);
        assert_eq!(settings.expansion.max_iterations, 250);
        assert_eq!(settings.expansion.future_days, 90);
    }

    #[test]
    fn duplicate_feed_names_are_rejected() {
        let err = Settings::from_toml(
            r#"
            [[feeds]]
            name = "work"
            url = "https://example.com/a.ics"

            [[feeds]]
            name = "work"
            url = "https://example.com/b.ics"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::ValidationError(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn empty_feed_url_is_rejected() {
        let err = Settings::from_toml(
            r#"
            [[feeds]]
            name = "work"
            url = " "
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::ValidationError(_)));
    }
}
