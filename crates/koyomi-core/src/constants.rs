/// Identifier sent with every feed request.
pub const USER_AGENT: &str = const_str::concat!("koyomi/", env!("CARGO_PKG_VERSION"));

/// Prefix for environment variable overrides (`KOYOMI__CACHE__TTL_SECS=60`).
pub const ENV_PREFIX: &str = "KOYOMI";
pub const ENV_SEPARATOR: &str = "__";

/// Optional configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "koyomi.toml";

/// Refresh interval for remote feeds.
pub const DEFAULT_CACHE_TTL_SECS: u32 = 5 * 60;
/// Delay before a failed feed is retried.
pub const DEFAULT_FAILURE_BACKOFF_SECS: u32 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u32 = 30;

/// Recurrence candidates evaluated per series before expansion truncates.
pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;
pub const DEFAULT_PAST_DAYS: u32 = 30;
pub const DEFAULT_FUTURE_DAYS: u32 = 90;

pub const DEFAULT_NOTES_FOLDER: &str = "Calendar";
pub const DEFAULT_LOG_LEVEL: &str = "info";
