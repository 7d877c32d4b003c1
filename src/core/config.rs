use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::download::router::Layout;

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: tgdrop.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "tgdrop.log".to_string()));

/// Custom Bot API server URL
/// Read from BOT_API_URL environment variable
/// A local server lifts the 20 MB download limit of the public API
pub static BOT_API_URL: Lazy<Option<String>> =
    Lazy::new(|| env::var("BOT_API_URL").ok().filter(|url| !url.trim().is_empty()));

/// Defaults applied when a variable is absent
pub mod defaults {
    pub const SESSION: &str = "tgdrop";
    pub const DOWNLOAD_ROOT: &str = "/download";
    pub const TORRENT_ROOT: &str = "/watch";
    pub const MAX_PARALLEL: usize = 4;
    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 3600;
    pub const METRICS_PORT: u16 = 9090;
    pub const AUTO_SCAN_MIN_SIZE_MB: u64 = 100;
}

/// Network configuration for the Bot API client
pub mod network {
    use super::Duration;

    /// Request timeout (in seconds); file transfers have their own bound
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Startup connection check
pub mod startup {
    use super::Duration;

    /// Attempts made to reach the Bot API before giving up
    pub const GET_ME_ATTEMPTS: u32 = 5;

    /// Delay between attempts (in seconds), doubled after every failure
    pub const GET_ME_BACKOFF_SECS: u64 = 2;

    pub fn backoff() -> Duration {
        Duration::from_secs(GET_ME_BACKOFF_SECS)
    }
}

/// Configuration errors raised while reading the environment
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },

    #[error("TG_AUTHORIZED_USER_ID contains no valid user id")]
    EmptyAllowList,
}

/// Real-time group monitoring settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoScanSettings {
    pub enabled: bool,
    pub groups: Vec<i64>,
    pub min_size_mb: u64,
    pub notify_user: bool,
    pub whitelist_only: bool,
}

impl Default for AutoScanSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            groups: Vec::new(),
            min_size_mb: defaults::AUTO_SCAN_MIN_SIZE_MB,
            notify_user: true,
            whitelist_only: true,
        }
    }
}

/// Prometheus endpoint settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: defaults::METRICS_PORT,
        }
    }
}

/// Settings the dispatcher and the workers run with.
///
/// Built once at startup by [`Settings::from_env`] and shared behind an `Arc`.
/// Tests build it with [`Settings::new`] and adjust the public fields.
#[derive(Clone)]
pub struct Settings {
    pub session: String,
    pub bot_token: String,
    pub authorized_users: Vec<i64>,
    pub download_root: PathBuf,
    pub torrent_root: PathBuf,
    pub max_parallel: usize,
    pub download_timeout: Duration,
    pub metrics: MetricsSettings,
    pub auto_scan: AutoScanSettings,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("session", &self.session)
            .field("bot_token", &mask_token(&self.bot_token))
            .field("authorized_users", &self.authorized_users)
            .field("download_root", &self.download_root)
            .field("torrent_root", &self.torrent_root)
            .field("max_parallel", &self.max_parallel)
            .field("download_timeout", &self.download_timeout)
            .field("metrics", &self.metrics)
            .field("auto_scan", &self.auto_scan)
            .finish()
    }
}

impl Settings {
    /// Settings with defaults for everything except the allow-list and the two roots
    pub fn new(authorized_users: Vec<i64>, download_root: impl Into<PathBuf>, torrent_root: impl Into<PathBuf>) -> Self {
        Self {
            session: defaults::SESSION.to_string(),
            bot_token: String::new(),
            authorized_users,
            download_root: download_root.into(),
            torrent_root: torrent_root.into(),
            max_parallel: defaults::MAX_PARALLEL,
            download_timeout: Duration::from_secs(defaults::DOWNLOAD_TIMEOUT_SECS),
            metrics: MetricsSettings::default(),
            auto_scan: AutoScanSettings::default(),
        }
    }

    /// Reads settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("TG_BOT_TOKEN")
            .or_else(|| get("BOT_TOKEN"))
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("TG_BOT_TOKEN"))?;

        let raw_users = get("TG_AUTHORIZED_USER_ID").ok_or(ConfigError::Missing("TG_AUTHORIZED_USER_ID"))?;
        let authorized_users = parse_user_ids(&raw_users);
        if authorized_users.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }

        let download_root = expand_path(get("TG_DOWNLOAD_PATH").as_deref().unwrap_or(defaults::DOWNLOAD_ROOT));
        let torrent_root = expand_path(
            get("TG_DOWNLOAD_PATH_TORRENTS")
                .as_deref()
                .unwrap_or(defaults::TORRENT_ROOT),
        );

        let max_parallel = parse_number("TG_MAX_PARALLEL", get("TG_MAX_PARALLEL"), defaults::MAX_PARALLEL)?.max(1);
        let timeout_secs =
            parse_number("TG_DL_TIMEOUT", get("TG_DL_TIMEOUT"), defaults::DOWNLOAD_TIMEOUT_SECS)?.max(1);

        let metrics = MetricsSettings {
            enabled: parse_flag(get("METRICS_ENABLED"), false),
            port: parse_number("METRICS_PORT", get("METRICS_PORT"), defaults::METRICS_PORT)?,
        };

        let auto_scan = AutoScanSettings {
            enabled: parse_flag(get("AUTO_SCAN_ENABLED"), false),
            groups: get("AUTO_SCAN_GROUPS").map(|raw| parse_user_ids(&raw)).unwrap_or_default(),
            min_size_mb: parse_number(
                "AUTO_SCAN_MIN_SIZE_MB",
                get("AUTO_SCAN_MIN_SIZE_MB"),
                defaults::AUTO_SCAN_MIN_SIZE_MB,
            )?,
            notify_user: parse_flag(get("AUTO_SCAN_NOTIFY_USER"), true),
            whitelist_only: parse_flag(get("AUTO_SCAN_WHITELIST_ONLY"), true),
        };

        Ok(Self {
            session: get("TG_SESSION").unwrap_or_else(|| defaults::SESSION.to_string()),
            bot_token,
            authorized_users,
            download_root,
            torrent_root,
            max_parallel,
            download_timeout: Duration::from_secs(timeout_secs),
            metrics,
            auto_scan,
        })
    }

    /// Returns true if the user is on the allow-list
    pub fn is_authorized(&self, user_id: i64) -> bool {
        self.authorized_users.contains(&user_id)
    }

    /// First allow-listed user; receives startup and auto scan notifications
    pub fn owner(&self) -> Option<i64> {
        self.authorized_users.first().copied()
    }

    /// Directory layout rooted at the configured download and torrent roots
    pub fn layout(&self) -> Layout {
        Layout::new(&self.download_root, &self.torrent_root)
    }
}

/// Parses a list of numeric user (or chat) ids.
///
/// Accepts commas, spaces, tabs and newlines as separators; tokens that are
/// not valid integers are skipped with a warning.
pub fn parse_user_ids(raw: &str) -> Vec<i64> {
    raw.split([',', ' ', '\n', '\t'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                log::warn!("Ignoring invalid id in allow-list: {:?}", token);
                None
            }
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn expand_path(raw: &str) -> PathBuf {
    Path::new(shellexpand::tilde(raw).as_ref()).to_path_buf()
}

/// Keeps the bot id part of a token and hides the secret
pub fn mask_token(token: &str) -> String {
    match token.split_once(':') {
        Some((id, _)) => format!("{}:***", id),
        None if token.is_empty() => String::new(),
        None => "***".to_string(),
    }
}
