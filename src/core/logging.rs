//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup summary of the effective configuration

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config::{self, Settings};

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup.
///
/// The bot token is masked; everything else is printed as loaded.
pub fn log_startup_configuration(settings: &Settings) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("tgdrop {} ({})", env!("CARGO_PKG_VERSION"), settings.session);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Bot token:        {}", config::mask_token(&settings.bot_token));
    log::info!("Authorized users: {:?}", settings.authorized_users);
    log::info!("Download root:    {}", settings.download_root.display());
    log::info!("Torrent root:     {}", settings.torrent_root.display());
    log::info!("Workers:          {}", settings.max_parallel);
    log::info!("Timeout:          {}s", settings.download_timeout.as_secs());

    match config::BOT_API_URL.as_deref() {
        Some(url) => log::info!("Bot API:          {}", url),
        None => log::info!("Bot API:          public (20 MB download limit)"),
    }

    if settings.metrics.enabled {
        log::info!("Metrics:          enabled on port {}", settings.metrics.port);
    }

    let scan = &settings.auto_scan;
    if scan.enabled {
        log::info!(
            "Auto scan:        {} groups ({}), min {} MB, notify={}",
            scan.groups.len(),
            if scan.whitelist_only { "whitelist" } else { "blacklist" },
            scan.min_size_mb,
            scan.notify_user
        );
    } else {
        log::info!("Auto scan:        disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    #[test]
    fn test_init_logger_creates_log_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        // A logger may already be installed by another test in this binary
        let _ = init_logger(path);

        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_log_startup_configuration_runs() {
        let settings = Settings::new(vec![1], "/tmp/tgdrop", "/tmp/watch");
        log_startup_configuration(&settings);
    }
}
