//! Subscriber setup for the simulator: console, rolling files, or both.
//!
//! Files rotate through tracing-appender, old ones are pruned on startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::settings::LogSettings;

/// How often a new log file is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPeriod {
    /// New file every minute, mostly useful while testing rotation.
    Minutely,
    /// New file every hour.
    Hourly,
    /// New file every day (default).
    #[default]
    Daily,
    /// A single file that grows forever.
    Never,
}

impl std::str::FromStr for RotationPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minutely" | "minute" => Ok(RotationPeriod::Minutely),
            "hourly" | "hour" => Ok(RotationPeriod::Hourly),
            "daily" | "day" => Ok(RotationPeriod::Daily),
            "never" | "none" => Ok(RotationPeriod::Never),
            _ => Err(format!(
                "Invalid rotation period '{}'. Valid options: minutely, hourly, daily, never",
                s
            )),
        }
    }
}

impl From<RotationPeriod> for Rotation {
    fn from(period: RotationPeriod) -> Self {
        match period {
            RotationPeriod::Minutely => Rotation::MINUTELY,
            RotationPeriod::Hourly => Rotation::HOURLY,
            RotationPeriod::Daily => Rotation::DAILY,
            RotationPeriod::Never => Rotation::NEVER,
        }
    }
}

/// Where and how rolling log files are written.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the files, created when missing.
    pub log_dir: String,
    /// File names start with this, e.g. `ecodim.2026-10-16.log`.
    pub log_prefix: String,
    pub rotation: RotationPeriod,
    /// Newest files kept on disk, 0 keeps everything.
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: ".".to_string(),
            log_prefix: "ecodim".to_string(),
            rotation: RotationPeriod::Daily,
            max_log_files: 7,
        }
    }
}

/// Keeps the non-blocking writers alive. Dropping it flushes pending lines.
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Picks the output from the settings: files when a directory is set,
/// mirrored to stdout when `console` is on.
pub fn init(settings: &LogSettings) -> std::io::Result<LogGuard> {
    match settings.file_config() {
        None => Ok(setup_console_logging()),
        Some(config) if settings.console => setup_dual_logging(config),
        Some(config) => setup_file_logging(config),
    }
}

/// Logs to stdout only. The filter comes from `RUST_LOG`, `info` when unset.
pub fn setup_console_logging() -> LogGuard {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    LogGuard { _guards: vec![] }
}

/// Logs to rolling files only, without ANSI colors and with source locations.
///
/// Old files beyond `max_log_files` are removed before the appender starts.
/// Keep the returned guard alive until shutdown so buffered lines get written.
pub fn setup_file_logging(config: LogConfig) -> std::io::Result<LogGuard> {
    let (writer, guard) = rolling_writer(&config)?;
    let file_layer = Layer::default()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .init();

    Ok(LogGuard {
        _guards: vec![guard],
    })
}

/// Same files as [`setup_file_logging`], mirrored to a colored stdout layer.
pub fn setup_dual_logging(config: LogConfig) -> std::io::Result<LogGuard> {
    let (writer, guard) = rolling_writer(&config)?;
    let file_layer = Layer::default()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    let console_layer = Layer::default()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LogGuard {
        _guards: vec![guard],
    })
}

/// Prunes old files and opens the non-blocking rolling appender.
fn rolling_writer(config: &LogConfig) -> std::io::Result<(NonBlocking, WorkerGuard)> {
    let log_dir = Path::new(&config.log_dir);
    std::fs::create_dir_all(log_dir)?;
    if config.max_log_files > 0 {
        cleanup_old_logs(log_dir, &config.log_prefix, config.max_log_files)?;
    }

    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(&config.log_prefix)
        .filename_suffix("log");
    if config.max_log_files > 0 {
        builder = builder.max_log_files(config.max_log_files);
    }
    let appender = builder.build(log_dir).map_err(std::io::Error::other)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Removes all but the `max_files` most recently modified logs with `prefix`.
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_files: usize) -> std::io::Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }

    let mut log_files: Vec<_> = std::fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_log_file(&entry.path(), prefix))
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((entry.path(), modified))
        })
        .collect();

    // newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.into_iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(&path) {
            eprintln!("Warning: failed to remove old log file {:?}: {}", path, e);
        }
    }
    Ok(())
}

fn is_log_file(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(prefix) && name.ends_with(".log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rotation_period_from_str() {
        assert_eq!("daily".parse::<RotationPeriod>(), Ok(RotationPeriod::Daily));
        assert_eq!("Hour".parse::<RotationPeriod>(), Ok(RotationPeriod::Hourly));
        assert_eq!("MINUTELY".parse::<RotationPeriod>(), Ok(RotationPeriod::Minutely));
        assert_eq!("none".parse::<RotationPeriod>(), Ok(RotationPeriod::Never));
        assert!("weekly".parse::<RotationPeriod>().is_err());
    }

    #[test]
    fn test_rotation_period_serde() {
        let period: RotationPeriod = serde_json::from_str("\"never\"").unwrap();
        assert_eq!(period, RotationPeriod::Never);
        assert_eq!(
            serde_json::to_string(&RotationPeriod::Hourly).unwrap(),
            "\"hourly\""
        );
    }

    #[test]
    fn test_cleanup_old_logs() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path();

        for i in 0..5 {
            std::fs::write(log_dir.join(format!("ecodim.{}.log", i)), "line").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        std::fs::write(log_dir.join("other.log"), "line").unwrap();

        cleanup_old_logs(log_dir, "ecodim", 2).unwrap();

        let mut remaining: Vec<_> = std::fs::read_dir(log_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec!["ecodim.3.log", "ecodim.4.log", "other.log"]);
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(cleanup_old_logs(&temp_dir.path().join("nope"), "ecodim", 1).is_ok());
    }

    #[test]
    fn test_file_config_from_settings() {
        let settings = LogSettings {
            dir: Some("/var/log/ecodim".to_string()),
            rotation: RotationPeriod::Never,
            ..Default::default()
        };
        let config = settings.file_config().unwrap();
        assert_eq!(config.log_prefix, LogConfig::default().log_prefix);
        assert_eq!(config.rotation, RotationPeriod::Never);
    }
}
