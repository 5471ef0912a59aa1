use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::device::DimmerConfig;
use crate::host::SimulatedNodeOptions;
use crate::logging::{LogConfig, RotationPeriod};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub settle_delay_ms: u64,
    pub debounce_ms: u64,
    pub get_on_start: bool,
    pub get_on_online: bool,
    pub simulated_latency_ms: u64,
    pub simulated_jitter_ms: u64,
    pub level_settle_ms: u64,
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            settle_delay_ms: 1000,
            debounce_ms: 500,
            get_on_start: true,
            get_on_online: true,
            simulated_latency_ms: 20,
            simulated_jitter_ms: 10,
            level_settle_ms: 300,
            log: LogSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// Directory for rolling log files. Console only when unset.
    pub dir: Option<String>,
    pub prefix: String,
    pub rotation: RotationPeriod,
    pub max_files: usize,
    /// Also log to stdout when writing files.
    pub console: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            dir: None,
            prefix: "ecodim".to_string(),
            rotation: RotationPeriod::Daily,
            max_files: 7,
            console: true,
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn dimmer_config(&self) -> DimmerConfig {
        let mut config = DimmerConfig {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            ..Default::default()
        };
        config.get_opts.get_on_start = self.get_on_start;
        config.get_opts.get_on_online = self.get_on_online;
        config
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn node_options(&self) -> SimulatedNodeOptions {
        SimulatedNodeOptions {
            latency: Duration::from_millis(self.simulated_latency_ms),
            jitter: Duration::from_millis(self.simulated_jitter_ms),
            level_settle: Duration::from_millis(self.level_settle_ms),
            ..Default::default()
        }
    }
}

impl LogSettings {
    /// File logging setup, if a directory is configured.
    pub fn file_config(&self) -> Option<LogConfig> {
        self.dir.as_ref().map(|dir| LogConfig {
            log_dir: dir.clone(),
            log_prefix: self.prefix.clone(),
            rotation: self.rotation,
            max_log_files: self.max_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_settings_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "settle_delay_ms": 250, "log": { "dir": "/tmp/ecodim", "rotation": "hourly" } }"#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.settle_delay_ms, 250);
        assert_eq!(settings.debounce_ms, 500);
        assert_eq!(settings.log.rotation, RotationPeriod::Hourly);
        assert_eq!(settings.log.prefix, "ecodim");

        let config = settings.log.file_config().unwrap();
        assert_eq!(config.log_dir, "/tmp/ecodim");
        assert_eq!(config.max_log_files, 7);
    }

    #[test]
    fn test_missing_and_broken_files() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Settings::from_file(temp_dir.path().join("missing.json")).is_err());

        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Settings::from_file(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid settings"));
    }

    #[test]
    fn test_dimmer_config() {
        let settings = Settings {
            settle_delay_ms: 1500,
            get_on_online: false,
            ..Default::default()
        };
        let config = settings.dimmer_config();
        assert_eq!(config.settle_delay, Duration::from_millis(1500));
        assert!(config.get_opts.get_on_start);
        assert!(!config.get_opts.get_on_online);
        assert_eq!(Settings::default().debounce_window(), Duration::from_millis(500));
        assert!(Settings::default().log.file_config().is_none());
    }
}
