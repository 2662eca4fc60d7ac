//! Configuration types for the Reprise server.

mod listen;
mod logging;
mod recording;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

pub use listen::AdminConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use recording::{RecordingsConfig, StatusConfig};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub recordings: RecordingsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(level) = &self.logging.level {
            if level.trim().to_ascii_lowercase().parse::<LevelFilter>().is_err() {
                anyhow::bail!(
                    "Invalid log level '{}'. Expected one of trace, debug, info, warn, error, off",
                    level
                );
            }
        }

        if let Some(path) = &self.recordings.snapshot_path {
            if path.as_os_str().is_empty() {
                anyhow::bail!("recordings.snapshot_path must not be empty");
            }
            if path.is_dir() {
                anyhow::bail!(
                    "recordings.snapshot_path '{}' is a directory, expected a file",
                    path.display()
                );
            }
        }

        if self.status.statistics_interval_secs == 0 {
            anyhow::bail!("status.statistics_interval_secs must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Mode;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
admin:
  listen: "0.0.0.0:9000"
recordings:
  snapshot_path: /tmp/reprise/recordings.json
logging:
  level: debug
  format: json
status:
  mode: PLAYBACK_OR_RECORD
  statistics_interval_secs: 30
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.admin.listen.port(), 9000);
        assert_eq!(
            config.recordings.snapshot_path.as_deref(),
            Some(Path::new("/tmp/reprise/recordings.json"))
        );
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.status.mode, Mode::PlaybackOrRecord);
        assert_eq!(config.status.statistics_interval_secs, 30);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(config.admin.listen.to_string(), "127.0.0.1:8181");
        assert!(config.recordings.snapshot_path.is_none());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.status.mode, Mode::Playback);
        assert_eq!(config.status.statistics_interval_secs, 60);
    }

    #[test]
    fn test_invalid_log_level() {
        let err = Config::from_yaml_str("logging:\n  level: loud\n").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_invalid_mode() {
        assert!(Config::from_yaml_str("status:\n  mode: REPLAY\n").is_err());
    }

    #[test]
    fn test_zero_statistics_interval() {
        let err =
            Config::from_yaml_str("status:\n  statistics_interval_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("statistics_interval_secs"));
    }

    #[test]
    fn test_snapshot_path_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!("recordings:\n  snapshot_path: {}\n", dir.path().display());
        assert!(Config::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_yaml_str(include_str!("../../reprise.example.yaml")).unwrap();
        assert_eq!(config.admin.listen.port(), 8181);
        assert!(config.recordings.snapshot_path.is_some());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reprise.yaml");
        std::fs::write(&path, "admin:\n  listen: \"127.0.0.1:7000\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.admin.listen.port(), 7000);
    }
}
