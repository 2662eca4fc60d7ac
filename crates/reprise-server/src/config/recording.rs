//! Recording repository and server status configuration.

use crate::status::Mode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RecordingsConfig {
    /// JSON file mirroring the repository. Recordings are kept in memory only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusConfig {
    /// Initial serving mode
    #[serde(default)]
    pub mode: Mode,
    /// Statistics collection period in seconds
    #[serde(default = "default_statistics_interval")]
    pub statistics_interval_secs: u64,
}

fn default_statistics_interval() -> u64 {
    60
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            statistics_interval_secs: default_statistics_interval(),
        }
    }
}
