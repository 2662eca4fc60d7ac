//! Server status and per-recording response statistics.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Serving mode of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Answer from activated recordings only
    #[default]
    Playback,
    /// Forward to the real service and store every interaction
    Record,
    /// Answer from recordings, recording whatever does not match
    PlaybackOrRecord,
    /// Forward everything
    Passthrough,
    /// Answer from recordings, forwarding whatever does not match
    PlaybackOrPassthrough,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Playback,
        Mode::Record,
        Mode::PlaybackOrRecord,
        Mode::Passthrough,
        Mode::PlaybackOrPassthrough,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Playback => "PLAYBACK",
            Mode::Record => "RECORD",
            Mode::PlaybackOrRecord => "PLAYBACK_OR_RECORD",
            Mode::Passthrough => "PASSTHROUGH",
            Mode::PlaybackOrPassthrough => "PLAYBACK_OR_PASSTHROUGH",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownMode(wanted.to_string()))
    }
}

/// Mutable server status shared by the admin API.
#[derive(Debug)]
pub struct ServerStatus {
    mode: RwLock<Mode>,
    statistics_interval_secs: AtomicU64,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub mode: Mode,
    pub statistics_interval: u64,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
}

impl ServerStatus {
    pub fn new(mode: Mode, statistics_interval_secs: u64) -> Self {
        Self {
            mode: RwLock::new(mode),
            statistics_interval_secs: AtomicU64::new(statistics_interval_secs),
            started_at: Utc::now(),
        }
    }

    pub fn mode(&self) -> Mode {
        *self.mode.read()
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.write() = mode;
    }

    pub fn statistics_interval_secs(&self) -> u64 {
        self.statistics_interval_secs.load(Ordering::Relaxed)
    }

    pub fn set_statistics_interval_secs(&self, secs: u64) {
        self.statistics_interval_secs.store(secs, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            mode: self.mode(),
            statistics_interval: self.statistics_interval_secs(),
            version: env!("CARGO_PKG_VERSION"),
            started_at: self.started_at,
        }
    }
}

#[derive(Debug, Default)]
struct ResponseCounter {
    total: AtomicU64,
    current: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingStatistics {
    pub recording: String,
    /// Responses since the server started.
    pub total: u64,
    /// Responses since the last collection.
    pub current: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub collected_at: DateTime<Utc>,
    pub recordings: Vec<RecordingStatistics>,
}

/// Per-recording response counters.
#[derive(Debug, Default)]
pub struct Statistics {
    counters: RwLock<HashMap<String, Arc<ResponseCounter>>>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, recording: &str) {
        let existing = self.counters.read().get(recording).cloned();
        let counter = match existing {
            Some(counter) => counter,
            None => Arc::clone(
                self.counters
                    .write()
                    .entry(recording.to_string())
                    .or_default(),
            ),
        };
        counter.total.fetch_add(1, Ordering::Relaxed);
        counter.current.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters, sorted by recording. `reset` starts a new collection period.
    pub fn collect(&self, reset: bool) -> StatisticsReport {
        let counters = self.counters.read();
        let mut recordings: Vec<_> = counters
            .iter()
            .map(|(name, counter)| {
                let current = if reset {
                    counter.current.swap(0, Ordering::Relaxed)
                } else {
                    counter.current.load(Ordering::Relaxed)
                };
                RecordingStatistics {
                    recording: name.clone(),
                    total: counter.total.load(Ordering::Relaxed),
                    current,
                }
            })
            .collect();
        recordings.sort_by(|a, b| a.recording.cmp(&b.recording));
        StatisticsReport {
            collected_at: Utc::now(),
            recordings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("playback_or_record".parse::<Mode>(), Ok(Mode::PlaybackOrRecord));
        assert_eq!(" PASSTHROUGH ".parse::<Mode>(), Ok(Mode::Passthrough));
        assert!("replay".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&Mode::PlaybackOrPassthrough).unwrap();
        assert_eq!(json, "\"PLAYBACK_OR_PASSTHROUGH\"");
        let mode: Mode = serde_yaml::from_str("RECORD").unwrap();
        assert_eq!(mode, Mode::Record);
    }

    #[test]
    fn test_status_updates() {
        let status = ServerStatus::new(Mode::Playback, 60);
        status.set_mode(Mode::Record);
        status.set_statistics_interval_secs(5);
        let snapshot = status.snapshot();
        assert_eq!(snapshot.mode, Mode::Record);
        assert_eq!(snapshot.statistics_interval, 5);
        assert_eq!(snapshot.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_statistics_collect_and_reset() {
        let stats = Statistics::new();
        stats.record("b");
        stats.record("a");
        stats.record("a");

        let report = stats.collect(true);
        assert_eq!(
            report.recordings,
            vec![
                RecordingStatistics {
                    recording: "a".into(),
                    total: 2,
                    current: 2
                },
                RecordingStatistics {
                    recording: "b".into(),
                    total: 1,
                    current: 1
                },
            ]
        );

        stats.record("a");
        let report = stats.collect(false);
        assert_eq!(report.recordings[0].total, 3);
        assert_eq!(report.recordings[0].current, 1);
        assert_eq!(report.recordings[1].current, 0);
    }
}
