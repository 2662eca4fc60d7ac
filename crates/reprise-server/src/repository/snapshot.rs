//! JSON snapshot of the namespace.

use crate::recording::Recording;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Explicit directory placeholders.
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub recordings: BTreeMap<String, SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(default)]
    pub activated: bool,
    pub recording: Recording,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn invalid_data(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

/// Write the snapshot through a temp file and rename it into place.
pub fn save_to_file(path: &Path, snapshot: &Snapshot) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(snapshot).map_err(invalid_data)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    debug!(
        "Saved snapshot with {} recordings to {:?}",
        snapshot.recordings.len(),
        path
    );
    Ok(())
}

/// Read a snapshot, or `None` if the file does not exist.
pub fn load_from_file(path: &Path) -> Result<Option<Snapshot>, io::Error> {
    if !path.exists() {
        debug!("Snapshot file {:?} does not exist, starting fresh", path);
        return Ok(None);
    }
    let json = fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&json).map_err(invalid_data)?;
    info!(
        "Loaded {} recordings from {:?}",
        snapshot.recordings.len(),
        path
    );
    Ok(Some(snapshot))
}
