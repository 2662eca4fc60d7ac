//! Repository outcomes and errors.

use crate::pattern::RequestField;
use crate::recording::ValidationError;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("no recording or directory at '{0}'")]
    NotFound(String),

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("'{0}' is a directory, not a recording")]
    NotARecording(String),

    #[error("cannot move or copy '{from}' into itself ('{to}')")]
    IntoItself { from: String, to: String },

    #[error("the original request and response of '{0}' cannot be changed once set")]
    OriginalImmutable(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a batch activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivationSummary {
    /// Recordings whose state changed.
    pub loaded: usize,
    /// Recordings already in the desired state, unknown paths, and recordings
    /// whose pattern does not compile.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    Move,
    Copy,
}

/// Overall result of the post-save match check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// The stored document differs from what was saved.
    CorruptedAfterSave,
    /// There is no original request to match against.
    NoOriginal,
    Validated,
}

impl MatchStatus {
    pub fn code(&self) -> i64 {
        match self {
            MatchStatus::CorruptedAfterSave => -2,
            MatchStatus::NoOriginal => -1,
            MatchStatus::Validated => 0,
        }
    }
}

impl Serialize for MatchStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

/// Response body of a save: match status plus one entry per request field.
///
/// A field is `null` when the original request has no value for it, `-1`
/// when the pattern does not match, and otherwise the match time in ms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub match_status: MatchStatus,
    #[serde(flatten)]
    pub fields: BTreeMap<RequestField, Option<i64>>,
    pub slow: Vec<RequestField>,
    pub warnings: Vec<String>,
}
