use super::field::RequestField;
use super::request::{compile_field, RequestPattern};
use crate::recording::CapturedRequest;
use std::collections::BTreeMap;
use std::time::Instant;

/// Matches taking longer than this are reported as slow.
pub const SLOW_MATCH_MS: i64 = 50;

/// Field result for a regex that does not match (or does not compile).
pub const NO_MATCH: i64 = -1;

/// Match a single field body against the original value.
///
/// Returns `None` when there is no original value to match, `Some(-1)` when
/// the regex fails to compile or does not match, and otherwise the elapsed
/// match time in milliseconds. Compilation is not timed.
pub fn validate_field(body: &str, original: Option<&str>) -> Option<i64> {
    let original = original?;
    let Ok(regex) = compile_field(body) else {
        return Some(NO_MATCH);
    };
    let start = Instant::now();
    if regex.is_match(original) {
        Some(i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX))
    } else {
        Some(NO_MATCH)
    }
}

/// Per-field results of matching a pattern against its original request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchValidation {
    pub fields: BTreeMap<RequestField, Option<i64>>,
}

impl MatchValidation {
    /// Fields whose match took longer than `SLOW_MATCH_MS`.
    pub fn slow_fields(&self) -> Vec<RequestField> {
        self.fields
            .iter()
            .filter(|(_, result)| matches!(result, Some(ms) if *ms > SLOW_MATCH_MS))
            .map(|(field, _)| *field)
            .collect()
    }

    /// Fields with an original value that the pattern fails to match.
    pub fn failed_fields(&self) -> Vec<RequestField> {
        self.fields
            .iter()
            .filter(|(_, result)| **result == Some(NO_MATCH))
            .map(|(field, _)| *field)
            .collect()
    }
}

pub fn validate_match(pattern: &RequestPattern, original: &CapturedRequest) -> MatchValidation {
    let fields = RequestField::ALL
        .into_iter()
        .map(|field| (field, validate_field(pattern.get(field), original.get(field))))
        .collect();
    MatchValidation { fields }
}
