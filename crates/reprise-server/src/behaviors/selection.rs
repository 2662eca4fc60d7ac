//! Response template selection.
//!
//! SEQUENTIAL returns each template `weight` times in a row before moving on to
//! the next template with a non-zero weight. RANDOM draws a template with
//! probability `weight / total`. Zero-weight templates are never returned
//! unless every weight is zero, in which case the first template is used.

use parking_lot::{RwLock, RwLockWriteGuard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStrategy {
    #[default]
    Sequential,
    Random,
}

/// Outcome of one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    /// Every weight was zero and the first template was used.
    pub fallback: bool,
}

/// A lock-free sequential cursor that packs template index and repeat index into a single AtomicU64
#[derive(Default)]
pub struct TemplateCursor(AtomicU64);

fn split(v: u64) -> (u32, u32) {
    ((v >> 32) as u32, v as u32)
}

fn join(template_idx: u32, repeat_idx: u32) -> u64 {
    (u64::from(template_idx) << 32) | u64::from(repeat_idx)
}

fn repeat_count(weight: u64) -> u32 {
    u32::try_from(weight).unwrap_or(u32::MAX)
}

/// First template at or after `from` (wrapping) with a non-zero weight.
fn next_eligible(weights: &[u64], from: usize) -> Option<usize> {
    let len = weights.len();
    (0..len)
        .map(|offset| (from + offset) % len)
        .find(|&idx| weights[idx] > 0)
}

/// Normalize a stored state against the current weights.
///
/// A state pointing at a zero-weight template, or past the end of the list,
/// moves to the next eligible template with a fresh repeat count.
fn current(weights: &[u64], state: u64) -> Option<(usize, u32)> {
    let (template_idx, repeat_idx) = split(state);
    let idx = next_eligible(weights, template_idx as usize)?;
    if idx != template_idx as usize || repeat_idx >= repeat_count(weights[idx]) {
        Some((idx, 0))
    } else {
        Some((idx, repeat_idx))
    }
}

impl TemplateCursor {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Template the next call to `advance` would return.
    #[must_use]
    pub fn peek(&self, weights: &[u64]) -> Option<usize> {
        current(weights, self.0.load(Ordering::Relaxed)).map(|(idx, _)| idx)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    /// Return the current template and move the cursor forward in one atomic step.
    ///
    /// Returns `None` when no template has a non-zero weight.
    #[must_use]
    pub fn advance(&self, weights: &[u64]) -> Option<usize> {
        let old_value = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                let (idx, repeat_idx) = current(weights, v)?;
                let repeat_idx = repeat_idx.saturating_add(1);
                if repeat_idx >= repeat_count(weights[idx]) {
                    let next = next_eligible(weights, idx + 1)?;
                    Some(join(next as u32, 0))
                } else {
                    Some(join(idx as u32, repeat_idx))
                }
            })
            .ok()?;
        current(weights, old_value).map(|(idx, _)| idx)
    }
}

impl fmt::Debug for TemplateCursor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (template_idx, repeat_idx) = split(self.0.load(Ordering::Relaxed));
        f.debug_struct("TemplateCursor")
            .field("template_idx", &template_idx)
            .field("repeat_idx", &repeat_idx)
            .finish()
    }
}

/// Draw an index with probability proportional to its weight.
pub fn select_random<R: Rng + ?Sized>(weights: &[u64], rng: &mut R) -> Option<usize> {
    let total: u64 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let mut point = rng.gen_range(0..total);
    for (idx, weight) in weights.iter().enumerate() {
        if point < *weight {
            return Some(idx);
        }
        point -= weight;
    }
    None
}

/// Sequential cursors for all recordings - protected by a single lock
#[derive(Default)]
struct CursorState {
    cursors: HashMap<String, TemplateCursor>,
}

/// Chooses the response template for each match.
///
/// Holds one sequential cursor per recording key. RANDOM selection is stateless.
#[derive(Default)]
pub struct SelectionEngine {
    state: RwLock<CursorState>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a template for `key`. Returns `None` only for an empty template list.
    pub fn select<R: Rng + ?Sized>(
        &self,
        key: &str,
        strategy: ResponseStrategy,
        weights: &[u64],
        rng: &mut R,
    ) -> Option<Selection> {
        if weights.is_empty() {
            return None;
        }

        let picked = match strategy {
            ResponseStrategy::Sequential => self.with_cursor(key, |cursor| cursor.advance(weights)),
            ResponseStrategy::Random => select_random(weights, rng),
        };

        Some(match picked {
            Some(index) => Selection {
                index,
                fallback: false,
            },
            None => {
                warn!(
                    recording = key,
                    "All response weights are zero, returning the first response"
                );
                Selection {
                    index: 0,
                    fallback: true,
                }
            }
        })
    }

    /// Template the next SEQUENTIAL selection would return, without advancing.
    pub fn peek(&self, key: &str, weights: &[u64]) -> Option<usize> {
        let state = self.state.read();
        match state.cursors.get(key) {
            Some(cursor) => cursor.peek(weights),
            None => next_eligible(weights, 0),
        }
    }

    /// Restart the cursor of `key` at the first template.
    pub fn reset(&self, key: &str) {
        let state = self.state.read();
        if let Some(cursor) = state.cursors.get(key) {
            cursor.reset();
        }
    }

    /// Drop the cursor of `key` and of every key below it when `key` is a directory.
    pub fn forget(&self, key: &str) {
        let mut state = self.state.write();
        if crate::recording::key::is_directory(key) {
            state.cursors.retain(|k, _| !k.starts_with(key));
        } else {
            state.cursors.remove(key);
        }
    }

    /// Reset all cursors
    pub fn reset_all(&self) {
        self.state.write().cursors.clear();
    }

    fn with_cursor<T>(&self, key: &str, f: impl FnOnce(&TemplateCursor) -> T) -> T {
        let mut state = self.state.read();
        // Opportunistically attempt to use just a read lock. If the cursor doesn't exist yet,
        // lock for writing, then downgrade
        let cursor = if let Some(cursor) = state.cursors.get(key) {
            cursor
        } else {
            drop(state);
            let mut write = self.state.write();
            write.cursors.entry(key.to_string()).or_default();
            state = RwLockWriteGuard::downgrade(write);
            state
                .cursors
                .get(key)
                .expect("We atomically downgraded the lock, the cursor we just inserted must exist")
        };
        f(cursor)
    }
}

/// Chance of template `index` under RANDOM, as a percentage rounded to one decimal.
pub fn probability_percent(weights: &[u64], index: usize) -> Option<f64> {
    let weight = *weights.get(index)?;
    let total: u64 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    Some((weight as f64 * 1000.0 / total as f64).round() / 10.0)
}

/// Human-readable description of how often template `index` is returned.
pub fn explain(strategy: ResponseStrategy, weights: &[u64], index: usize) -> String {
    let Some(&weight) = weights.get(index) else {
        return String::new();
    };
    if weight == 0 {
        return "This response will never be returned.".to_string();
    }
    match strategy {
        ResponseStrategy::Sequential => {
            let times = if weight == 1 { "time" } else { "times" };
            format!(
                "This response will be returned {weight} {times} before the next response is returned."
            )
        }
        ResponseStrategy::Random => {
            let total: u64 = weights.iter().sum();
            let percent = probability_percent(weights, index).unwrap_or(0.0);
            format!("This response will be returned {weight} of {total} times ({percent:.1}%).")
        }
    }
}
