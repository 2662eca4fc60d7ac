//! Simulated response latency.

use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

/// Upper bound for every delay parameter: one hour.
pub const MAX_DELAY_MS: u64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayStrategy {
    #[default]
    None,
    /// Always `mean`
    Fixed,
    /// Uniform in `[min, max]`
    Random,
    /// Normal centered between `min` and `max`, clamped to the range
    Normal,
    /// `min` plus an exponential draw with the given `mean`, capped at `max`
    Exponential,
}

/// Delay parameters with every value clamped to `[0, MAX_DELAY_MS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelaySpec {
    pub strategy: DelayStrategy,
    pub min_ms: u64,
    pub mean_ms: u64,
    pub max_ms: u64,
}

fn clamp_ms(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0).min(MAX_DELAY_MS)
}

impl DelaySpec {
    pub fn new(strategy: DelayStrategy, min: i64, mean: i64, max: i64) -> Self {
        Self {
            strategy,
            min_ms: clamp_ms(min),
            mean_ms: clamp_ms(mean),
            max_ms: clamp_ms(max),
        }
    }

    /// Get the delay in milliseconds using the thread-local generator
    pub fn get_duration_ms(&self) -> u64 {
        self.sample(&mut rand::thread_rng())
    }

    /// Draw a delay in milliseconds.
    ///
    /// NONE and FIXED never touch `rng`. A `max` below `min` is treated as `min`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let min = self.min_ms;
        let max = self.max_ms.max(min);
        match self.strategy {
            DelayStrategy::None => 0,
            DelayStrategy::Fixed => self.mean_ms,
            DelayStrategy::Random => rng.gen_range(min..=max),
            DelayStrategy::Normal => {
                if min == max {
                    return min;
                }
                let center = (min + max) as f64 / 2.0;
                let sigma = (max - min) as f64 / 6.0;
                let value = match Normal::new(center, sigma) {
                    Ok(normal) => normal.sample(rng),
                    Err(_) => center,
                };
                value.clamp(min as f64, max as f64) as u64
            }
            DelayStrategy::Exponential => {
                let extra = if self.mean_ms == 0 {
                    0.0
                } else {
                    match Exp::new(1.0 / self.mean_ms as f64) {
                        Ok(exp) => exp.sample(rng),
                        Err(_) => self.mean_ms as f64,
                    }
                };
                (min as f64 + extra).min(max as f64) as u64
            }
        }
    }
}
