//! Per-match response behaviors.
//!
//! # Supported Behaviors
//!
//! - `selection` - choose the response template (SEQUENTIAL cycling or weighted RANDOM)
//! - `delay` - simulated latency (NONE, FIXED, RANDOM, NORMAL, EXPONENTIAL)

mod delay;
mod selection;

pub use delay::{DelaySpec, DelayStrategy, MAX_DELAY_MS};
pub use selection::{
    explain, probability_percent, select_random, ResponseStrategy, Selection, SelectionEngine,
    TemplateCursor,
};
