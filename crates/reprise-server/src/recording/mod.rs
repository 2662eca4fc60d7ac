//! Recording documents: the request pattern and response templates stored
//! under each key of the repository.
//!
//! # Module Structure
//!
//! - `types` - document types and captured interactions
//! - `compiled` - the serve-time form of a document
//! - `key` - hierarchical key helpers
//! - `validation` - save-time validation and warnings

mod compiled;
pub mod key;
mod types;
mod validation;

pub use compiled::{CompiledRecording, CompiledResponse, RenderedResponse};
pub use types::{
    escape_template, CapturedRequest, CapturedResponse, Recording, ResponseTemplate,
};
pub use validation::ValidationError;
