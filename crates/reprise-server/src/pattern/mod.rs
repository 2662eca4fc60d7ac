//! Regex request patterns.
//!
//! A recording matches an incoming request when every one of the eight
//! request fields fully matches its regex. This module owns:
//!
//! - `field` - the eight request fields
//! - `anchor` - the `^…$` canonicalization applied at the serialization boundary
//! - `request` - the `RequestPattern` document type and its compiled form
//! - `snippets` - the static registry of editor regex fragments
//! - `variables` - capture group discovery (`$field:group$` tokens)
//! - `validator` - per-field match health against the original request

mod anchor;
mod field;
mod request;
mod snippets;
mod validator;
mod variables;

pub use anchor::{anchor, escape_literal, unanchor};
pub use field::RequestField;
pub use request::{
    compile_field, CompiledRequestPattern, FieldCaptures, PatternError, RequestCaptures,
    RequestPattern,
};
pub use snippets::{completions, suggest, Snippet, DEFAULT_GROUP_NAME, SNIPPETS, SNIPPET_REGISTRY_VERSION};
pub use validator::{validate_field, validate_match, MatchValidation, NO_MATCH, SLOW_MATCH_MS};
pub use variables::{extract_variables, Variable};
