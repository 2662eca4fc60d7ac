//! Admin REST API for the recording editor.
//!
//! This module exposes the repository and its collaborators over HTTP:
//! - Listing, activating, reading, saving, creating and deleting recordings
//! - Moving, copying and uploading recordings
//! - The recording tree, capture variables and regex snippets
//! - Simulating a request against the activated recordings
//! - Server status, statistics, configuration and health
//!
//! The API listens on a configurable address (default: 127.0.0.1:8181).

mod handlers;
mod router;
mod server;
mod state;
mod types;

pub use server::AdminApiServer;
pub use state::AdminState;
