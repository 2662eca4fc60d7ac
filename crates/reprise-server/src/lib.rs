// Library exports for the binary and the integration tests

pub mod admin_api;
pub mod behaviors;
pub mod config;
pub mod logging;
pub mod matcher;
pub mod pattern;
pub mod recording;
pub mod repository;
pub mod status;
pub mod template;
