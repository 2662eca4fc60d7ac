//! System handlers: root, health, status, statistics, configuration.

use crate::admin_api::state::AdminState;
use crate::admin_api::types::*;
use crate::config::Config;
use crate::status::Mode;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{error, info};

/// GET / - Links to the top-level resources
pub fn handle_root() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "_links": {
            "recordings": {"href": "/recordings"},
            "tree": {"href": "/recordings_tree"},
            "snippets": {"href": "/snippets"},
            "status": {"href": "/status"},
            "statistics": {"href": "/statistics/current"},
            "configuration": {"href": "/configuration"}
        }
    });
    json_response(StatusCode::OK, &body)
}

/// GET /health - Health check
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}

/// GET /status
pub fn handle_status(state: Arc<AdminState>) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &state.status.snapshot())
}

/// PUT /status/mode - body is one of the mode names
pub async fn handle_set_mode(req: Request<Incoming>, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };
    let mode: Mode = match scalar_body(&body).parse() {
        Ok(m) => m,
        Err(e) => {
            let expected: Vec<&str> = Mode::ALL.iter().map(Mode::as_str).collect();
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("{e}, expected one of {}", expected.join(", ")),
            );
        }
    };
    state.status.set_mode(mode);
    info!("Server mode set to {}", mode);
    json_response(StatusCode::OK, &state.status.snapshot())
}

/// PUT /status/statisticsInterval - body is a number of seconds, at least 1
pub async fn handle_set_statistics_interval(
    req: Request<Incoming>,
    state: Arc<AdminState>,
) -> Response<Full<Bytes>> {
    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };
    let secs = match scalar_body(&body).parse::<u64>() {
        Ok(s) if s >= 1 => s,
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Statistics interval must be a whole number of seconds, at least 1",
            )
        }
    };
    state.status.set_statistics_interval_secs(secs);
    info!("Statistics interval set to {}s", secs);
    json_response(StatusCode::OK, &state.status.snapshot())
}

/// GET /statistics/current - Per-recording counters, reset with `reset=true`
pub fn handle_statistics(query: Option<&str>, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    let report = state.statistics.collect(query_flag(query, "reset"));
    json_response(StatusCode::OK, &report)
}

/// GET /configuration - The raw YAML configuration file
pub async fn handle_get_configuration(state: Arc<AdminState>) -> Response<Full<Bytes>> {
    let Some(path) = &state.config_path else {
        return error_response(StatusCode::NOT_FOUND, "Server was started without a configuration file");
    };
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => build_response_with_headers(
            StatusCode::OK,
            [("Content-Type", "application/yaml")],
            contents,
        ),
        Err(e) => {
            error!("Failed to read configuration {}: {}", path.display(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

/// PUT /configuration - Replace the YAML file after checking it parses
///
/// The new configuration takes effect on the next start.
pub async fn handle_put_configuration(
    req: Request<Incoming>,
    state: Arc<AdminState>,
) -> Response<Full<Bytes>> {
    let Some(path) = &state.config_path else {
        return error_response(StatusCode::NOT_FOUND, "Server was started without a configuration file");
    };
    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };
    let contents = match std::str::from_utf8(&body) {
        Ok(c) => c,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("Configuration is not UTF-8: {e}")),
    };
    if let Err(e) = Config::from_yaml_str(contents) {
        return error_response(StatusCode::BAD_REQUEST, &format!("Invalid configuration: {e}"));
    }
    match tokio::fs::write(path, contents).await {
        Ok(()) => {
            info!("Configuration {} replaced", path.display());
            json_response(StatusCode::OK, &serde_json::json!({"saved": true}))
        }
        Err(e) => {
            error!("Failed to write configuration {}: {}", path.display(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}
