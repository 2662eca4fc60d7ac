//! Recording handlers: listing, activation, CRUD, relocation, upload, tree,
//! variables, snippets and simulation.

use crate::admin_api::state::AdminState;
use crate::admin_api::types::*;
use crate::pattern::{completions, extract_variables, SNIPPETS, SNIPPET_REGISTRY_VERSION};
use crate::recording::{CapturedRequest, Recording};
use crate::repository::{MatchStatus, Refresh, Relocation};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// GET /recordings - Map of every recording path to its activation flag
pub fn handle_list(state: Arc<AdminState>) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &state.repository.list())
}

/// PUT /recordings - Batch activation
pub async fn handle_activate(req: Request<Incoming>, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    let changes: BTreeMap<String, bool> = match json_body(req, "activation").await {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match state.repository.activate(&changes) {
        Ok(summary) => json_response(StatusCode::OK, &summary),
        Err(e) => repository_error(&e),
    }
}

/// GET /recordings/:path
pub fn handle_get(path: &str, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    match state.repository.get(path) {
        Ok((recording, activated)) => json_response(
            StatusCode::OK,
            &RecordingDetail {
                recording,
                activated,
            },
        ),
        Err(e) => repository_error(&e),
    }
}

/// PUT /recordings/:path - Save a whole document and report its match health
pub async fn handle_save(
    path: &str,
    req: Request<Incoming>,
    state: Arc<AdminState>,
) -> Response<Full<Bytes>> {
    let recording: Recording = match json_body(req, "recording").await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state.repository.save(path, recording) {
        Ok(outcome) if outcome.match_status == MatchStatus::CorruptedAfterSave => {
            error!("Recording {} differs from what was saved", path);
            json_response(StatusCode::INTERNAL_SERVER_ERROR, &outcome)
        }
        Ok(outcome) => {
            if !outcome.slow.is_empty() {
                warn!("Recording {} has slow fields: {:?}", path, outcome.slow);
            }
            json_response(StatusCode::OK, &outcome)
        }
        Err(e) => repository_error(&e),
    }
}

/// POST /recordings/:path - Create an empty recording, or a directory for a trailing `/`
pub fn handle_create(path: &str, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    match state.repository.create(path) {
        Ok(key) => json_response(StatusCode::CREATED, &serde_json::json!({ "path": key })),
        Err(e) => repository_error(&e),
    }
}

/// DELETE /recordings/:path
pub fn handle_delete(path: &str, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    match state.repository.delete(path) {
        Ok(removed) => json_response(StatusCode::OK, &serde_json::json!({ "removed": removed })),
        Err(e) => repository_error(&e),
    }
}

/// POST /recordings_move/:path and /recordings_copy/:path - body is the target
pub async fn handle_relocate(
    source: &str,
    mode: Relocation,
    req: Request<Incoming>,
    state: Arc<AdminState>,
) -> Response<Full<Bytes>> {
    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };
    let target = scalar_body(&body);
    match state.repository.relocate(source, &target, mode) {
        Ok(key) => json_response(StatusCode::OK, &serde_json::json!({ "path": key })),
        Err(e) => repository_error(&e),
    }
}

/// POST /upload - Import documents into a directory
pub async fn handle_upload(req: Request<Incoming>, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    let upload: UploadRequest = match json_body(req, "upload").await {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match state.repository.import(&upload.directory, upload.recordings) {
        Ok(keys) => json_response(StatusCode::CREATED, &serde_json::json!({ "imported": keys })),
        Err(e) => repository_error(&e),
    }
}

/// GET /recordings_tree - The tree, rebuilt when the listing changed or `force=true`
pub fn handle_tree(query: Option<&str>, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    let listing = state.repository.list();
    let mut view = state.tree_view.lock();
    let changed = view.refresh(&listing, query_flag(query, "force")) == Refresh::Rebuilt;
    match view.current() {
        Some(tree) => json_response(StatusCode::OK, &TreeResponse { changed, tree }),
        None => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Tree was not built"),
    }
}

/// GET /recordings_variables/:path - Capture groups usable in response templates
pub fn handle_variables(path: &str, state: Arc<AdminState>) -> Response<Full<Bytes>> {
    match state.repository.get(path) {
        Ok((recording, _)) => {
            let variables: Vec<VariableEntry> = extract_variables(&recording.request_pattern)
                .into_iter()
                .map(VariableEntry::from)
                .collect();
            json_response(StatusCode::OK, &variables)
        }
        Err(e) => repository_error(&e),
    }
}

/// GET /snippets - Regex fragments offered by the editor
pub fn handle_snippets() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "version": SNIPPET_REGISTRY_VERSION,
        "snippets": SNIPPETS,
        "completions": completions(),
    });
    json_response(StatusCode::OK, &body)
}

/// POST /simulate - Answer a captured request from the activated recordings
///
/// With `delay=true` the response is held back by the simulated delay.
pub async fn handle_simulate(
    query: Option<&str>,
    req: Request<Incoming>,
    state: Arc<AdminState>,
) -> Response<Full<Bytes>> {
    let request: CapturedRequest = match json_body(req, "request").await {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let response = if query_flag(query, "delay") {
        state.simulator.serve(&request).await
    } else {
        state.simulator.respond(&request)
    };
    match response {
        Some(response) => {
            info!(
                "Simulated request answered by {} (template {})",
                response.recording, response.template_index
            );
            json_response(StatusCode::OK, &response)
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            "No activated recording matches the request",
        ),
    }
}
