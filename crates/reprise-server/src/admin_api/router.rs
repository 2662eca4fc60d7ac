//! Route dispatch logic for the Admin API.

use crate::admin_api::handlers::{recordings, system};
use crate::admin_api::state::AdminState;
use crate::admin_api::types::{decode_path, not_found};
use crate::repository::Relocation;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::sync::Arc;
use tracing::debug;

/// Parsed route for endpoints addressing one repository key
#[derive(Debug, PartialEq, Eq)]
enum KeyRoute<'a> {
    /// GET/PUT/POST/DELETE /recordings/:path
    Recording(&'a str),
    /// POST /recordings_move/:path
    Move(&'a str),
    /// POST /recordings_copy/:path
    Copy(&'a str),
    /// GET /recordings_variables/:path
    Variables(&'a str),
}

impl<'a> KeyRoute<'a> {
    /// Split a request path into the route and its still-encoded key
    fn parse(path: &'a str) -> Option<Self> {
        if let Some(rest) = path.strip_prefix("/recordings/") {
            Some(KeyRoute::Recording(rest))
        } else if let Some(rest) = path.strip_prefix("/recordings_move/") {
            Some(KeyRoute::Move(rest))
        } else if let Some(rest) = path.strip_prefix("/recordings_copy/") {
            Some(KeyRoute::Copy(rest))
        } else {
            path.strip_prefix("/recordings_variables/")
                .map(KeyRoute::Variables)
        }
    }

    fn raw_key(&self) -> &'a str {
        match self {
            KeyRoute::Recording(k)
            | KeyRoute::Move(k)
            | KeyRoute::Copy(k)
            | KeyRoute::Variables(k) => *k,
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    state: Arc<AdminState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());

    debug!("Admin API: {} {}", method, path);

    let response = route_by_path(&method, &path, query.as_deref(), req, state).await;
    Ok(response)
}

/// Route based on path
async fn route_by_path(
    method: &Method,
    path: &str,
    query: Option<&str>,
    req: Request<Incoming>,
    state: Arc<AdminState>,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/") => return system::handle_root(),
        (&Method::GET, "/health") => return system::handle_health(),
        (&Method::GET, "/status") => return system::handle_status(state),
        (&Method::PUT, "/status/mode") => return system::handle_set_mode(req, state).await,
        (&Method::PUT, "/status/statisticsInterval") => {
            return system::handle_set_statistics_interval(req, state).await
        }
        (&Method::GET, "/statistics/current") => return system::handle_statistics(query, state),
        (&Method::GET, "/configuration") => return system::handle_get_configuration(state).await,
        (&Method::PUT, "/configuration") => {
            return system::handle_put_configuration(req, state).await
        }
        (&Method::GET, "/snippets") => return recordings::handle_snippets(),
        (&Method::POST, "/simulate") => {
            return recordings::handle_simulate(query, req, state).await
        }
        (&Method::GET, "/recordings") => return recordings::handle_list(state),
        (&Method::PUT, "/recordings") => return recordings::handle_activate(req, state).await,
        (&Method::GET, "/recordings_tree") => return recordings::handle_tree(query, state),
        (&Method::POST, "/upload") => return recordings::handle_upload(req, state).await,
        _ => {}
    }

    match KeyRoute::parse(path) {
        Some(route) => route_key(method, route, req, state).await,
        None => not_found(),
    }
}

/// Route requests addressing one recording or directory
async fn route_key(
    method: &Method,
    route: KeyRoute<'_>,
    req: Request<Incoming>,
    state: Arc<AdminState>,
) -> Response<Full<Bytes>> {
    let key = match decode_path(route.raw_key()) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    match (method, route) {
        (&Method::GET, KeyRoute::Recording(_)) => recordings::handle_get(&key, state),
        (&Method::PUT, KeyRoute::Recording(_)) => recordings::handle_save(&key, req, state).await,
        (&Method::POST, KeyRoute::Recording(_)) => recordings::handle_create(&key, state),
        (&Method::DELETE, KeyRoute::Recording(_)) => recordings::handle_delete(&key, state),
        (&Method::POST, KeyRoute::Move(_)) => {
            recordings::handle_relocate(&key, Relocation::Move, req, state).await
        }
        (&Method::POST, KeyRoute::Copy(_)) => {
            recordings::handle_relocate(&key, Relocation::Copy, req, state).await
        }
        (&Method::GET, KeyRoute::Variables(_)) => recordings::handle_variables(&key, state),
        _ => not_found(),
    }
}
