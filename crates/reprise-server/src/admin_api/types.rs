//! Request and response types for the Admin API.

use crate::pattern::Variable;
use crate::recording::Recording;
use crate::repository::{RecordingTree, RepositoryError};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// A stored document together with its activation flag
#[derive(Debug, Serialize)]
pub struct RecordingDetail {
    #[serde(flatten)]
    pub recording: Recording,
    pub activated: bool,
}

/// Body of `POST /upload`
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Destination directory, the root when empty
    #[serde(default)]
    pub directory: String,
    pub recordings: BTreeMap<String, Recording>,
}

#[derive(Debug, Serialize)]
pub struct TreeResponse<'a> {
    /// Whether the tree differs from the one served last
    pub changed: bool,
    pub tree: &'a RecordingTree,
}

#[derive(Debug, Serialize)]
pub struct VariableEntry {
    #[serde(flatten)]
    pub variable: Variable,
    pub token: String,
}

impl From<Variable> for VariableEntry {
    fn from(variable: Variable) -> Self {
        let token = variable.token();
        Self { variable, token }
    }
}

/// Whether `name=true` appears in the query string
pub fn query_flag(query: Option<&str>, name: &str) -> bool {
    query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| key == name && value.eq_ignore_ascii_case("true"))
}

/// Decode a percent-encoded path remainder
pub fn decode_path(raw: &str) -> Result<String, Response<Full<Bytes>>> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &format!("Invalid path encoding: {e}")))
}

/// A scalar body sent either as a JSON string or as plain text
pub fn scalar_body(body: &[u8]) -> String {
    serde_json::from_slice::<String>(body)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string())
}

// =============================================================================
// Response helper functions
// =============================================================================

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Build an HTTP response with headers.
///
/// A builder failure yields a minimal 500 response.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(Full::new(body.into())).unwrap_or_else(|_| {
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

/// Map a repository failure to its HTTP status
pub fn repository_error(err: &RepositoryError) -> Response<Full<Bytes>> {
    let status = match err {
        RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
        RepositoryError::AlreadyExists(_) | RepositoryError::OriginalImmutable(_) => {
            StatusCode::CONFLICT
        }
        RepositoryError::InvalidPath { .. }
        | RepositoryError::NotARecording(_)
        | RepositoryError::IntoItself { .. }
        | RepositoryError::Validation(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

/// Create a not found response
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

/// Collect and deserialize a JSON body, answering 400 on failure
pub async fn json_body<T: serde::de::DeserializeOwned>(
    req: Request<Incoming>,
    what: &str,
) -> Result<T, Response<Full<Bytes>>> {
    let body = collect_body(req)
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e))?;
    serde_json::from_slice(&body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &format!("Invalid {what} JSON: {e}")))
}
