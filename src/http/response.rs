//! Response building.
//!
//! # Responsibilities
//! - Turn a routing outcome into a client response
//! - Describe a mapping as JSON (echo endpoint, admin lookup)
//! - Serve static files with a content type guessed from the extension

use std::path::Path;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mime::Mime;
use serde::Serialize;

use crate::http::endpoint::{ApplicationId, ServerHandles};
use crate::mapper::{MatchType, RoutingResult};

/// JSON description of how a request was mapped.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MappingReport {
    pub host: Option<String>,
    pub application: Option<String>,
    pub version: Option<String>,
    pub application_path: String,
    pub request_path: String,
    pub handler_path: String,
    pub path_info: Option<String>,
    pub match_type: Option<MatchType>,
    pub handler: Option<&'static str>,
    pub redirect: Option<String>,
    pub paused: bool,
    pub versions: Vec<String>,
}

impl MappingReport {
    pub fn from_result(result: &RoutingResult<ServerHandles>) -> Self {
        Self {
            host: result.host().map(|h| h.to_string()),
            application: result.application().map(ApplicationId::to_string),
            version: result.application_version().map(|v| v.version().to_string()),
            application_path: result.application_path().to_string(),
            request_path: result.request_path().to_string(),
            handler_path: result.handler_path().to_string(),
            path_info: result.path_info().map(str::to_string),
            match_type: result.match_type(),
            handler: result.handler().map(|h| h.kind()),
            redirect: result.redirect_path().map(str::to_string),
            paused: result.is_paused(),
            versions: result
                .applications_for_version_choice()
                .iter()
                .map(|a| a.version().to_string())
                .collect(),
        }
    }
}

/// `302 Found` to `location`, keeping the query string.
pub fn redirect(location: &str, query: Option<&str>) -> Response {
    let target = match query {
        Some(query) => format!("{location}?{query}"),
        None => location.to_string(),
    };
    match HeaderValue::from_str(&target) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => bad_request("Invalid redirect location"),
    }
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "No handler mapped").into_response()
}

pub fn paused() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Application is paused").into_response()
}

pub fn bad_request(message: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, message).into_response()
}

pub fn echo(report: MappingReport) -> Response {
    Json(report).into_response()
}

pub fn text(body: &str, content_type: &str) -> Response {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("text/plain; charset=utf-8"));
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body.to_string()).into_response()
}

/// Serve `path` from disk; directories and missing files are 404s.
pub async fn static_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let content_type = guess_mime(path);
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type.as_ref())
                .body(Body::from(bytes))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => not_found(),
        Err(e) if path.is_dir() => {
            tracing::debug!(path = ?path, error = %e, "Static path is a directory");
            not_found()
        }
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to read static file");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn guess_mime(path: &Path) -> Mime {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html") | Some("htm") => mime::TEXT_HTML_UTF_8,
        Some("css") => mime::TEXT_CSS_UTF_8,
        Some("js") | Some("mjs") => mime::APPLICATION_JAVASCRIPT_UTF_8,
        Some("json") => mime::APPLICATION_JSON,
        Some("txt") => mime::TEXT_PLAIN_UTF_8,
        Some("xml") => mime::TEXT_XML,
        Some("csv") => mime::TEXT_CSV_UTF_8,
        Some("svg") => mime::IMAGE_SVG,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("pdf") => mime::APPLICATION_PDF,
        Some("woff") => mime::FONT_WOFF,
        Some("woff2") => mime::FONT_WOFF2,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
