//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Extract mapping inputs (host, path, version token)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The port never takes part in host matching

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request's ID, or `"unknown"` outside the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Host name the request is addressed to, without its port.
pub fn request_host<B>(request: &Request<B>) -> Option<&str> {
    let authority = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))?;
    let host = strip_port(authority);
    (!host.is_empty()).then_some(host)
}

/// Requested application version, if the client sent one.
pub fn version_token<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    match authority.rfind(':') {
        Some(colon) if authority[colon + 1..].bytes().all(|b| b.is_ascii_digit()) => {
            &authority[..colon]
        }
        _ => authority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(host: Option<&str>, uri: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_host_strips_port() {
        assert_eq!(request_host(&request(Some("shop.local:8080"), "/")), Some("shop.local"));
        assert_eq!(request_host(&request(Some("shop.local"), "/")), Some("shop.local"));
        assert_eq!(request_host(&request(Some("[::1]:8080"), "/")), Some("[::1]"));
    }

    #[test]
    fn test_host_falls_back_to_authority() {
        assert_eq!(request_host(&request(None, "http://a.com:81/x")), Some("a.com"));
        assert_eq!(request_host(&request(None, "/x")), None);
    }

    #[test]
    fn test_version_token() {
        let name = HeaderName::from_static("x-app-version");
        let mut headers = HeaderMap::new();
        assert_eq!(version_token(&headers, &name), None);
        headers.insert("x-app-version", HeaderValue::from_static(" 2 "));
        assert_eq!(version_token(&headers, &name), Some("2"));
    }

    #[test]
    fn test_uuid_request_ids_are_unique() {
        let mut make = UuidRequestId;
        let req = request(None, "/");
        let a = make.make_request_id(&req).unwrap();
        let b = make.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
