//! Request inspection.
//!
//! # Responsibilities
//! - Detect whether the inbound connection is encrypted
//! - Extract the request host (URI authority or `Host` header)
//! - Rebuild the absolute URL a crawler asked for
//!
//! # Design Decisions
//! - The request is only read, never modified
//! - Path and query are kept byte-for-byte as received

use axum::http::{header, uri::Scheme, Request};

/// Request extension marking a connection accepted over TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundTls;

/// `https` for TLS connections, `http` otherwise.
pub fn inbound_scheme<B>(request: &Request<B>) -> &'static str {
    let tls = request.extensions().get::<InboundTls>().is_some()
        || request.uri().scheme() == Some(&Scheme::HTTPS);
    if tls {
        "https"
    } else {
        "http"
    }
}

/// Host the client addressed, including the port if one was given.
pub fn request_host<B>(request: &Request<B>) -> &str {
    if let Some(authority) = request.uri().authority() {
        return authority.as_str();
    }
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
}

/// Original request target (path plus query).
pub fn path_and_query<B>(request: &Request<B>) -> &str {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
}

/// Absolute URL handed to the render backend.
pub fn target_url(scheme: &str, host: &str, path_and_query: &str) -> String {
    format!("{}://{}{}", scheme, host, path_and_query)
}
