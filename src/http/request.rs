//! Outbound request construction.
//!
//! # Responsibilities
//! - Point the inbound request at the selected backend (scheme, authority, path)
//! - Keep method, query, end-to-end headers and the streaming body as they are
//! - Keep an upgrade request (`Connection: upgrade`) and `TE: trailers`
//!
//! # Design Decisions
//! - A backend path *replaces* the inbound path; it is never used as a prefix
//! - A backend without a path keeps the inbound path; `http://h/` has path `/`
//! - Outbound requests are always HTTP/1.1 so any backend can accept them

use axum::body::Body;
use axum::http::{Extensions, Request, Uri, Version};

use crate::http::headers::strip_request_hop_by_hop;
use crate::http::response::ProxyError;
use crate::load_balancer::BackendTarget;

/// Compute the outbound URI for `inbound` when sent to `target`.
pub fn rewrite_uri(inbound: &Uri, target: &BackendTarget) -> Result<Uri, ProxyError> {
    let path = target.path().unwrap_or_else(|| inbound.path());
    let path_and_query = match inbound.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };

    Uri::builder()
        .scheme(target.scheme().clone())
        .authority(target.authority().clone())
        .path_and_query(path_and_query)
        .build()
        .map_err(|source| ProxyError::InvalidUri {
            backend: target.to_string(),
            source,
        })
}

/// Turn an inbound request into the request sent to `target`.
///
/// The body is moved, not read, so it streams to the backend.
pub fn build_outbound(request: Request<Body>, target: &BackendTarget) -> Result<Request<Body>, ProxyError> {
    let (mut parts, body) = request.into_parts();

    parts.uri = rewrite_uri(&parts.uri, target)?;
    parts.version = Version::HTTP_11;
    parts.extensions = Extensions::new();
    strip_request_hop_by_hop(&mut parts.headers);

    Ok(Request::from_parts(parts, body))
}
