//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the backend response to the caller without buffering the body
//! - Strip hop-by-hop headers from the relayed response
//! - Map forwarding failures to `502 Bad Gateway`
//!
//! # Design Decisions
//! - The backend body is wrapped, never collected; a transport error mid-body
//!   aborts the caller's response and bytes already sent stay sent
//! - Every forwarding failure maps to the same status so callers can tell
//!   gateway failures apart from backend answers

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use hyper::body::Incoming;
use thiserror::Error;

use crate::http::headers::strip_hop_by_hop;

/// Per-request forwarding failures.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The outbound URI could not be assembled for this backend.
    #[error("cannot build request uri for backend {backend}: {source}")]
    InvalidUri {
        backend: String,
        #[source]
        source: axum::http::Error,
    },

    /// Connecting to or talking with the backend failed before a response head arrived.
    #[error("backend {backend} unreachable: {source}")]
    BackendUnreachable {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// The backend switched protocols although the caller asked for no upgrade.
    #[error("backend {backend} switched protocols without an upgrade request")]
    UnexpectedUpgrade { backend: String },

    /// The backend switched to a protocol other than the one requested.
    #[error("backend {backend} upgraded to {offered:?}, caller asked for {requested:?}")]
    UpgradeMismatch {
        backend: String,
        requested: String,
        offered: String,
    },
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
    }
}

/// Convert a backend response into the response sent to the caller.
pub fn relay(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_uri_maps_to_bad_gateway() {
        let source = axum::http::Uri::builder()
            .path_and_query("not a path")
            .build()
            .unwrap_err();
        let err = ProxyError::InvalidUri {
            backend: "http://b:1".into(),
            source,
        };

        assert!(err.to_string().starts_with("cannot build request uri for backend http://b:1"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
