//! Hop-by-hop header handling.
//!
//! Hop-by-hop headers describe a single transport connection and are never
//! relayed by a proxy (RFC 9110 §7.6.1). Everything else passes through as-is.
//! Two connection-level intents survive the hop: a protocol upgrade request
//! and `TE: trailers`.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Headers that are always connection-scoped.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

fn has_token(headers: &HeaderMap, name: HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case(token))
}

/// The protocol named in `Upgrade`, if `Connection` asks for an upgrade.
pub fn upgrade_type(headers: &HeaderMap) -> Option<HeaderValue> {
    if !has_token(headers, header::CONNECTION, "upgrade") {
        return None;
    }
    headers.get(header::UPGRADE).cloned()
}

/// Re-add the upgrade request after stripping.
pub fn set_upgrade(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(header::UPGRADE, protocol);
}

/// Strip hop-by-hop headers from a request bound for a backend.
///
/// Keeps a pending protocol upgrade and the `trailers` token of `TE`.
pub fn strip_request_hop_by_hop(headers: &mut HeaderMap) {
    let upgrade = upgrade_type(headers);
    let trailers = has_token(headers, header::TE, "trailers");

    strip_hop_by_hop(headers);

    if trailers {
        headers.insert(header::TE, HeaderValue::from_static("trailers"));
    }
    if let Some(protocol) = upgrade {
        set_upgrade(headers, protocol);
    }
}
