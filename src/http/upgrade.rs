//! Protocol upgrades (WebSocket and friends).
//!
//! # Responsibilities
//! - Check that a `101 Switching Protocols` answer matches what the caller asked for
//! - Take both connections over from hyper and copy bytes between them
//!
//! # Design Decisions
//! - The tunnel runs on its own task; the 101 head is relayed first, since
//!   the caller's side only upgrades once that head is written
//! - A 101 the caller never asked for, or for another protocol, is a gateway error

use axum::body::Body;
use axum::http::header::{HeaderMap, HeaderValue};
use axum::http::Response;
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

use crate::http::headers::{set_upgrade, strip_hop_by_hop, upgrade_type};
use crate::http::response::ProxyError;
use crate::load_balancer::BackendTarget;

/// A caller's pending upgrade: the protocol asked for and its half of the tunnel.
pub struct UpgradeRequest {
    pub protocol: HeaderValue,
    pub connection: OnUpgrade,
}

/// The protocol both sides agreed on, judged from the backend's 101 headers.
pub fn negotiated(
    target: &BackendTarget,
    requested: Option<&HeaderValue>,
    response_headers: &HeaderMap,
) -> Result<HeaderValue, ProxyError> {
    let requested = requested.ok_or_else(|| ProxyError::UnexpectedUpgrade {
        backend: target.to_string(),
    })?;

    match upgrade_type(response_headers) {
        Some(offered) if offered.as_bytes().eq_ignore_ascii_case(requested.as_bytes()) => Ok(offered),
        offered => Err(ProxyError::UpgradeMismatch {
            backend: target.to_string(),
            requested: String::from_utf8_lossy(requested.as_bytes()).into_owned(),
            offered: offered
                .map(|p| String::from_utf8_lossy(p.as_bytes()).into_owned())
                .unwrap_or_default(),
        }),
    }
}

/// Relay a backend's `101` to the caller and splice the two connections.
pub fn switch_protocols(
    target: &BackendTarget,
    request: Option<UpgradeRequest>,
    mut response: Response<Incoming>,
) -> Result<Response<Body>, ProxyError> {
    let Some(request) = request else {
        return Err(ProxyError::UnexpectedUpgrade {
            backend: target.to_string(),
        });
    };
    let protocol = negotiated(target, Some(&request.protocol), response.headers())?;

    let upstream = hyper::upgrade::on(&mut response);
    tokio::spawn(tunnel(target.to_string(), request.connection, upstream));

    let (mut parts, _) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    set_upgrade(&mut parts.headers, protocol);

    Ok(Response::from_parts(parts, Body::empty()))
}

async fn tunnel(backend: String, caller: OnUpgrade, upstream: OnUpgrade) {
    let (caller, upstream) = match tokio::try_join!(caller, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(backend = %backend, error = %e, "Upgrade failed");
            return;
        }
    };

    let mut caller = TokioIo::new(caller);
    let mut upstream = TokioIo::new(upstream);

    match tokio::io::copy_bidirectional(&mut caller, &mut upstream).await {
        Ok((sent, received)) => {
            tracing::debug!(backend = %backend, sent, received, "Upgraded connection closed");
        }
        Err(e) => {
            tracing::debug!(backend = %backend, error = %e, "Upgraded connection aborted");
        }
    }
}
