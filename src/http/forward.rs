//! Request forwarding to a selected backend.

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};

use crate::http::client::UpstreamClient;
use crate::http::headers::upgrade_type;
use crate::http::request::build_outbound;
use crate::http::response::{relay, ProxyError};
use crate::http::upgrade::{switch_protocols, UpgradeRequest};
use crate::load_balancer::BackendTarget;

/// Forward one request to `target` and return the streaming response.
///
/// Exactly one outbound request is issued. Failures are returned, not retried.
/// An upgrade request answered with `101` turns into a byte tunnel.
pub async fn forward(
    client: &UpstreamClient,
    target: &BackendTarget,
    mut request: Request<Body>,
) -> Result<Response<Body>, ProxyError> {
    let upgrade = upgrade_type(request.headers()).map(|protocol| UpgradeRequest {
        protocol,
        connection: hyper::upgrade::on(&mut request),
    });

    let outbound = build_outbound(request, target)?;

    tracing::trace!(uri = %outbound.uri(), "Sending upstream request");

    let pending = PendingForward::new(target, outbound.method().clone());
    let result = client.request(outbound).await;
    pending.finish();

    let response = result.map_err(|source| ProxyError::BackendUnreachable {
        backend: target.to_string(),
        source,
    })?;

    if response.status() == StatusCode::SWITCHING_PROTOCOLS {
        return switch_protocols(target, upgrade, response);
    }

    Ok(relay(response))
}

/// Notes forwards abandoned because the caller went away.
///
/// Hyper drops the handler future when the inbound connection closes; the
/// outbound request future, and with it the backend connection, goes with it.
struct PendingForward {
    backend: String,
    method: Method,
    finished: bool,
}

impl PendingForward {
    fn new(target: &BackendTarget, method: Method) -> Self {
        Self {
            backend: target.to_string(),
            method,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for PendingForward {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                backend = %self.backend,
                method = %self.method,
                "Caller disconnected before backend responded, forward abandoned"
            );
        }
    }
}
