//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server as a parsed, immutable URL
//! - Reject addresses that cannot be forwarded to (bad URL, scheme, host)

use std::fmt;

use axum::http::uri::{Authority, Scheme};
use thiserror::Error;
use url::Url;

/// Errors raised while building the backend set at startup.
///
/// Every variant is fatal: the proxy never starts serving with a bad backend list.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No backend addresses were supplied.
    #[error("no backend addresses configured")]
    NoBackends,

    /// The address is not a valid absolute URL.
    #[error("invalid backend address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    /// The address uses a scheme other than http or https.
    #[error("unsupported scheme {scheme:?} in backend address {address:?}")]
    UnsupportedScheme { address: String, scheme: String },

    /// The address has no host component.
    #[error("backend address {address:?} has no host")]
    MissingHost { address: String },
}

/// A single backend server.
///
/// Holds the pieces of the backend URL that are written into every outbound
/// request: scheme, authority (host and optional port) and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    /// Pre-calculated scheme for URI rewriting.
    scheme: Scheme,
    /// Pre-calculated authority for URI rewriting.
    authority: Authority,
    /// Path that replaces the inbound path, if the URL carries one.
    path: Option<String>,
}

impl BackendTarget {
    /// Parse a backend address such as `http://10.0.0.7:8001` or `https://api.internal/v1`.
    pub fn parse(address: &str) -> Result<Self, ConfigurationError> {
        let url = Url::parse(address).map_err(|source| ConfigurationError::InvalidAddress {
            address: address.to_string(),
            source,
        })?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => {
                return Err(ConfigurationError::UnsupportedScheme {
                    address: address.to_string(),
                    scheme: other.to_string(),
                })
            }
        };

        let host = url.host_str().ok_or_else(|| ConfigurationError::MissingHost {
            address: address.to_string(),
        })?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|_| ConfigurationError::MissingHost {
                address: address.to_string(),
            })?;

        // `url` reports "/" for `http://h` too, so look at the raw address.
        let path = if has_explicit_path(address) {
            Some(url.path().to_string())
        } else {
            None
        };

        Ok(Self {
            scheme,
            authority,
            path,
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Path that overrides the inbound request path, or `None` to keep it.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// Whether the text after the authority starts with `/`.
fn has_explicit_path(address: &str) -> bool {
    let rest = address.split_once("://").map_or(address, |(_, rest)| rest);
    rest.find(['/', '?', '#'])
        .map_or(false, |i| rest[i..].starts_with('/'))
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.path().unwrap_or(""))
    }
}
