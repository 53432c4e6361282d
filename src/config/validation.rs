//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every backend address must parse as a forwardable URL
//! - Bind address, timeouts and log level must be usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::load_balancer::{BackendTarget, ConfigurationError};

/// A single semantic problem in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("backends: {0}")]
    Backend(#[from] ConfigurationError),

    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("timeouts.connect_secs must be greater than zero")]
    ZeroConnectTimeout,

    #[error("logging.level {0:?} is not a log level")]
    LogLevel(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors: Vec<ValidationError> = Vec::new();

    if config.backends.is_empty() {
        errors.push(ConfigurationError::NoBackends.into());
    }
    for address in &config.backends {
        if let Err(e) = BackendTarget::parse(address) {
            errors.push(e.into());
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    if config.logging.level.parse::<tracing::Level>().is_err() {
        errors.push(ValidationError::LogLevel(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ProxyConfig::default();
        config.backends = vec!["http://ok:1".into(), "::bad::".into(), "gopher://x".into()];
        config.listener.bind_address = "localhost".into();
        config.timeouts.connect_secs = Some(0);
        config.logging.level = "loud".into();

        let errors = validate_config(&config).unwrap_err();

        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], ValidationError::Backend(ConfigurationError::InvalidAddress { .. })));
        assert!(matches!(errors[1], ValidationError::Backend(ConfigurationError::UnsupportedScheme { .. })));
        assert!(matches!(errors[2], ValidationError::BindAddress(_)));
        assert!(matches!(errors[3], ValidationError::ZeroConnectTimeout));
        assert!(matches!(errors[4], ValidationError::LogLevel(_)));
    }

    #[test]
    fn empty_backend_list_is_invalid() {
        let mut config = ProxyConfig::default();
        config.backends.clear();

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[..], [ValidationError::Backend(ConfigurationError::NoBackends)]));
    }
}
