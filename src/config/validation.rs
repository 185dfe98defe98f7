//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the bind address and certificate locations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("tls.cert_path is empty")]
    EmptyCertPath,

    #[error("tls.key_path is empty")]
    EmptyKeyPath,
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.tls.cert_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyCertPath);
    }
    if config.tls.key_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyKeyPath);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
