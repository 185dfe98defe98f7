//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve the configuration (file or built-in defaults)
//! - Load the TLS key pair before anything touches the network
//! - Bind the keepalive listener
//! - Construct the idle reaper and hand it to the server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - There is no graceful shutdown; the server runs until the listener fails
//!   or the process exits

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{load_config, ConfigError, ServerConfig};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::reaper::IdleReaper;
use crate::net::listener::{KeepaliveListener, ListenerError};
use crate::net::tls::{load_tls_config, TlsError};

/// Errors that abort the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),

    #[error("listener setup failed: {0}")]
    Listener(#[from] ListenerError),

    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("server stopped: {0}")]
    Server(#[from] ServerError),
}

/// Load `path` if given, otherwise use the built-in defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<ServerConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(ServerConfig::default()),
    }
}

/// Run the clock server described by `config`.
///
/// Returns only on error.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let tls = load_tls_config(&config.tls.cert_path, &config.tls.key_path).await?;

    let listener = KeepaliveListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr().map_err(StartupError::LocalAddr)?;

    let url = format!("https://{local_addr}/");
    tracing::info!("Listening on {url}");
    tracing::info!("Path:{url}clockstream");

    let reaper = Arc::new(IdleReaper::new());
    HttpServer::new(tls, reaper).run(listener).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::capture::CapturedLogs;
    use std::time::Duration;

    #[test]
    fn config_file_errors_are_startup_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("clockstream.toml");

        let err = resolve_config(Some(&missing)).unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::Io(_))));

        let defaults = resolve_config(None).unwrap();
        assert_eq!(defaults.listener.bind_address, "127.0.0.1:4430");
    }

    #[tokio::test]
    async fn announces_listening_url_and_path() {
        let logs = CapturedLogs::install();

        let dir = tempfile::tempdir().unwrap();
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let mut config = ServerConfig::default();
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config.tls.cert_path = dir.path().join("rootCA.pem");
        config.tls.key_path = dir.path().join("rootCA.key");
        std::fs::write(&config.tls.cert_path, cert.pem()).unwrap();
        std::fs::write(&config.tls.key_path, key_pair.serialize_pem()).unwrap();

        let server = tokio::spawn(run(config));

        let mut url = None;
        for _ in 0..100 {
            url = logs
                .contents()
                .lines()
                .find_map(|line| line.split_once("Listening on ").map(|(_, u)| u.trim().to_string()));
            if url.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let url = url.expect("no listening line logged");

        assert!(url.starts_with("https://127.0.0.1:"), "unexpected url {url}");
        assert!(url.ends_with('/'));
        assert_eq!(logs.count(&format!("Path:{url}clockstream")), 1);

        let addr = url.trim_start_matches("https://").trim_end_matches('/');
        tokio::net::TcpStream::connect(addr).await.unwrap();

        server.abort();
    }

    #[tokio::test]
    async fn missing_certificate_aborts_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = reserved.local_addr().unwrap();
        drop(reserved);

        let mut config = ServerConfig::default();
        config.listener.bind_address = addr.to_string();
        config.tls.cert_path = dir.path().join("rootCA.pem");
        config.tls.key_path = dir.path().join("rootCA.key");

        let err = run(config).await.unwrap_err();
        assert!(matches!(err, StartupError::Tls(TlsError::CertificateNotFound(_))));

        // The address was never taken.
        std::net::TcpListener::bind(addr).unwrap();
    }
}
