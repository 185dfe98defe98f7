//! TLS configuration and certificate loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

/// ALPN protocols offered to clients, most preferred first.
pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// Errors raised while loading the server certificate.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate file not found: {}", .0.display())]
    CertificateNotFound(PathBuf),

    #[error("private key file not found: {}", .0.display())]
    PrivateKeyNotFound(PathBuf),

    #[error("failed to load key pair: {0}")]
    Load(#[source] std::io::Error),
}

/// Load the server key pair from PEM files and build an acceptor that
/// negotiates HTTP/2 via ALPN.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, TlsError> {
    if !cert_path.exists() {
        return Err(TlsError::CertificateNotFound(cert_path.to_path_buf()));
    }
    if !key_path.exists() {
        return Err(TlsError::PrivateKeyNotFound(key_path.to_path_buf()));
    }

    let rustls = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(TlsError::Load)?;

    let mut server_config = (*rustls.get_inner()).clone();
    server_config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

    tracing::debug!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        "TLS key pair loaded"
    );

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}
