//! TCP listener that turns on kernel keepalive for every accepted socket.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enable TCP keepalive so dead peers are noticed without application traffic

use std::net::SocketAddr;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

/// Keepalive probe period applied to every accepted socket.
pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(3 * 60);

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

/// A TCP listener whose accepted sockets carry OS keepalive.
#[derive(Debug)]
pub struct KeepaliveListener {
    inner: TcpListener,
}

impl KeepaliveListener {
    /// Bind to `address` (e.g. `"127.0.0.1:4430"`).
    pub async fn bind(address: &str) -> Result<Self, ListenerError> {
        let bind_err = |source: std::io::Error| ListenerError::Bind {
            address: address.to_string(),
            source,
        };

        let addr: SocketAddr = address
            .parse()
            .map_err(|e| bind_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        tracing::debug!(address = %local_addr, "Listener bound");

        Ok(Self { inner: listener })
    }

    /// Accept a new connection with keepalive enabled.
    ///
    /// Accept errors are returned unchanged. Failing to configure keepalive is
    /// logged and otherwise ignored.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        if let Err(e) = enable_keepalive(&stream) {
            tracing::debug!(peer_addr = %addr, error = %e, "Failed to enable TCP keepalive");
        }

        tracing::debug!(peer_addr = %addr, "Connection accepted");

        Ok((stream, addr))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}

/// Turn on SO_KEEPALIVE with [`KEEPALIVE_PERIOD`] as the probe period.
///
/// The period is used both as the idle time before the first probe and, where
/// the platform allows it, as the gap between probes. The probe count stays at
/// the OS default.
fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_PERIOD);
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "windows",
    ))]
    let keepalive = keepalive.with_interval(KEEPALIVE_PERIOD);

    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}
