//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, SO_KEEPALIVE with a 3 minute period)
//!     → tls.rs (rustls handshake, ALPN h2 / http/1.1)
//!     → connection.rs (identity, close signal, state transitions)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     New → Active ⇄ Idle → Closed
//! ```
//!
//! # Design Decisions
//! - Keepalive is best-effort: a socket that refuses it is still served
//! - Handles never own the socket; closing one only signals the owning task
//! - Transitions for one connection are serialized before reaching the hook

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{ConnHandle, ConnStateHook, ConnectionActivity, ConnectionId, ConnectionState};
pub use listener::{KeepaliveListener, ListenerError};
pub use tls::{load_tls_config, TlsError};
