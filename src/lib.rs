//! HTTP/2 over TLS clock streaming server library.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use http::{serve, HttpServer};
pub use lifecycle::IdleReaper;
pub use net::{ConnHandle, ConnStateHook, ConnectionState, KeepaliveListener};
