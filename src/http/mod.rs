//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection
//!     → server.rs (hyper auto connection, state transitions)
//!     → dispatch.rs (HTTP/2 over TLS gate, path routing)
//!     → clock.rs (streaming handler)
//!     → sink.rs (buffered writes, flush per line, disconnect signal)
//!     → Send to client
//! ```

pub mod clock;
pub mod dispatch;
pub mod server;
pub mod sink;

pub use dispatch::{build_router, TlsInfo};
pub use server::{serve, HttpServer, ServerError};
pub use sink::{PeerGone, ResponseSink};
