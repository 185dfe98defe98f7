//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Consumers:
//!     → stdout, one line per event
//! ```
//!
//! # Design Decisions
//! - Operator-facing messages (listening URLs, client disconnects, reaped
//!   connections) are emitted at info with structured fields alongside
//! - Per-connection failures stay at debug

pub mod logging;

#[cfg(test)]
pub(crate) mod capture;

pub use logging::{build_filter, default_filter, init_logging};
