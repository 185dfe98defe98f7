//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load TLS key pair → Bind listener → Log URLs → Serve
//!
//! Reaping (reaper.rs):
//!     Connection transition → cancel pending close → arm new close
//!     Timer fires → close connection handle → server drops the socket
//! ```
//!
//! # Design Decisions
//! - Ordered startup: certificates first, listener last
//! - No shutdown phase: the process runs until the listener fails

pub mod reaper;
pub mod startup;

pub use reaper::{IdleReaper, ACTIVE_TIMEOUT, IDLE_TIMEOUT};
