//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → consumed once by lifecycle::startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults; with no file the server runs on 127.0.0.1:4430
//!   with `keys/rootCA.pem` / `keys/rootCA.key`
//! - Reaper timeouts and the keepalive period are constants, not config

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ListenerConfig, ServerConfig, TlsConfig};
pub use validation::{validate_config, ValidationError};
