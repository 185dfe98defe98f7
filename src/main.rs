//! clockstream: HTTP/2 over TLS demo server.
//!
//! Serves `/clockstream`, the wall-clock time once per second over a single
//! long-lived response.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                   CLOCKSTREAM                     │
//!                      │                                                   │
//!   Client             │  ┌──────────┐   ┌───────┐   ┌──────────────────┐ │
//!   ───────────────────┼─▶│   net    │──▶│  TLS  │──▶│ http server      │ │
//!                      │  │ listener │   │ (ALPN)│   │ (hyper h2/h1)    │ │
//!                      │  │keepalive │   └───────┘   └────────┬─────────┘ │
//!                      │  └──────────┘                        │           │
//!                      │                                      ▼           │
//!                      │                             ┌──────────────────┐ │
//!                      │      state transitions      │ dispatch         │ │
//!                      │   ┌─────────────────────────│ h2+TLS gate      │ │
//!                      │   ▼                         └────────┬─────────┘ │
//!                      │  ┌──────────┐                        ▼           │
//!                      │  │  idle    │                ┌──────────────────┐ │
//!   ◀──────────────────┼──│  reaper  │                │ /clockstream     │ │
//!     (closes stale    │  └──────────┘                │ 1 line / second  │ │
//!      connections)    │                             └──────────────────┘ │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clockstream::cli::Cli;
use clockstream::lifecycle::startup;
use clockstream::observability::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose());

    tracing::info!("clockstream v{} starting", env!("CARGO_PKG_VERSION"));
    if cli.prod() {
        tracing::info!("Production mode requested; it is reserved and changes nothing");
    }

    let config = match startup::resolve_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(
        bind_address = %config.listener.bind_address,
        cert = %config.tls.cert_path.display(),
        key = %config.tls.key_path.display(),
        "Configuration loaded"
    );

    match startup::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
