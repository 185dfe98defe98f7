//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once, from `main`
//! - Pick the default filter, widening it to HTTP/2 frame events when verbose
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` replaces the built-in default; `-verbose` still adds its
//!   directives on top of it

use tracing_subscriber::{
    filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Directives enabled by verbose mode.
///
/// `h2`/`hyper` debug output logs every HTTP/2 frame sent and received.
const VERBOSE_DIRECTIVES: [&str; 4] = [
    "clockstream=debug",
    "h2=debug",
    "hyper=debug",
    "tower_http=debug",
];

/// Default filter directives.
pub fn default_filter(verbose: bool) -> String {
    if verbose {
        VERBOSE_DIRECTIVES.join(",")
    } else {
        "clockstream=info,tower_http=info".to_string()
    }
}

/// Build the filter from an optional `RUST_LOG` value.
///
/// An unparsable value falls back to the default. With `verbose` the frame
/// logging directives are added to whatever the environment asked for.
pub fn build_filter(env: Option<&str>, verbose: bool) -> EnvFilter {
    let Some(mut filter) = env.and_then(|env| EnvFilter::try_new(env).ok()) else {
        return EnvFilter::new(default_filter(verbose));
    };

    if verbose {
        for directive in VERBOSE_DIRECTIVES {
            if let Ok(directive) = directive.parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Install the global subscriber.
pub fn init_logging(verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(build_filter(env.as_deref(), verbose))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
