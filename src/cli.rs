//! Command line surface.
//!
//! Flags may be spelled Go-style with one dash (`-verbose`, `-prod=true`) or
//! with two (`--verbose`).

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

const LONG_FLAGS: [&str; 3] = ["prod", "verbose", "config"];

#[derive(Debug, Parser, PartialEq, Eq)]
#[command(name = "clockstream")]
#[command(about = "HTTP/2 over TLS server streaming the wall clock", long_about = None)]
pub struct Cli {
    /// Whether to configure itself to be the production server. Reserved; currently has no effect.
    #[arg(long, default_missing_value = "true", num_args = 0..=1, require_equals = true)]
    pub prod: Option<bool>,

    /// Verbose HTTP/2 debugging.
    #[arg(long, default_missing_value = "true", num_args = 0..=1, require_equals = true)]
    pub verbose: Option<bool>,

    /// Optional TOML file overriding the listener address and key pair paths.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse the process arguments.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn prod(&self) -> bool {
        self.prod.unwrap_or(false)
    }

    pub fn verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }
}

/// Rewrite `-flag` / `-flag=value` into `--flag` / `--flag=value` for the
/// known long flags. Everything else passes through untouched.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(s) = arg.to_str() else { return arg };
            let Some(rest) = s.strip_prefix('-') else { return arg };
            if rest.starts_with('-') {
                return arg;
            }
            let name = rest.split('=').next().unwrap_or(rest);
            if LONG_FLAGS.contains(&name) {
                OsString::from(format!("-{s}"))
            } else {
                arg
            }
        })
        .collect()
}
