//! `/clockstream`: the current time, once per second, until the client leaves.
//!
//! The response starts with ~1 KiB of comment lines. Some browsers hold back
//! the first kilobyte of a streaming response before painting anything; the
//! padding gets the first timestamp on screen immediately.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::ConnectInfo,
    http::header,
    response::{IntoResponse, Response},
};
use tokio::time::{self, MissedTickBehavior};

use crate::http::sink::{ResponseSink, DEFAULT_CAPACITY};

/// First line of every clock stream.
pub const PROLOGUE_HEADER: &str = "# ~1KB of junk to force browsers to start rendering immediately: \n";

/// Number of padding lines after [`PROLOGUE_HEADER`].
pub const PADDING_LINES: usize = 13;

/// Number of `x` characters on each padding line.
pub const PADDING_WIDTH: usize = 78;

/// Interval between timestamps.
pub const TICK: Duration = Duration::from_secs(1);

/// Why a clock stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The disconnect signal fired while waiting for the next tick.
    PeerGone,
    /// A flush found the body already dropped.
    WriteFailed,
}

/// The full prologue: header line plus padding, 14 lines in all.
pub fn prologue() -> String {
    let padding = format!("# {}\n", "x".repeat(PADDING_WIDTH));
    let mut out = String::with_capacity(PROLOGUE_HEADER.len() + padding.len() * PADDING_LINES);
    out.push_str(PROLOGUE_HEADER);
    for _ in 0..PADDING_LINES {
        out.push_str(&padding);
    }
    out
}

/// Current local wall-clock time, e.g. `2026-10-19 14:03:07.123456789 +0200`.
pub fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.9f %z")
        .to_string()
}

/// Handler for `/clockstream`.
///
/// Returns the response head right away; the body is fed by a task running
/// [`run_clock`] for as long as the client keeps the stream open.
pub async fn clock_stream(ConnectInfo(remote_addr): ConnectInfo<SocketAddr>) -> Response {
    let (sink, body) = ResponseSink::channel(DEFAULT_CAPACITY);
    tokio::spawn(run_clock(remote_addr, sink));

    ([(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

/// Write the prologue, then one timestamp per [`TICK`] until the peer leaves.
///
/// Every line is flushed before waiting. The ticker is dropped on return.
pub async fn run_clock(remote_addr: SocketAddr, mut sink: ResponseSink) -> StreamEnd {
    let mut ticker = time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    sink.write_str(&prologue());

    loop {
        sink.write_str(&timestamp());
        sink.write_str("\n");

        if sink.flush().await.is_err() {
            tracing::info!(%remote_addr, "Client {remote_addr} disconnected from the clock");
            return StreamEnd::WriteFailed;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            () = sink.peer_gone() => {
                tracing::info!(%remote_addr, "Client {remote_addr} disconnected from the clock");
                return StreamEnd::PeerGone;
            }
        }
    }
}
