//! Push-style response bodies.
//!
//! A [`ResponseSink`] is the writing half of a streaming response: handlers
//! buffer text into it and [`flush`](ResponseSink::flush) each chunk out as one
//! body frame. The reading half is an axum [`Body`] handed to the server.
//!
//! The server drops the body when the stream is reset or the connection goes
//! away, which closes the channel. That closing is the peer-disconnect signal
//! exposed by [`ResponseSink::peer_gone`].

use std::convert::Infallible;

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures_util::stream;
use thiserror::Error;
use tokio::sync::mpsc;

/// Chunks that may sit between the handler and the transport before a flush
/// waits.
pub const DEFAULT_CAPACITY: usize = 16;

/// The response body was dropped: the peer is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("peer disconnected")]
pub struct PeerGone;

/// Writing half of a streaming response.
#[derive(Debug)]
pub struct ResponseSink {
    buf: BytesMut,
    tx: mpsc::Sender<Bytes>,
}

impl ResponseSink {
    /// Create a sink and the body it feeds.
    pub fn channel(capacity: usize) -> (Self, Body) {
        let (tx, rx) = mpsc::channel(capacity);
        let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|chunk| (Ok::<_, Infallible>(chunk), rx))
        }));

        let sink = Self {
            buf: BytesMut::new(),
            tx,
        };
        (sink, body)
    }

    /// Append `s` to the pending chunk. Nothing is sent until [`flush`](Self::flush).
    pub fn write_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Bytes written since the last flush.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Send everything written so far as one body frame.
    pub async fn flush(&mut self) -> Result<(), PeerGone> {
        if self.buf.is_empty() {
            return if self.tx.is_closed() { Err(PeerGone) } else { Ok(()) };
        }
        let chunk = self.buf.split().freeze();
        self.tx.send(chunk).await.map_err(|_| PeerGone)
    }

    /// Resolves once the peer has gone away.
    pub async fn peer_gone(&self) {
        self.tx.closed().await;
    }

    #[cfg(test)]
    fn is_peer_gone(&self) -> bool {
        self.tx.is_closed()
    }
}
