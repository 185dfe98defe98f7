//! HTTP/2 over TLS server.
//!
//! # Responsibilities
//! - Accept connections from the keepalive listener
//! - Terminate TLS and serve HTTP/2 (HTTP/1.1 is still spoken, then refused
//!   by the dispatcher)
//! - Report every connection transition to the state hook
//! - Drop a connection as soon as its handle is closed (reaper timeouts)

use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{body::Body, extract::ConnectInfo, Router};
use bytes::Bytes;
use hyper::body::{Body as HttpBody, Frame, Incoming, SizeHint};
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;

use crate::http::dispatch::{build_router, TlsInfo};
use crate::net::connection::{ConnHandle, ConnStateHook, ConnectionActivity, RequestGuard};
use crate::net::listener::{KeepaliveListener, ListenerError};

/// Errors that stop the server loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// HTTP/2 TLS server for the clock demo.
pub struct HttpServer {
    router: Router,
    tls: TlsAcceptor,
    hook: Arc<dyn ConnStateHook>,
}

impl HttpServer {
    /// Create a server with the stock `/clockstream` router.
    pub fn new(tls: TlsAcceptor, hook: Arc<dyn ConnStateHook>) -> Self {
        Self::with_router(build_router(), tls, hook)
    }

    /// Create a server dispatching to `router`.
    pub fn with_router(router: Router, tls: TlsAcceptor, hook: Arc<dyn ConnStateHook>) -> Self {
        Self { router, tls, hook }
    }

    /// Accept connections until the listener fails.
    ///
    /// Each connection runs on its own task; a failed handshake or a protocol
    /// error only ends that connection.
    pub async fn run(self, listener: KeepaliveListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::debug!(address = %addr, "HTTP server starting");
        }

        loop {
            let (stream, remote_addr) = listener.accept().await?;

            let conn = ConnHandle::new(remote_addr);
            let activity = ConnectionActivity::start(conn, Arc::clone(&self.hook));

            tokio::spawn(serve_connection(
                stream,
                remote_addr,
                self.tls.clone(),
                self.router.clone(),
                activity,
            ));
        }
    }
}

/// Bind `address` and serve `router` over TLS until the listener fails.
pub async fn serve(
    address: &str,
    tls: TlsAcceptor,
    router: Router,
    hook: Arc<dyn ConnStateHook>,
) -> Result<(), ServerError> {
    let listener = KeepaliveListener::bind(address).await?;
    HttpServer::with_router(router, tls, hook).run(listener).await
}

async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    tls: TlsAcceptor,
    router: Router,
    activity: Arc<ConnectionActivity>,
) {
    let conn = activity.conn().clone();

    let session = async {
        let tls_stream = match tls.accept(stream).await {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(connection_id = %conn.id(), %remote_addr, error = %e, "TLS handshake failed");
                return;
            }
        };

        let tls_info = TlsInfo {
            alpn_protocol: tls_stream.get_ref().1.alpn_protocol().map(<[u8]>::to_vec),
        };
        tracing::debug!(
            connection_id = %conn.id(),
            %remote_addr,
            alpn = ?tls_info.alpn_protocol.as_deref().map(String::from_utf8_lossy),
            "TLS established"
        );

        let service = {
            let activity = Arc::clone(&activity);
            service_fn(move |mut request: Request<Incoming>| {
                request.extensions_mut().insert(ConnectInfo(remote_addr));
                request.extensions_mut().insert(tls_info.clone());

                let guard = activity.begin_request();
                let router = router.clone();
                async move {
                    let response = router.oneshot(request.map(Body::new)).await?;
                    Ok::<_, Infallible>(response.map(|body| TrackedBody::new(body, guard)))
                }
            })
        };

        let builder = auto::Builder::new(TokioExecutor::new());
        if let Err(e) = builder
            .serve_connection(TokioIo::new(tls_stream), service)
            .await
        {
            tracing::debug!(connection_id = %conn.id(), %remote_addr, error = %e, "Connection error");
        }
    };

    tokio::select! {
        () = session => {}
        () = conn.closed() => {
            tracing::debug!(connection_id = %conn.id(), %remote_addr, "Connection closed by reaper");
        }
    }

    activity.close();
}

/// Response body that keeps its request counted as in flight until the body
/// is finished or dropped.
struct TrackedBody {
    inner: Body,
    _guard: RequestGuard,
}

impl TrackedBody {
    fn new(inner: Body, guard: RequestGuard) -> Self {
        Self {
            inner,
            _guard: guard,
        }
    }
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
