//! Request dispatch.
//!
//! Two levels, mirroring how the demo is wired:
//! - the root layer lets a request through only if it arrived over TLS and
//!   speaks HTTP/2; anything else gets an empty `200` and the connection stays
//!   up
//! - the inner router serves `/clockstream` and answers every other path with
//!   an empty `200`

use axum::{
    extract::Request,
    http::{StatusCode, Version},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::http::clock::clock_stream;

/// Marker extension for requests that arrived over a TLS connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsInfo {
    /// Protocol selected by ALPN, if any.
    pub alpn_protocol: Option<Vec<u8>>,
}

/// Build the application router.
pub fn build_router() -> Router {
    Router::new()
        .route("/clockstream", any(clock_stream))
        .fallback(drop_request)
        .layer(middleware::from_fn(require_h2_over_tls))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Whether a request may reach the inner router.
pub fn is_h2_over_tls(request: &Request) -> bool {
    request.extensions().get::<TlsInfo>().is_some() && request.version() == Version::HTTP_2
}

async fn require_h2_over_tls(request: Request, next: Next) -> Response {
    if !is_h2_over_tls(&request) {
        tracing::debug!(
            version = ?request.version(),
            path = %request.uri().path(),
            "Dropping request: HTTP/2 over TLS required"
        );
        return drop_request().await.into_response();
    }
    next.run(request).await
}

async fn drop_request() -> StatusCode {
    StatusCode::OK
}
