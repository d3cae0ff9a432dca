//! HTTP server for the router.
//!
//! Serves the JSON-RPC surface over axum:
//! - JSON-RPC POST requests at `/`
//! - health probe at `/__health`
//!
//! The listener runs until SIGINT or SIGTERM, then drains in-flight
//! requests before returning.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use hyper::body::Bytes;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::info;

use ringroute_common::transport::HttpTransport;
use ringroute_common::{JsonRpcResponse, Result, RingRouteError};

use crate::balancer::Balancer;
use crate::http_router::RpcRouter;

/// HTTP server wrapping the JSON-RPC dispatcher.
pub struct HttpServer {
    router: Arc<RpcRouter>,
}

impl HttpServer {
    pub fn new(balancer: Arc<Balancer>) -> Self {
        let router = Arc::new(RpcRouter::new(balancer));
        Self { router }
    }

    /// Runs the server until a termination signal arrives.
    ///
    /// Binding failures are returned to the caller, which is expected to
    /// exit non-zero rather than continue half-initialized.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let app = axum::Router::new()
            .route("/", post(handle_jsonrpc))
            .route("/__health", get(health_check))
            .layer(CorsLayer::permissive())
            .with_state(self.router);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RingRouteError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        info!(
            "router listening on {}",
            listener
                .local_addr()
                .map_err(|e| RingRouteError::Transport(format!("Failed to get local addr: {}", e)))?
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RingRouteError::Transport(format!("Server error: {}", e)))?;

        Ok(())
    }
}

/// Handles JSON-RPC POST requests.
///
/// Bodies that are not valid JSON-RPC never reach the dispatcher; they are
/// rejected at the HTTP layer with status 400.
async fn handle_jsonrpc(
    State(router): State<Arc<RpcRouter>>,
    body: Bytes,
) -> std::result::Result<Json<JsonRpcResponse>, (StatusCode, String)> {
    let request = HttpTransport::parse_jsonrpc(body)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid JSON-RPC: {}", e)))?;

    Ok(Json(router.handle_request(request).await))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
