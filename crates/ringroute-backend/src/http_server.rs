//! HTTP server for a backend instance.
//!
//! Accepts connections on a plain hyper accept loop: one spawned task per
//! connection, JSON-RPC POST at `/`, health probe at `/__health`.

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Response};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tracing::{error, info};

use tokio::net::TcpListener;

use ringroute_common::transport::{HttpTransport, HyperRequest, HyperResponse};
use ringroute_common::{JsonRpcError, Result, RingRouteError};

use crate::http_router::BackendRouter;
use crate::service::AppServer;

/// HTTP server wrapping one backend instance.
pub struct HttpServer {
    router: Arc<BackendRouter>,
}

impl HttpServer {
    pub fn new(server: Arc<AppServer>) -> Self {
        let router = Arc::new(BackendRouter::new(server));
        Self { router }
    }

    /// Runs the accept loop until the listener fails.
    ///
    /// Binding failures are returned to the caller, which is expected to
    /// exit non-zero.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RingRouteError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;

        info!(
            "backend listening on {}",
            listener
                .local_addr()
                .map_err(|e| RingRouteError::Transport(format!("Failed to get local addr: {}", e)))?
        );

        loop {
            let (stream, _) = listener.accept().await.map_err(|e| {
                RingRouteError::Transport(format!("Failed to accept connection: {}", e))
            })?;

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move { Self::handle_request(router, req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {}", err);
                }
            });
        }
    }

    async fn handle_request(
        router: Arc<BackendRouter>,
        req: HyperRequest,
    ) -> Result<HyperResponse> {
        // Health probe answers before any JSON-RPC handling.
        if req.method() == Method::GET && req.uri().path() == "/__health" {
            return Ok(Response::new(Full::new(Bytes::from("OK"))));
        }

        if req.method() != Method::POST {
            return Ok(HttpTransport::to_http_error(
                json!(null),
                JsonRpcError::invalid_params("Only POST requests are supported"),
            ));
        }

        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| RingRouteError::Transport(format!("Failed to read request body: {}", e)))?
            .to_bytes();

        let jsonrpc_req = match HttpTransport::parse_jsonrpc(body) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Ok(HttpTransport::to_http_error(
                    json!(null),
                    JsonRpcError::parse_error(),
                ));
            }
        };

        Ok(HttpTransport::to_http_response(
            router.handle_request(jsonrpc_req).await,
        ))
    }
}
