//! HTTP Transport Utilities
//!
//! Conversion between HTTP bodies and the JSON-RPC envelope, the
//! deadline-bounded call primitive every outbound RPC in the system goes
//! through, and the response builders used by raw hyper servers.
//!
//! # Example
//!
//! ```no_run
//! use ringroute_common::transport::{open_channel, HttpTransport};
//! use ringroute_common::protocol::JsonRpcRequest;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> ringroute_common::Result<()> {
//! let channel = open_channel();
//! let request = JsonRpcRequest::new("handle_request", json!({"address": "1.2.3.4", "request_id": "r1"}), json!("r1"));
//! let result = HttpTransport::call(&channel, "http://127.0.0.1:9001/", &request, Duration::from_secs(3)).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;

use crate::protocol::error::{Result, RingRouteError};
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// An incoming request as a raw hyper server sees it.
pub type HyperRequest = Request<Incoming>;

/// A fully buffered response ready to hand back to hyper.
pub type HyperResponse = Response<Full<Bytes>>;

/// A persistent plaintext HTTP/1 channel.
///
/// Cloning is cheap and clones share the underlying connection pool, so the
/// intended shape is one channel per peer, opened at startup and reused for
/// every call. Channels are safe for concurrent use from many tasks.
pub type HttpChannel = Client<HttpConnector, Full<Bytes>>;

/// Open a plaintext channel. Connections are established lazily on first use.
pub fn open_channel() -> HttpChannel {
    Client::builder(TokioExecutor::new()).build_http()
}

/// HTTP/JSON-RPC conversion helpers.
pub struct HttpTransport;

impl HttpTransport {
    /// Parse a JSON-RPC request from raw HTTP body bytes.
    pub fn parse_jsonrpc(body: Bytes) -> Result<JsonRpcRequest> {
        serde_json::from_slice(&body).map_err(RingRouteError::JsonSerialization)
    }

    /// Build an HTTP POST carrying `req` as its JSON body.
    pub fn post_request(url: &str, req: &JsonRpcRequest) -> Result<Request<Full<Bytes>>> {
        let body = serde_json::to_vec(req).map_err(RingRouteError::JsonSerialization)?;

        Request::builder()
            .method("POST")
            .uri(url)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| RingRouteError::Transport(format!("Failed to build request: {}", e)))
    }

    /// Read and parse a JSON-RPC response from an HTTP response.
    ///
    /// Non-2xx statuses are transport errors; JSON-RPC level failures are
    /// left in the envelope for [`Self::into_result`] to unpack.
    pub async fn read_response(response: hyper::Response<Incoming>) -> Result<JsonRpcResponse> {
        let status = response.status();
        if !status.is_success() {
            return Err(RingRouteError::Transport(format!(
                "HTTP status {}",
                status
            )));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| RingRouteError::Transport(format!("Failed to read response: {}", e)))?
            .to_bytes();

        serde_json::from_slice(&body).map_err(RingRouteError::JsonSerialization)
    }

    /// Wrap a JSON-RPC response in an HTTP 200 with a JSON body.
    ///
    /// JSON-RPC level failures ride inside a 200; HTTP status codes are
    /// reserved for requests that never made it into the protocol.
    pub fn to_http_response(jsonrpc: JsonRpcResponse) -> HyperResponse {
        let body = serde_json::to_vec(&jsonrpc).unwrap_or_default();

        let mut response = Response::new(Full::new(Bytes::from(body)));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    /// Wrap a JSON-RPC error envelope for `id` in an HTTP 200.
    pub fn to_http_error(id: Value, error: JsonRpcError) -> HyperResponse {
        Self::to_http_response(JsonRpcResponse::error(id, error))
    }

    /// Unpack a JSON-RPC response into its result value.
    pub fn into_result(response: JsonRpcResponse) -> Result<Value> {
        if let Some(error) = response.error {
            return Err(RingRouteError::Backend(error.message));
        }

        response.result.ok_or_else(|| {
            RingRouteError::InvalidResponse("response carries neither result nor error".into())
        })
    }

    /// One deadline-bounded JSON-RPC call over an open channel.
    ///
    /// Returns the result value on success. Elapsed deadlines map to
    /// [`RingRouteError::Timeout`], connection failures to
    /// [`RingRouteError::Unreachable`].
    pub async fn call(
        channel: &HttpChannel,
        url: &str,
        req: &JsonRpcRequest,
        deadline: Duration,
    ) -> Result<Value> {
        let http_request = Self::post_request(url, req)?;

        let response = tokio::time::timeout(deadline, channel.request(http_request))
            .await
            .map_err(|_| RingRouteError::Timeout(deadline.as_millis() as u64))?
            .map_err(|e| RingRouteError::Unreachable(format!("{}: {}", url, e)))?;

        let rpc_response = Self::read_response(response).await?;
        Self::into_result(rpc_response)
    }
}
