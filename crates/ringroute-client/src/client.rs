//! Client for making balance calls against a router.

use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use ringroute_common::transport::{open_channel, HttpChannel, HttpTransport};
use ringroute_common::{
    BalanceResponse, ClientRequest, JsonRpcRequest, Result, RingRouteError, BALANCE_METHOD,
};

/// Default time to wait for the router to answer one balance call.
///
/// The router may spend its whole attempt budget before responding, so this
/// sits well above it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client bound to one router endpoint.
///
/// Holds a persistent channel to the router. A `balance` call without an
/// explicit request generates a fresh identifier each time, which is what
/// spreads a client's requests across the ring.
#[derive(Clone)]
pub struct RouterClient {
    router_url: String,
    address: String,
    channel: HttpChannel,
    timeout: Duration,
}

impl RouterClient {
    /// Creates a client for `router_url`, e.g. `http://127.0.0.1:9000/`.
    ///
    /// The channel connects lazily, so this succeeds even while the router
    /// is still starting.
    pub fn new(router_url: impl Into<String>) -> Self {
        Self {
            router_url: router_url.into(),
            address: "127.0.0.1".to_string(),
            channel: open_channel(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the address this client reports as its own in requests.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn router_url(&self) -> &str {
        &self.router_url
    }

    /// One unit of work with a freshly generated request identifier.
    pub fn next_request(&self) -> ClientRequest {
        ClientRequest::new(self.address.clone(), Uuid::new_v4().to_string())
    }

    /// Issues one balance call with a fresh request identifier.
    pub async fn balance(&self) -> Result<BalanceResponse> {
        self.balance_request(&self.next_request()).await
    }

    /// Issues a balance call for an explicit request.
    ///
    /// A `forwarded = false` response is still `Ok`; errors mean the router
    /// itself could not be reached or answered out of protocol.
    pub async fn balance_request(&self, request: &ClientRequest) -> Result<BalanceResponse> {
        let rpc = JsonRpcRequest::new(
            BALANCE_METHOD,
            serde_json::to_value(request)?,
            json!(request.request_id),
        );

        let value =
            HttpTransport::call(&self.channel, &self.router_url, &rpc, self.timeout).await?;

        serde_json::from_value(value)
            .map_err(|e| RingRouteError::InvalidResponse(format!("router response: {}", e)))
    }
}
