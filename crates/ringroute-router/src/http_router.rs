//! JSON-RPC method dispatch for the router.
//!
//! Two methods are served: `balance`, which is the routing entry point, and
//! the `_info` diagnostic. Everything else is a method-not-found error.
//!
//! A `balance` call always yields a JSON-RPC *success* envelope, even when
//! no backend answered; total failure travels inside the result as
//! `forwarded = false`. The only JSON-RPC errors a client can see are
//! malformed params, unknown methods, and internal invariant violations.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::error;

use ringroute_common::{
    ClientRequest, JsonRpcError, JsonRpcRequest, JsonRpcResponse, BALANCE_METHOD, INFO_METHOD,
};

use crate::balancer::Balancer;

/// Dispatches JSON-RPC requests to the balancer.
pub struct RpcRouter {
    balancer: Arc<Balancer>,
}

impl RpcRouter {
    pub fn new(balancer: Arc<Balancer>) -> Self {
        Self { balancer }
    }

    /// Handles one JSON-RPC request and always produces a response envelope.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();

        match req.method.as_str() {
            BALANCE_METHOD => {
                let request: ClientRequest = match serde_json::from_value(req.params) {
                    Ok(request) => request,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            JsonRpcError::invalid_params(&e.to_string()),
                        );
                    }
                };

                match self.balancer.balance(&request).await {
                    Ok(response) => match serde_json::to_value(&response) {
                        Ok(value) => JsonRpcResponse::success(id, value),
                        Err(e) => {
                            JsonRpcResponse::error(id, JsonRpcError::internal_error(&e.to_string()))
                        }
                    },
                    Err(e) => {
                        // Ring/pool inconsistency. The startup cross-check
                        // should have caught this, so shout.
                        error!("balance failed on internal error: {}", e);
                        JsonRpcResponse::error(id, JsonRpcError::internal_error(&e.to_string()))
                    }
                }
            }
            INFO_METHOD => JsonRpcResponse::success(id, self.server_info()),
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found()),
        }
    }

    fn server_info(&self) -> Value {
        json!({
            "server_type": "router",
            "backends": self.balancer.pool().len(),
            "ring_entries": self.balancer.ring().len(),
        })
    }
}
