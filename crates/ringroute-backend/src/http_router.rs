//! JSON-RPC method dispatch for a backend server.
//!
//! Serves `handle_request` and the `_info` diagnostic; anything else is a
//! method-not-found error.

use std::sync::Arc;

use serde_json::{json, Value};

use ringroute_common::{
    ClientRequest, JsonRpcError, JsonRpcRequest, JsonRpcResponse, HANDLE_REQUEST_METHOD,
    INFO_METHOD,
};

use crate::service::AppServer;

/// Dispatches JSON-RPC requests to the application service.
pub struct BackendRouter {
    server: Arc<AppServer>,
}

impl BackendRouter {
    pub fn new(server: Arc<AppServer>) -> Self {
        Self { server }
    }

    /// Handles one JSON-RPC request and always produces a response envelope.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();

        match req.method.as_str() {
            HANDLE_REQUEST_METHOD => {
                let request: ClientRequest = match serde_json::from_value(req.params) {
                    Ok(request) => request,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            JsonRpcError::invalid_params(&e.to_string()),
                        );
                    }
                };

                let response = self.server.handle_request(&request);
                match serde_json::to_value(&response) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => {
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
            "server_type": "backend",
            "identity": self.server.identity(),
        })
    }
}
