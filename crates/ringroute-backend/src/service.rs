//! The application service behind the router.

use serde_json::json;
use tracing::debug;

use ringroute_common::{BackendResponse, ClientRequest};

/// One backend application server instance.
///
/// The workload echoes the request id back, prefixed with the serving
/// instance's identity, so callers can see which backend handled a request.
/// Handling keeps no state between calls; the router relies on that when it
/// retries a request against another instance.
pub struct AppServer {
    identity: String,
}

impl AppServer {
    /// `identity` is the `address:port` string this instance appears as in
    /// router configuration.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Handles one forwarded client request.
    pub fn handle_request(&self, request: &ClientRequest) -> BackendResponse {
        debug!(
            "handling request {} from {}",
            request.request_id, request.address
        );

        BackendResponse::new(
            format!("handled by {}", self.identity),
            vec![json!(request.request_id)],
        )
    }
}
