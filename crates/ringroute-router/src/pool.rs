//! Backend connection pool.
//!
//! One persistent plaintext channel and client stub per backend, opened
//! before the listener starts and shared read-only by every request task.
//! Entries are never added or removed at runtime; membership changes mean a
//! restart with new configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use ringroute_common::transport::{open_channel, HttpChannel, HttpTransport};
use ringroute_common::{
    BackendResponse, ClientRequest, JsonRpcRequest, Result, RingRouteError, HANDLE_REQUEST_METHOD,
};

use crate::registry::NodeRegistry;

/// Client stub for one backend, bound to its persistent channel.
#[derive(Clone)]
pub struct BackendStub {
    identity: String,
    url: String,
    channel: HttpChannel,
}

impl BackendStub {
    /// Creates the stub for `identity`. The channel connects lazily on first
    /// use, so this never fails even when the backend is down.
    pub fn connect(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            url: format!("http://{identity}/"),
            channel: open_channel(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Invokes `handle_request` on the backend with a bounded deadline.
    ///
    /// May be retried against another stub by the caller, so backends must
    /// treat the call as idempotent.
    pub async fn handle_request(
        &self,
        request: &ClientRequest,
        deadline: Duration,
    ) -> Result<BackendResponse> {
        let rpc = JsonRpcRequest::new(
            HANDLE_REQUEST_METHOD,
            serde_json::to_value(request)?,
            json!(request.request_id),
        );

        let value = HttpTransport::call(&self.channel, &self.url, &rpc, deadline).await?;

        serde_json::from_value(value).map_err(|e| {
            RingRouteError::InvalidResponse(format!("backend {}: {}", self.identity, e))
        })
    }
}

/// All backend stubs, keyed by `address:port` identity.
pub struct ChannelPool {
    stubs: HashMap<String, BackendStub>,
}

impl ChannelPool {
    /// Opens one stub per registry node.
    pub fn connect(registry: &NodeRegistry) -> Self {
        let mut stubs = HashMap::new();

        for node in registry.nodes() {
            let identity = node.identity();
            stubs.insert(identity.clone(), BackendStub::connect(&identity));
        }

        info!("connection pool ready with {} backends", stubs.len());
        Self { stubs }
    }

    /// Looks up the stub for a backend identity.
    pub fn resolve(&self, identity: &str) -> Option<&BackendStub> {
        self.stubs.get(identity)
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    /// Identities present in the pool, in no particular order.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.stubs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Node;

    fn pool_for(ports: &[u16]) -> ChannelPool {
        let registry = NodeRegistry::new(
            ports
                .iter()
                .map(|&port| Node::new("127.0.0.1", port))
                .collect(),
        )
        .unwrap();
        ChannelPool::connect(&registry)
    }

    #[test]
    fn test_pool_holds_one_stub_per_backend() {
        let pool = pool_for(&[9001, 9002]);
        assert_eq!(pool.len(), 2);
        assert!(pool.resolve("127.0.0.1:9001").is_some());
        assert!(pool.resolve("127.0.0.1:9002").is_some());
        assert!(pool.resolve("127.0.0.1:9999").is_none());
    }

    #[test]
    fn test_stub_keeps_its_identity() {
        let pool = pool_for(&[9001]);
        let stub = pool.resolve("127.0.0.1:9001").unwrap();
        assert_eq!(stub.identity(), "127.0.0.1:9001");
    }

    #[tokio::test]
    async fn test_handle_request_against_dead_backend() {
        // Reserve a port and close it so the connect is refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let stub = BackendStub::connect(&format!("127.0.0.1:{port}"));
        let request = ClientRequest::new("1.2.3.4", "req-1");

        let err = stub
            .handle_request(&request, Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, RingRouteError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_handle_request_deadline_elapses() {
        // Listener that accepts the TCP handshake but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let stub = BackendStub::connect(&format!("127.0.0.1:{port}"));
        let request = ClientRequest::new("1.2.3.4", "req-1");

        let err = stub
            .handle_request(&request, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, RingRouteError::Timeout(200)));

        drop(listener);
    }
}
