//! Backend node registry.
//!
//! The registry is the leaf of the router: an immutable list of backend
//! endpoints loaded once from configuration. The hash ring and the
//! connection pool are both built from it, and nothing mutates it after
//! startup.

use serde::{Deserialize, Serialize};

use ringroute_common::{Result, RingRouteError};

/// One backend application server endpoint.
///
/// Immutable once loaded. The `address:port` identity string is used as the
/// ring label prefix and as the connection-pool key, so it must be stable;
/// `localhost` is canonicalized to `127.0.0.1` when the registry is built to
/// keep identities independent of how the config spells the loopback host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub address: String,
    pub port: u16,
}

impl Node {
    /// Creates a node, canonicalizing the loopback address.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        let mut address = address.into();
        if address == "localhost" {
            address = "127.0.0.1".to_string();
        }
        Self { address, port }
    }

    /// The `address:port` identity this node is known by everywhere.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Immutable, non-empty list of backend nodes.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
}

impl NodeRegistry {
    /// Builds the registry from configured nodes.
    ///
    /// An empty list is a configuration error: a router with no backends
    /// must refuse to start rather than accept traffic it cannot forward.
    pub fn new(nodes: Vec<Node>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(RingRouteError::InvalidConfig(
                "no backends configured".to_string(),
            ));
        }

        // Re-run the constructor so deserialized nodes get canonicalized too.
        let nodes = nodes
            .into_iter()
            .map(|node| Node::new(node.address, node.port))
            .collect();

        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identities in configuration order.
    pub fn identities(&self) -> Vec<String> {
        self.nodes.iter().map(Node::identity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_identity_format() {
        let node = Node::new("10.0.0.5", 9001);
        assert_eq!(node.identity(), "10.0.0.5:9001");
    }

    #[test]
    fn test_localhost_is_canonicalized() {
        let node = Node::new("localhost", 9001);
        assert_eq!(node.address, "127.0.0.1");
        assert_eq!(node.identity(), "127.0.0.1:9001");
    }

    #[test]
    fn test_other_hostnames_untouched() {
        let node = Node::new("backend-a.internal", 9001);
        assert_eq!(node.address, "backend-a.internal");
    }

    #[test]
    fn test_registry_rejects_empty_list() {
        let result = NodeRegistry::new(vec![]);
        assert!(matches!(result, Err(RingRouteError::InvalidConfig(_))));
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry = NodeRegistry::new(vec![
            Node::new("127.0.0.1", 9002),
            Node::new("127.0.0.1", 9001),
        ])
        .unwrap();
        assert_eq!(
            registry.identities(),
            vec!["127.0.0.1:9002", "127.0.0.1:9001"]
        );
    }

    #[test]
    fn test_registry_canonicalizes_deserialized_nodes() {
        // Nodes coming straight out of serde bypass Node::new.
        let raw: Vec<Node> =
            serde_json::from_str(r#"[{"address": "localhost", "port": 9001}]"#).unwrap();
        assert_eq!(raw[0].address, "localhost");

        let registry = NodeRegistry::new(raw).unwrap();
        assert_eq!(registry.nodes()[0].address, "127.0.0.1");
    }
}
