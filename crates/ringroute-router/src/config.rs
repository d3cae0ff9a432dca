//! Router configuration file loading.
//!
//! The config document is a JSON object with a `backends` array of
//! `{"address": ..., "port": ...}` entries. It seeds the node registry and
//! is read exactly once at startup; anything wrong with it is a fatal
//! [`RingRouteError::InvalidConfig`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ringroute_common::{Result, RingRouteError};

use crate::registry::{Node, NodeRegistry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub backends: Vec<Node>,
}

impl RouterConfig {
    /// Reads and parses the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let raw = fs::read_to_string(path).map_err(|e| {
            RingRouteError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            RingRouteError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Converts the parsed backend list into a registry.
    ///
    /// Fails when the list is empty, since a router without backends must
    /// not start.
    pub fn into_registry(self) -> Result<NodeRegistry> {
        NodeRegistry::new(self.backends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"{
                "backends": [
                    {"address": "127.0.0.1", "port": 9001},
                    {"address": "localhost", "port": 9002}
                ]
            }"#,
        );

        let config = RouterConfig::load(file.path()).unwrap();
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[0].port, 9001);

        let registry = config.into_registry().unwrap();
        assert_eq!(
            registry.identities(),
            vec!["127.0.0.1:9001", "127.0.0.1:9002"]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = RouterConfig::load("/nonexistent/router.json");
        assert!(matches!(result, Err(RingRouteError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_malformed_json() {
        let file = write_config("{\"backends\": [");
        let result = RouterConfig::load(file.path());
        assert!(matches!(result, Err(RingRouteError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_wrong_shape() {
        let file = write_config(r#"{"backends": [{"address": "127.0.0.1"}]}"#);
        let result = RouterConfig::load(file.path());
        assert!(matches!(result, Err(RingRouteError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_backend_list_fails_at_registry() {
        let file = write_config(r#"{"backends": []}"#);

        let config = RouterConfig::load(file.path()).unwrap();
        let result = config.into_registry();
        assert!(matches!(result, Err(RingRouteError::InvalidConfig(_))));
    }
}
