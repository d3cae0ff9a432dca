//! ringroute Router
//!
//! The router sits between clients and a fleet of backend application
//! servers. For every `balance` call it picks the owning backend on a
//! consistent-hash ring, forwards the request over a pre-opened channel, and
//! fails over to the remaining backends when the chosen one is unreachable.
//!
//! Ring and connection pool are built once at startup from the configured
//! backend list and never change afterwards, so request handling runs
//! without any locking.

pub mod balancer;
pub mod config;
pub mod http_router;
pub mod http_server;
pub mod pool;
pub mod registry;
pub mod ring;

pub use balancer::{Balancer, FailoverConfig};
pub use config::RouterConfig;
pub use http_router::RpcRouter;
pub use http_server::HttpServer;
pub use pool::{BackendStub, ChannelPool};
pub use registry::{Node, NodeRegistry};
pub use ring::{hash_label, HashRing, VirtualNode, VIRTUAL_NODES_PER_NODE};
