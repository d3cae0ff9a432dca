//! ringroute Common Types and Transport
//!
//! This crate provides the protocol definitions and HTTP transport helpers
//! shared by every ringroute component.
//!
//! # Overview
//!
//! ringroute is a consistent-hashing request router: clients send work to a
//! router, the router picks a backend application server on a hash ring and
//! forwards the call, failing over to other backends when the chosen one is
//! unreachable. This crate contains the pieces all of that has in common:
//!
//! - **Protocol Layer**: the `balance` / `handle_request` message types, the
//!   JSON-RPC 2.0 envelope, and error handling
//! - **Transport Layer**: HTTP/JSON-RPC plumbing built on hyper
//!
//! # Components
//!
//! - [`protocol`] - Wire payloads, JSON-RPC envelope, [`RingRouteError`]
//! - [`transport`] - HTTP channel type and request/response helpers
//!
//! # Example
//!
//! ```
//! use ringroute_common::{ClientRequest, BalanceResponse};
//! use serde_json::json;
//!
//! let request = ClientRequest::new("10.0.0.7", "req-1");
//! assert_eq!(request.routing_key(), "10.0.0.7req-1");
//!
//! let response = BalanceResponse::forwarded("handled by 127.0.0.1:9001", vec![json!("req-1")]);
//! assert!(response.forwarded);
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
