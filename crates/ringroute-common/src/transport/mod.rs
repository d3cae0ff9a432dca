//! ringroute Transport Layer
//!
//! Every component talks JSON-RPC 2.0 over plaintext HTTP/1. This module
//! provides the channel type shared by the router's connection pool and the
//! client, plus the request/response conversion helpers the servers use.
//!
//! # Components
//!
//! - **[`HttpChannel`]** / **[`open_channel`]**: a persistent hyper client,
//!   one per peer, held for the process lifetime
//! - **[`HttpTransport`]**: parse/build/convert helpers and the
//!   deadline-bounded [`HttpTransport::call`]

pub mod http;

pub use http::{open_channel, HttpChannel, HttpTransport, HyperRequest, HyperResponse};
