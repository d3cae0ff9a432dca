//! Wire payloads for the `balance` and `handle_request` methods.
//!
//! These are the typed bodies carried inside the JSON-RPC envelope. The
//! router receives a [`ClientRequest`], forwards the identical payload to a
//! backend, and answers the client with a [`BalanceResponse`] built from the
//! backend's [`BackendResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method the router exposes to clients.
pub const BALANCE_METHOD: &str = "balance";
/// Method the backends expose to the router.
pub const HANDLE_REQUEST_METHOD: &str = "handle_request";
/// Diagnostic method every ringroute server answers locally.
pub const INFO_METHOD: &str = "_info";

/// Fixed diagnostic message returned when no backend could serve a request.
pub const UNREACHABLE_MSG: &str = "cannot connect to app server";

/// A unit of client work: who is asking, and a one-shot identifier.
///
/// The pair drives backend selection. The router hashes
/// `address + request_id` (no separator), so a client that generates a fresh
/// identifier per call spreads its requests across the ring instead of
/// pinning to one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// The client's own address, as it reports it
    pub address: String,
    /// Unique per-request identifier (clients use UUIDs)
    pub request_id: String,
}

impl ClientRequest {
    pub fn new(address: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            request_id: request_id.into(),
        }
    }

    /// The string fed to the ring hash for this request.
    pub fn routing_key(&self) -> String {
        format!("{}{}", self.address, self.request_id)
    }
}

/// What a backend returns for one handled request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Human-readable outcome, e.g. `"handled by 127.0.0.1:9001"`
    pub msg: String,
    /// Result payload, passed through to the client untouched
    pub payload: Vec<Value>,
}

impl BackendResponse {
    pub fn new(msg: impl Into<String>, payload: Vec<Value>) -> Self {
        Self {
            msg: msg.into(),
            payload,
        }
    }
}

/// The router's answer to a `balance` call.
///
/// This is always a well-formed response: total failure is reported through
/// `forwarded = false` and [`UNREACHABLE_MSG`], never as an RPC error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Whether any backend successfully handled the call
    pub forwarded: bool,
    /// The backend's message, or the fixed diagnostic on total failure
    pub msg: String,
    /// The backend's payload, empty on total failure
    pub payload: Vec<Value>,
}

impl BalanceResponse {
    /// A backend served the request; carry its message and payload verbatim.
    pub fn forwarded(msg: impl Into<String>, payload: Vec<Value>) -> Self {
        Self {
            forwarded: true,
            msg: msg.into(),
            payload,
        }
    }

    /// Every attempt failed; nothing was forwarded.
    pub fn unreachable() -> Self {
        Self {
            forwarded: false,
            msg: UNREACHABLE_MSG.into(),
            payload: Vec::new(),
        }
    }
}
