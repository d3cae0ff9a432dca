pub mod error;
pub mod jsonrpc;
pub mod messages;

pub use error::{Result, RingRouteError};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use messages::{
    BackendResponse, BalanceResponse, ClientRequest, BALANCE_METHOD, HANDLE_REQUEST_METHOD,
    INFO_METHOD, UNREACHABLE_MSG,
};
