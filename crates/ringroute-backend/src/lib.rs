//! ringroute Backend Application Server
//!
//! A backend instance answers the `handle_request` calls the router
//! forwards to it. Handling is stateless, so a request the router retries
//! on another instance produces an equivalent answer.
//!
//! The server speaks the same JSON-RPC over HTTP surface as the router, but
//! runs on a plain hyper accept loop rather than axum.

pub mod http_router;
pub mod http_server;
pub mod service;

pub use http_router::BackendRouter;
pub use http_server::HttpServer;
pub use service::AppServer;
