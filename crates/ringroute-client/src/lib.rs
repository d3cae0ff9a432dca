//! ringroute Client
//!
//! Issues `balance` calls against a router. Each call carries a freshly
//! generated request identifier, so consecutive calls from the same client
//! land on different backends.

pub mod client;

pub use client::{RouterClient, DEFAULT_TIMEOUT};
