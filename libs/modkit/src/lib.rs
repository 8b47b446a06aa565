//! # ModKit
//!
//! Shared building blocks for the portal's modules:
//!
//! - [`api::problem`]: RFC 9457 problem responses for axum handlers
//! - [`http::client`]: a traced, timeout-bounded `reqwest` wrapper for outgoing calls
//! - [`health`]: the probe trait behind `/health`
//! - [`runtime::shutdown`]: OS signal handling wired to a cancellation token

pub use anyhow::Result;

pub mod api;
pub mod health;
pub mod http;
pub mod runtime;

pub use api::problem::{Problem, ProblemResponse};
pub use health::HealthCheck;
pub use http::client::TracedClient;
