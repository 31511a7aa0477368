//! Typed access to the document checker backend.
//!
//! [`RemoteGateway`] is the single HTTP path every backend call takes, so a
//! non-success response always surfaces as [`GatewayError::Request`] with the
//! status code and raw body. [`DocCheckerApi`] names the five endpoints the
//! orchestration layers depend on; [`HttpBackend`] implements it on top of the
//! gateway and tests substitute in-memory fakes.

mod backend;
mod client;
pub mod wire;

pub use backend::{DocCheckerApi, HttpBackend};
pub use client::{GatewayError, RemoteGateway};
