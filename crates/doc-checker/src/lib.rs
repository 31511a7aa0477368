//! Client core for checking grant application documents against an
//! opportunity's manifest: opportunity selection, submission identity,
//! direct-to-storage uploads, and validation status.

pub mod config;
pub mod error;
pub mod gateway;
pub mod manifest;
pub mod session;
pub mod status;
pub mod submission;
pub mod telemetry;
pub mod upload;
pub mod view;

pub use session::{DocCheckerSession, SessionError};
