//! HTTP and WebSocket gateway.
//!
//! The agent pushes canvas surfaces and status snapshots over authenticated
//! HTTP; browsers read them back and hold a WebSocket open for live canvas
//! updates.

pub mod auth;
pub mod canvas;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod server;
pub mod state;
pub mod status;

pub use server::{router, serve, start_gateway};
pub use state::GatewayState;
