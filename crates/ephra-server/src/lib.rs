//! HTTP surface of the Ephra booking core.
//!
//! [`state::Services`] wires the scheduling, authorization and reminder
//! crates together; [`server::build_app`] exposes them over axum.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use server::{EphraServer, ServerBuilder, build_app};
pub use state::{AppState, Services};
