//! Axum extractors for bearer-token and session authentication.
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use ephra_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn whoami(BearerAuth(principal): BearerAuth) -> String {
//!     principal.subject_id().to_string()
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .with_state(auth_state);
//! ```

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth, SESSION_HEADER, SessionAuth};
pub use error::error_body;
