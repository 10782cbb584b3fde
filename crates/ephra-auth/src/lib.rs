//! Scope-based authorization for the Ephra booking core.
//!
//! - [`scopes`]: the scope catalog and role bundles
//! - [`token`]: bearer token validation and signing-key resolution
//! - [`permission`]: pure permission predicates over a [`Principal`]
//! - [`session`]: server-side sessions for the admin surface
//! - [`middleware`]: axum extractors and error responses

pub mod config;
pub mod error;
pub mod middleware;
pub mod permission;
pub mod principal;
pub mod scopes;
pub mod session;
pub mod token;

pub use config::{AuthConfig, ConfigError, JwksCacheConfig, SessionConfig};
pub use error::AuthError;
pub use permission::AccessGrant;
pub use principal::Principal;
pub use scopes::Role;
pub use session::{InMemorySessionStore, Session, SessionStore};
pub use token::{KeyResolver, ResolvedKey, StaticKeyResolver, TokenValidator};
