//! In-memory storage backend for the Ephra booking core.
//!
//! Implements every store trait from `ephra-scheduling` on top of
//! `tokio::sync::RwLock`-guarded maps. Suitable for development, tests and
//! single-process deployments; nothing survives a restart.

pub mod seed;
pub mod storage;

pub use seed::{AssignmentSeed, SeedData};
pub use storage::InMemoryStore;

/// Type alias for a shareable in-memory store.
pub type SharedStore = std::sync::Arc<InMemoryStore>;

/// Creates an empty shared store.
pub fn create_store() -> SharedStore {
    std::sync::Arc::new(InMemoryStore::new())
}
