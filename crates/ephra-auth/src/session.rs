//! Server-side sessions for the admin surface.
//!
//! A session binds an opaque id to the principal that created it and
//! expires a fixed time after creation. Expired sessions are invisible to
//! `get` and are removed by [`spawn_sweeper`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ephra_core::Clock;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::AuthError;
use crate::principal::Principal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub principal: Principal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Storage for server-side sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session for `principal`.
    async fn create(&self, principal: Principal) -> Result<Session, AuthError>;

    /// Returns the session if it exists and has not expired.
    async fn get(&self, id: &str) -> Result<Option<Session>, AuthError>;

    /// Removes a session. Returns `false` if it did not exist.
    async fn invalidate(&self, id: &str) -> Result<bool, AuthError>;

    /// Removes every expired session and returns how many were dropped.
    async fn sweep_expired(&self) -> Result<usize, AuthError>;
}

/// Process-local [`SessionStore`].
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, principal: Principal) -> Result<Session, AuthError> {
        let now = self.clock.now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            principal,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        tracing::debug!(subject = %session.principal.subject_id(), "Session created");
        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, AuthError> {
        let now = self.clock.now();
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .filter(|s| !s.is_expired_at(now))
            .cloned())
    }

    async fn invalidate(&self, id: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn sweep_expired(&self) -> Result<usize, AuthError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        Ok(before - sessions.len())
    }
}

/// Periodically sweeps expired sessions until the task is aborted.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match store.sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Swept expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scopes::Role;
    use ephra_core::FixedClock;
    use time::macros::datetime;

    fn store(clock: Arc<FixedClock>) -> InMemorySessionStore {
        InMemorySessionStore::new(Duration::from_secs(8 * 3600), clock)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let clock = Arc::new(FixedClock::new(datetime!(2030-01-01 09:00 UTC)));
        let store = store(clock.clone());
        let principal = Principal::with_role_scopes("admin-1", Role::Admin);

        let session = store.create(principal.clone()).await.unwrap();
        assert_eq!(session.expires_at, datetime!(2030-01-01 17:00 UTC));

        let found = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(found.principal, principal);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_hidden_and_swept() {
        let clock = Arc::new(FixedClock::new(datetime!(2030-01-01 09:00 UTC)));
        let store = store(clock.clone());
        let session = store.create(Principal::new("admin-1")).await.unwrap();

        clock.advance(time::Duration::hours(8));
        assert!(store.get(&session.id).await.unwrap().is_none());
        assert_eq!(store.len().await, 1);

        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let clock = Arc::new(FixedClock::new(datetime!(2030-01-01 09:00 UTC)));
        let store = store(clock);
        let session = store.create(Principal::new("admin-1")).await.unwrap();
        assert!(store.invalidate(&session.id).await.unwrap());
        assert!(!store.invalidate(&session.id).await.unwrap());
        assert!(store.get(&session.id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_periodically() {
        let clock = Arc::new(FixedClock::new(datetime!(2030-01-01 09:00 UTC)));
        let store = Arc::new(store(clock.clone()));
        store.create(Principal::new("admin-1")).await.unwrap();
        clock.advance(time::Duration::hours(9));

        let handle = spawn_sweeper(store.clone(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(store.is_empty().await);
        handle.abort();
    }
}
