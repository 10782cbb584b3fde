use std::sync::Arc;

use axum::extract::FromRef;
use ephra_auth::middleware::AuthState;
use ephra_auth::{AuthError, InMemorySessionStore, SessionStore, TokenValidator};
use ephra_core::Clock;
use ephra_db_memory::InMemoryStore;
use ephra_notifications::{InMemoryReminderQueue, WebhookVerifier};
use ephra_scheduling::{AppointmentLifecycle, AvailabilityManager, ProviderLocks, SchedulingStores};

use crate::config::AppConfig;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub lifecycle: Arc<AppointmentLifecycle>,
    pub availability: Arc<AvailabilityManager>,
    pub webhooks: WebhookVerifier,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Everything the process runs: handler state plus the collaborators
/// background tasks need.
pub struct Services {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub reminders: Arc<InMemoryReminderQueue>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Services {
    /// Wires services from configuration with a JWKS-backed validator.
    pub async fn from_config(cfg: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        let validator = TokenValidator::from_config(&cfg.auth)?;
        Ok(Self::with_validator(cfg, validator, clock).await)
    }

    /// Wires services around an already-built validator.
    pub async fn with_validator(
        cfg: &AppConfig,
        validator: TokenValidator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(InMemoryStore::with_seed(&cfg.seed).await);
        let stores = SchedulingStores::shared(store.clone());
        let locks = Arc::new(ProviderLocks::new(cfg.scheduling.lock_timeout));
        let reminders = Arc::new(InMemoryReminderQueue::new(clock.clone()));
        let sessions: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(cfg.auth.session.ttl, clock.clone()));

        let lifecycle = AppointmentLifecycle::new(
            stores.clone(),
            reminders.clone(),
            locks.clone(),
            clock.clone(),
            cfg.scheduling.clone(),
        );
        let availability = AvailabilityManager::new(stores, locks, clock);

        let state = AppState {
            auth: AuthState::new(Arc::new(validator), sessions.clone()),
            lifecycle: Arc::new(lifecycle),
            availability: Arc::new(availability),
            webhooks: WebhookVerifier::new(cfg.notifications.webhook_signing_key.clone()),
        };

        Self {
            state,
            store,
            reminders,
            sessions,
        }
    }
}
