use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Reminder not found: {0}")]
    NotFound(String),

    #[error("Invalid reminder: {0}")]
    InvalidRequest(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
