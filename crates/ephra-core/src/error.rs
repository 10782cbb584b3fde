//! Service error taxonomy shared by every crate in the booking core.
//!
//! A single tagged enum carries every failure a decision can produce. The
//! HTTP boundary maps [`ErrorKind`] to a status code; nothing else in the
//! core depends on transport.

use std::fmt;

use serde_json::{Value, json};

use crate::time::TimeRange;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

/// Errors produced by authorization and scheduling decisions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    /// The caller could not be authenticated.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Why the credentials were rejected.
        message: String,
    },

    /// The caller is authenticated but lacks a required scope or ownership.
    #[error("Permission denied: {message}")]
    Permission {
        /// Description of the denied action.
        message: String,
        /// Scope names that would have granted access.
        required: Vec<String>,
    },

    /// The request is malformed or violates a time-range rule.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The requested time range collides with existing state.
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        /// Free ranges on the same day the caller may try instead.
        suggestions: Vec<TimeRange>,
    },

    /// The request is well-formed but not allowed in the current state.
    #[error("Business rule violation: {message}")]
    BusinessRule { message: String },

    /// A per-provider lock could not be acquired in time. Safe to retry.
    #[error("Resource busy: {message}")]
    Contention { message: String },

    /// A required collaborator is not configured or unreachable.
    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    /// A store collaborator failed.
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl ServiceError {
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a `Permission` error naming the scopes that were required.
    #[must_use]
    pub fn permission<I, S>(message: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Permission {
            message: message.into(),
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a `Permission` error for an ownership check with no scope remedy.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
            required: Vec::new(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            suggestions: Vec::new(),
        }
    }

    /// Creates a `Conflict` error carrying alternative free ranges.
    #[must_use]
    pub fn conflict_with_suggestions(
        message: impl Into<String>,
        suggestions: Vec<TimeRange>,
    ) -> Self {
        Self::Conflict {
            message: message.into(),
            suggestions,
        }
    }

    #[must_use]
    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRule {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn contention(message: impl Into<String>) -> Self {
        Self::Contention {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::BusinessRule { .. } => ErrorKind::BusinessRule,
            Self::Contention { .. } => ErrorKind::Contention,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Returns `true` if the same request may succeed when retried unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention { .. } | Self::Unavailable { .. })
    }

    /// Returns `true` for errors caused by the request rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// The scope names attached to a `Permission` error, empty otherwise.
    #[must_use]
    pub fn required_scopes(&self) -> &[String] {
        match self {
            Self::Permission { required, .. } => required,
            _ => &[],
        }
    }

    /// The suggested ranges attached to a `Conflict` error, empty otherwise.
    #[must_use]
    pub fn suggestions(&self) -> &[TimeRange] {
        match self {
            Self::Conflict { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Structured payload for response bodies.
    #[must_use]
    pub fn details(&self) -> Value {
        match self {
            Self::Permission { required, .. } if !required.is_empty() => {
                json!({ "required_scopes": required })
            }
            Self::Conflict { suggestions, .. } if !suggestions.is_empty() => {
                json!({ "suggested_ranges": suggestions })
            }
            Self::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
            _ => Value::Null,
        }
    }
}

/// Coarse category of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    Permission,
    Validation,
    NotFound,
    Conflict,
    BusinessRule,
    Contention,
    Unavailable,
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Authentication => 401,
            Self::Permission => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::BusinessRule => 422,
            Self::Contention | Self::Unavailable => 503,
            Self::Storage => 500,
        }
    }

    /// Stable machine-readable code used in response bodies.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Authentication => "authentication_error",
            Self::Permission => "permission_denied",
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::BusinessRule => "business_rule_violation",
            Self::Contention => "resource_busy",
            Self::Unavailable => "service_unavailable",
            Self::Storage => "storage_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::validation("x").status_code(), 400);
        assert_eq!(ServiceError::authentication("x").status_code(), 401);
        assert_eq!(ServiceError::forbidden("x").status_code(), 403);
        assert_eq!(ServiceError::not_found("Appointment", "1").status_code(), 404);
        assert_eq!(ServiceError::conflict("x").status_code(), 409);
        assert_eq!(ServiceError::business_rule("x").status_code(), 422);
        assert_eq!(ServiceError::contention("x").status_code(), 503);
        assert_eq!(ServiceError::storage("x").status_code(), 500);
    }

    #[test]
    fn test_retryable() {
        assert!(ServiceError::contention("lock").is_retryable());
        assert!(!ServiceError::validation("bad").is_retryable());
        assert!(!ServiceError::conflict("taken").is_retryable());
    }

    #[test]
    fn test_permission_carries_scopes() {
        let err = ServiceError::permission("missing scope", ["create:appointments"]);
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.required_scopes(), ["create:appointments".to_string()]);
        assert_eq!(
            err.details(),
            json!({ "required_scopes": ["create:appointments"] })
        );
    }

    #[test]
    fn test_conflict_details_serializes_ranges() {
        let range = TimeRange::new(
            datetime!(2030-03-04 11:00 UTC),
            datetime!(2030-03-04 12:00 UTC),
        )
        .unwrap();
        let err = ServiceError::conflict_with_suggestions("taken", vec![range]);
        assert_eq!(err.suggestions().len(), 1);
        assert_eq!(
            err.details(),
            json!({ "suggested_ranges": [
                { "start": "2030-03-04T11:00:00Z", "end": "2030-03-04T12:00:00Z" }
            ]})
        );
    }

    #[test]
    fn test_display() {
        let err = ServiceError::not_found("Care provider", "p-1");
        assert_eq!(err.to_string(), "Care provider not found: p-1");
        assert_eq!(ErrorKind::BusinessRule.to_string(), "business_rule_violation");
    }
}
