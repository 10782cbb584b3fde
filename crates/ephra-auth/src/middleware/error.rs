//! `IntoResponse` for [`AuthError`].

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = error_details(&self);
        let message = self.to_string();

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let value = www_authenticate(code, &message);
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        if status.is_server_error() {
            tracing::warn!(error = %self, "Authentication unavailable");
        }

        (status, headers, Json(error_body(code, &message, Value::Null))).into_response()
    }
}

/// Returns (HTTP status, error code).
fn error_details(error: &AuthError) -> (StatusCode, &'static str) {
    match error {
        AuthError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "unauthorized"),
        AuthError::InvalidToken { .. }
        | AuthError::InvalidSignature
        | AuthError::TokenExpired
        | AuthError::UnsupportedAlgorithm { .. }
        | AuthError::InvalidIssuer { .. }
        | AuthError::InvalidAudience { .. }
        | AuthError::MissingSubject
        | AuthError::KeyResolution { .. } => (StatusCode::UNAUTHORIZED, "invalid_token"),
        AuthError::NotConfigured
        | AuthError::Configuration { .. }
        | AuthError::Session { .. } => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
    }
}

/// `Bearer realm="ephra", error="...", error_description="..."`
fn www_authenticate(code: &str, description: &str) -> String {
    let escaped = description.replace('"', "\\\"");
    format!("Bearer realm=\"ephra\", error=\"{code}\", error_description=\"{escaped}\"")
}

/// JSON error envelope shared by every error response.
#[must_use]
pub fn error_body(code: &str, message: &str, details: Value) -> Value {
    let mut body = json!({
        "error": {
            "code": code,
            "message": message,
        }
    });
    if !details.is_null() {
        body["error"]["details"] = details;
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = AuthError::TokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(www_auth.contains("realm=\"ephra\""));
        assert!(www_auth.contains("error=\"invalid_token\""));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "invalid_token");
        assert_eq!(body["error"]["message"], "Token expired");
    }

    #[tokio::test]
    async fn test_not_configured_is_503_without_challenge() {
        let response = AuthError::NotConfigured.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn test_error_body_details() {
        let body = error_body("conflict", "taken", json!({ "a": 1 }));
        assert_eq!(body["error"]["details"]["a"], 1);
        let body = error_body("conflict", "taken", Value::Null);
        assert!(body["error"].get("details").is_none());
    }
}
