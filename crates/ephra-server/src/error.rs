//! HTTP mapping for [`ServiceError`].

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use ephra_auth::AuthError;
use ephra_auth::middleware::error_body;
use ephra_core::{ErrorKind, ServiceError};

/// Handler error type.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let kind = err.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut headers = HeaderMap::new();
        match kind {
            ErrorKind::Authentication => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"ephra\""),
                );
            }
            ErrorKind::Contention => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
            }
            _ => {}
        }

        if status.is_server_error() {
            tracing::error!(error = %err, code = %kind, "Request failed");
        } else {
            tracing::debug!(error = %err, code = %kind, "Request rejected");
        }

        let body = error_body(kind.code(), &err.to_string(), err.details());
        (status, headers, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use ephra_core::TimeRange;
    use serde_json::Value;
    use time::macros::datetime;

    async fn body_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::authentication("no"), StatusCode::UNAUTHORIZED),
            (ServiceError::forbidden("no"), StatusCode::FORBIDDEN),
            (ServiceError::not_found("Appointment", "1"), StatusCode::NOT_FOUND),
            (ServiceError::conflict("taken"), StatusCode::CONFLICT),
            (ServiceError::business_rule("no"), StatusCode::UNPROCESSABLE_ENTITY),
            (ServiceError::contention("busy"), StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::storage("down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_conflict_body_carries_suggestions() {
        let range = TimeRange::new(
            datetime!(2030-05-01 11:00 UTC),
            datetime!(2030-05-01 12:00 UTC),
        )
        .unwrap();
        let response =
            ApiError(ServiceError::conflict_with_suggestions("taken", vec![range])).into_response();
        let body = body_of(response).await;
        assert_eq!(body["error"]["code"], "conflict");
        assert_eq!(
            body["error"]["details"]["suggested_ranges"][0]["start"],
            "2030-05-01T11:00:00Z"
        );
    }

    #[tokio::test]
    async fn test_contention_is_retryable() {
        let response = ApiError(ServiceError::contention("busy")).into_response();
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");
    }

    #[tokio::test]
    async fn test_permission_lists_scopes() {
        let err = ServiceError::permission("missing", ["update:appointments"]);
        let body = body_of(ApiError(err).into_response()).await;
        assert_eq!(body["error"]["code"], "permission_denied");
        assert_eq!(body["error"]["details"]["required_scopes"][0], "update:appointments");
    }
}
