use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Preserves an incoming `x-request-id` or assigns a fresh one, and echoes
/// it on the response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let req_id = req
        .headers()
        .get(&header_name)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    if let Some(value) = &req_id {
        req.extensions_mut().insert(value.clone());
    }

    let mut res = next.run(req).await;
    if let Some(value) = req_id {
        res.headers_mut().insert(header_name, value);
    }
    res
}
