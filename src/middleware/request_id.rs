//! Stamps every request/response pair with a correlation id.
//!
//! Adapted from the teacher's inline `Uuid::new_v4()` call inside
//! `TraceLayer::make_span_with` (`app.rs`): pulled out into its own `from_fn`
//! layer so the id is generated once, attached to the request headers before
//! tracing reads it, and echoed back on the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::constants::REQUEST_ID_HEADER;

pub async fn layer(mut request: Request, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let request_id = request
        .headers()
        .get(&header_name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(header_name.clone(), value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert(header_name, value);
        response
    } else {
        next.run(request).await
    }
}
