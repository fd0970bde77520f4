//! Router assembly.
//!
//! Adapted from the teacher's `create_app`: the `ClientIpSource` extension
//! layer and the `TraceLayer` span shape are kept; the auth/cache/rate-limit/
//! circuit-breaker layer stack is gone since none of it has a counterpart in
//! this gateway. Routing is a single catch-all route dispatching through
//! [`crate::listener::proxy_handler`] — every path, including one an operator
//! configures as `/health`, goes through the same listener rule resolution,
//! so no hardcoded route can shadow a configured one.

use std::sync::Arc;

use anyhow::Error;
use axum::{extract::Request, middleware::from_fn, routing::any, Router};
use axum_client_ip::ClientIpSource;
use tower_http::trace::TraceLayer;

use crate::{constants::REQUEST_ID_HEADER, listener::proxy_handler, middleware::request_id, state::AppState};

pub fn create_app(state: Arc<AppState>) -> Result<Router, Error> {
    let router = Router::new()
        .route("/{*path}", any(proxy_handler))
        .with_state(state)
        .layer(ClientIpSource::ConnectInfo.into_extension());

    Ok(router
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "request",
                id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
        .layer(from_fn(request_id::layer)))
}
