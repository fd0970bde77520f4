//! The request-handling side of the pipeline: Listener → RuleMatcher →
//! TargetGroup::eligible() → SelectionPolicy::pick() → Forwarder.
//!
//! Adapted from the teacher's `proxy::proxy_handler`: the axum extractor
//! shape and the request-id header stamping are kept, but routing goes
//! through `RuleMatcher`/`TargetGroup` instead of `GatewayConfig::
//! find_route_for_path` + a stateless hash over a flat destination list.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method},
    response::Response,
};
use axum_client_ip::ClientIp;

use crate::{
    errors::ProxyError,
    forwarder::{collect_body, ForwardRequest},
    policy::PickContext,
    rule_matcher::rewrite_path,
    state::AppState,
};

pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ProxyError> {
    let request_path = format!("/{path}");
    tracing::info!(path = %request_path, "received request");

    let rules = state.rules.read().await;
    let resolved = rules.resolve(&request_path).ok_or(ProxyError::NoRule)?;
    let group_name = resolved.rule.group.clone();
    let rule = resolved.rule.clone();
    drop(rules);

    let group = state
        .group(&group_name)
        .expect("rule table only ever references validated, existing groups");

    let fingerprint = client_fingerprint(&headers, client_ip);
    let ctx = PickContext {
        client_fingerprint: fingerprint,
    };

    let target = group.pick(&ctx).await?;
    target.record_request_start();

    let rewritten_path = rewrite_path(&rule, &request_path, target.base_uri.as_deref());
    let original_host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body_bytes = match collect_body(body).await {
        Ok(bytes) => bytes,
        Err(e) => {
            target.record_request_end(None).await;
            return Err(e);
        }
    };

    let forward_request = ForwardRequest {
        method,
        headers,
        body: body_bytes,
        client_ip,
        original_host,
    };

    let start = tokio::time::Instant::now();
    let result = state
        .forwarder
        .forward(&target, &rewritten_path, query.as_deref(), forward_request)
        .await;

    match result {
        Ok(response) => {
            let ttfb = start.elapsed().as_secs_f64() * 1000.0;
            target.record_request_end(Some(ttfb)).await;
            Ok(response)
        }
        Err(e) => {
            target.record_request_end(None).await;
            Err(e)
        }
    }
}

fn client_fingerprint(headers: &HeaderMap, peer_ip: std::net::IpAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| peer_ip.to_string())
}
