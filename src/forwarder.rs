//! Builds the upstream request, forwards it, relays the response, and
//! classifies failures per the error taxonomy in SPEC_FULL.md §7.
//!
//! Adapted from the teacher's `proxy.rs`: the request-building and
//! response-relay shape (collect the body, build a `reqwest::Request`,
//! replay status/headers/body) is kept, but header filtering moves from
//! an allow-list (teacher's `filter_safe_headers`) to the spec's
//! hop-by-hop strip-list, and SSRF domain allow-listing is dropped since
//! target destinations come from validated group config, not untrusted
//! route strings.

use std::{net::IpAddr, sync::Arc, time::Duration};

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method},
    response::Response,
};
use http_body_util::BodyExt;
use reqwest::Client;
use uuid::Uuid;

use crate::{errors::ProxyError, target::Target};

const HOP_BY_HOP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
];

pub struct ForwardRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_ip: IpAddr,
    pub original_host: Option<String>,
}

pub struct Forwarder {
    client: Client,
    timeout: Duration,
    proxy_headers_enabled: bool,
    listener_port: u16,
}

impl Forwarder {
    pub fn new(client: Client, timeout: Duration, proxy_headers_enabled: bool, listener_port: u16) -> Self {
        Self {
            client,
            timeout,
            proxy_headers_enabled,
            listener_port,
        }
    }

    pub async fn forward(
        &self,
        target: &Target,
        rewritten_path: &str,
        query: Option<&str>,
        req: ForwardRequest,
    ) -> Result<Response, ProxyError> {
        let mut url = format!("http://{}:{}{}", target.ip, target.port, rewritten_path);
        if let Some(query) = query {
            if !query.is_empty() {
                url.push('?');
                url.push_str(query);
            }
        }

        let mut headers = strip_hop_by_hop(&req.headers);
        if self.proxy_headers_enabled {
            add_proxy_headers(
                &mut headers,
                req.client_ip,
                req.original_host.as_deref(),
                self.listener_port,
            );
        }

        let upstream_request = self
            .client
            .request(req.method, &url)
            .headers(headers)
            .body(req.body)
            .build()
            .map_err(|e| ProxyError::UpstreamConnectFailure(e.to_string()))?;

        let dispatch = self.client.execute(upstream_request);
        let response = match tokio::time::timeout(self.timeout, dispatch).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => return Err(ProxyError::UpstreamTimeout),
            Ok(Err(e)) => return Err(ProxyError::UpstreamConnectFailure(e.to_string())),
            Err(_elapsed) => return Err(ProxyError::UpstreamTimeout),
        };

        relay_response(response).await
    }
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn add_proxy_headers(headers: &mut HeaderMap, client_ip: IpAddr, original_host: Option<&str>, listener_port: u16) {
    let ip_str = client_ip.to_string();

    let xff = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|existing| format!("{existing}, {ip_str}"))
        .unwrap_or_else(|| ip_str.clone());
    if let Ok(value) = HeaderValue::from_str(&xff) {
        headers.insert(HeaderName::from_static("x-forwarded-for"), value);
    }

    if let Some(host) = original_host {
        if let Ok(value) = HeaderValue::from_str(host) {
            headers.insert(HeaderName::from_static("x-forwarded-host"), value);
        }
    }

    headers.insert(
        HeaderName::from_static("x-forwarded-port"),
        HeaderValue::from_str(&listener_port.to_string()).unwrap(),
    );
    headers.insert(
        HeaderName::from_static("x-forwarded-proto"),
        HeaderValue::from_static("http"),
    );
    if let Ok(value) = HeaderValue::from_str(&ip_str) {
        headers.insert(HeaderName::from_static("x-real-ip"), value);
    }
    headers.insert(
        HeaderName::from_static("x-request-id"),
        HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
    );
}

async fn relay_response(response: reqwest::Response) -> Result<Response, ProxyError> {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProxyError::UpstreamConnectFailure(e.to_string()))?;

    if !status.is_success() && !status.is_redirection() {
        tracing::debug!(status = %status, "upstream responded with non-2xx/3xx; relaying verbatim");
    }

    let mut builder = Response::builder().status(status);
    for (name, value) in headers.iter() {
        if HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        builder = builder.header(name, value);
    }

    builder
        .body(Body::from(bytes))
        .map_err(|e| ProxyError::UpstreamConnectFailure(e.to_string()))
}

/// Collects an inbound axum body into bytes for forwarding. Errors here are
/// the caller's to classify; the forwarder only builds and sends requests.
pub async fn collect_body(body: Body) -> Result<Bytes, ProxyError> {
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| ProxyError::UpstreamConnectFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("example.com"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let stripped = strip_hop_by_hop(&headers);
        assert!(stripped.get("host").is_none());
        assert!(stripped.get("connection").is_none());
        assert!(stripped.get("content-type").is_some());
    }

    #[test]
    fn proxy_headers_append_to_existing_xff() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        add_proxy_headers(&mut headers, "10.0.0.2".parse().unwrap(), Some("api.example.com"), 8080);
        let xff = headers.get("x-forwarded-for").unwrap().to_str().unwrap();
        assert_eq!(xff, "10.0.0.1, 10.0.0.2");
        assert_eq!(headers.get("x-forwarded-port").unwrap(), "8080");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "api.example.com");
        assert!(headers.get("x-request-id").is_some());
    }
}
