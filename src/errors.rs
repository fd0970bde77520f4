use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// The error taxonomy of the forwarding path. Every variant maps to a
/// client-visible status with an empty body; none of them retry or
/// fail over to another target. A successful upstream response never
/// becomes a `ProxyError` — it's relayed directly as a `Response` by
/// the forwarder.
#[derive(Debug)]
pub enum ProxyError {
    /// No listener rule matched the request path.
    NoRule,
    /// The matched group has no eligible (healthy) targets.
    NoHealthyTargets,
    /// Connect refused, DNS failure, or connection reset before a response arrived.
    UpstreamConnectFailure(String),
    /// The configured connection timeout elapsed before a full response arrived.
    UpstreamTimeout,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::NoRule => StatusCode::NOT_FOUND,
            ProxyError::NoHealthyTargets => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::UpstreamConnectFailure(reason) => {
                tracing::warn!(reason = %reason, "upstream connect failure");
                StatusCode::BAD_GATEWAY
            }
            ProxyError::UpstreamTimeout => {
                tracing::warn!("upstream timeout exceeded");
                StatusCode::GATEWAY_TIMEOUT
            }
        };
        (status, ()).into_response()
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::NoRule => write!(f, "no listener rule matched the request path"),
            ProxyError::NoHealthyTargets => write!(f, "no eligible targets in group"),
            ProxyError::UpstreamConnectFailure(reason) => {
                write!(f, "upstream connect failure: {reason}")
            }
            ProxyError::UpstreamTimeout => write!(f, "upstream timeout exceeded"),
        }
    }
}

impl std::error::Error for ProxyError {}

/// Fatal configuration errors, raised only at startup or during a rejected hot reload.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("group '{0}' uses the weighted policy but has no weight map")]
    MissingWeights(String),

    #[error("group '{group}' weight map omits target '{target}'")]
    IncompleteWeights { group: String, target: String },

    #[error("rule '{rule}' references unknown group '{group}'")]
    UnknownGroup { rule: String, group: String },

    #[error("group '{0}' uses the sticky policy but session_ttl_ms is not set")]
    MissingSessionTtl(String),

    #[error("rule '{path}' has rewrite '{rewrite}' which is not a prefix of its own path")]
    InvalidRewrite { path: String, rewrite: String },

    #[error("malformed endpoint '{host}:{port}' in group '{group}': {reason}")]
    MalformedEndpoint {
        group: String,
        host: String,
        port: u16,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn status_and_body_len(err: ProxyError) -> (StatusCode, usize) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.len())
    }

    #[tokio::test]
    async fn no_rule_maps_to_404_with_empty_body() {
        let (status, len) = status_and_body_len(ProxyError::NoRule).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(len, 0);
    }

    #[tokio::test]
    async fn no_healthy_targets_maps_to_503_with_empty_body() {
        let (status, len) = status_and_body_len(ProxyError::NoHealthyTargets).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(len, 0);
    }

    #[tokio::test]
    async fn upstream_connect_failure_maps_to_502_with_empty_body() {
        let (status, len) =
            status_and_body_len(ProxyError::UpstreamConnectFailure("connection refused".into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(len, 0);
    }

    #[tokio::test]
    async fn upstream_timeout_maps_to_504_with_empty_body() {
        let (status, len) = status_and_body_len(ProxyError::UpstreamTimeout).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(len, 0);
    }
}
