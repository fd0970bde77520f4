//! A controllable mock upstream for exercising the gateway end to end.
//!
//! Adapted from the teacher's `examples/test_server.rs` idiom (a minimal
//! Axum server standing in for a real backend in integration tests),
//! relocated out of `examples/` since that name is reserved for the
//! read-only reference pack. Exposes a toggleable `/health` endpoint and
//! an echo endpoint that reports which instance answered and can be told
//! to delay its response, so tests can assert on load-balancing
//! distribution and on upstream-timeout handling.

use std::{
    net::SocketAddr,
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value_t = 9001)]
    port: u16,
    /// Identifier returned in echo responses, so a test can tell instances apart.
    #[arg(long, default_value = "backend-1")]
    name: String,
    /// Start with /health reporting unhealthy.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    start_unhealthy: bool,
    /// Sleep this long before answering every echo request, to exercise a
    /// caller's upstream timeout handling.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

struct MockState {
    name: String,
    healthy: AtomicBool,
    delay: Duration,
}

#[derive(Serialize)]
struct EchoBody {
    served_by: String,
    path: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let state = Arc::new(MockState {
        name: cli.name,
        healthy: AtomicBool::new(!cli.start_unhealthy),
        delay: Duration::from_millis(cli.delay_ms),
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/toggle-health", post(toggle_health))
        .route("/{*path}", get(echo).post(echo))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind mock backend");
    axum::serve(listener, app).await.expect("serve mock backend");
}

async fn health(State(state): State<Arc<MockState>>) -> StatusCode {
    if state.healthy.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn toggle_health(State(state): State<Arc<MockState>>) -> StatusCode {
    let was = state.healthy.fetch_xor(true, Ordering::Relaxed);
    tracing::info!(now_healthy = !was, "mock backend health toggled");
    StatusCode::OK
}

async fn echo(
    State(state): State<Arc<MockState>>,
    uri: axum::http::Uri,
) -> impl IntoResponse {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    Json(EchoBody {
        served_by: state.name.clone(),
        path: uri.path().to_string(),
    })
}
