//! # edgebalance
//!
//! A layer-7 reverse proxy and load balancer built on Axum:
//! - Longest-prefix-first listener rules with path rewriting
//! - Round-robin, weighted, sticky-session and least-response-time
//!   target selection policies
//! - Active health checking with hysteresis-based flapping resistance
//! - Hot-reloadable routing rules

pub mod app;
pub mod config;
pub mod constants;
pub mod errors;
pub mod forwarder;
pub mod health;
pub mod listener;
pub mod middleware;
pub mod policy;
pub mod rule_matcher;
pub mod state;
pub mod target;
pub mod target_group;
pub mod utils;

use std::{collections::HashMap, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, sync::RwLock};

use crate::{
    forwarder::Forwarder,
    rule_matcher::RuleMatcher,
    state::AppState,
    target_group::TargetGroup,
    utils::{hot_reload, logging},
};

/// Starts the gateway: loads `config_path`, builds every target group,
/// binds the listener and serves until the process is signaled to stop.
pub async fn run(config_path: PathBuf) -> Result<()> {
    logging::init();

    logging::log_startup("configuration", "loading");
    let config = config::GatewayConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    logging::log_startup("configuration", "loaded");

    let http_client = Client::builder()
        .connect_timeout(Duration::from_millis(config.connection_timeout_ms))
        .build()
        .context("building upstream HTTP client")?;

    let session_ttl = config.session_ttl_ms.map(Duration::from_millis);

    let mut groups = HashMap::new();
    for spec in &config.groups {
        let group = TargetGroup::build(spec, session_ttl, http_client.clone())
            .await
            .with_context(|| format!("building target group {}", spec.name))?;
        logging::log_group_ready(
            &group.name,
            spec.targets.len(),
            &format!("{:?}", group.policy_kind),
        );
        groups.insert(spec.name.clone(), Arc::new(group));
    }

    let state = Arc::new(AppState {
        groups,
        rules: RwLock::new(RuleMatcher::new(&config.rules)),
        forwarder: Forwarder::new(
            http_client,
            Duration::from_millis(config.connection_timeout_ms),
            config.proxy_headers_enabled,
            config.listener_port,
        ),
        listener_port: config.listener_port,
    });

    let watcher_state = state.clone();
    let watcher_path = config_path.clone();
    tokio::spawn(async move {
        if let Err(e) = hot_reload::watch_rules(watcher_path, watcher_state).await {
            tracing::warn!(error = %e, "configuration hot reload watcher stopped; rule table is now static");
        }
    });

    let app = app::create_app(state.clone())?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listener_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding listener on {addr}"))?;
    tracing::info!(%addr, "gateway listening");

    let shutdown_state = state.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            logging::log_shutdown("received interrupt signal");
            shutdown_state.shutdown();
        })
        .await
        .context("gateway server error")?;

    Ok(())
}
