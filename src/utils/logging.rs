//! Tracing setup and the handful of structured call sites shared across
//! startup/shutdown, mirroring the teacher's `log_startup`/
//! `log_performance_metric` helper style (`lib.rs`) instead of ad-hoc
//! `tracing::info!` calls at every site.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Honors `RUST_LOG` if set, otherwise
/// falls back to `info` for this crate and `warn` for its dependencies.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info,warn", env!("CARGO_PKG_NAME"))));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

pub fn log_startup(component: &str, detail: &str) {
    tracing::info!(component, detail, "starting up");
}

pub fn log_group_ready(group: &str, target_count: usize, policy: &str) {
    tracing::info!(group, target_count, policy, "target group ready");
}

pub fn log_shutdown(reason: &str) {
    tracing::info!(reason, "shutting down");
}
