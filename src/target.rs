//! A single upstream endpoint: identity plus live metrics.
//!
//! Health is deliberately not stored here (see §9 of the design notes) —
//! [`crate::health::HealthSupervisor`] owns the healthy flag and the
//! threshold counters; `Target` only exposes the bool a supervisor writes.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tokio::sync::Mutex;

use crate::config::EndpointSpec;

/// Stable only within a single process run; re-assigned on restart
/// since target groups are rebuilt from config/DNS at startup.
pub type TargetId = usize;

#[derive(Debug)]
pub struct Target {
    pub id: TargetId,
    pub host: String,
    pub ip: std::net::IpAddr,
    pub port: u16,
    pub base_uri: Option<String>,

    active_connections: AtomicU32,
    avg_ttfb_ms: Mutex<f64>,

    /// Owned by the group's `HealthSupervisor` when health checks are enabled.
    /// `true` at construction when checks are disabled (see `TargetGroup::new`).
    healthy: AtomicBool,
}

impl Target {
    pub fn new(id: TargetId, spec: &EndpointSpec, ip: std::net::IpAddr, checks_enabled: bool) -> Self {
        Self {
            id,
            host: spec.host.clone(),
            ip,
            port: spec.port,
            base_uri: spec.base_uri.clone().filter(|s| !s.is_empty()),
            active_connections: AtomicU32::new(0),
            avg_ttfb_ms: Mutex::new(0.0),
            healthy: AtomicBool::new(!checks_enabled),
        }
    }

    pub fn weight_key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub async fn avg_ttfb_ms(&self) -> f64 {
        *self.avg_ttfb_ms.lock().await
    }

    /// Dispatch started: bump the in-flight counter LRT reads.
    pub fn record_request_start(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Dispatch finished, successfully or not. `observed_ttfb_ms` is `None`
    /// on error — a failed request contributes no TTFB sample.
    pub async fn record_request_end(&self, observed_ttfb_ms: Option<f64>) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
        if let Some(sample) = observed_ttfb_ms {
            let mut avg = self.avg_ttfb_ms.lock().await;
            let alpha = crate::constants::lrt::TTFB_EWMA_ALPHA;
            *avg = alpha * sample + (1.0 - alpha) * *avg;
        }
    }

    pub fn probe_url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.ip, self.port, path)
    }
}
