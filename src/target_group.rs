//! A named pool of targets sharing a selection policy and health supervisor.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::net::lookup_host;

use crate::{
    config::{PolicyKind, TargetGroupSpec},
    errors::ProxyError,
    health::HealthSupervisor,
    policy::{self, PickContext, SelectionPolicy},
    target::{Target, TargetId},
};

pub struct TargetGroup {
    pub name: String,
    pub policy_kind: PolicyKind,
    targets: Vec<Arc<Target>>,
    policy: Arc<dyn SelectionPolicy>,
    health_supervisor: Option<Arc<HealthSupervisor>>,
}

impl TargetGroup {
    /// Resolves every endpoint's hostname (one target per resolved
    /// address — re-resolution is out of scope, see SPEC_FULL.md §9),
    /// builds the configured policy, and starts the health supervisor
    /// if the group enables checks.
    pub async fn build(
        spec: &TargetGroupSpec,
        session_ttl: Option<std::time::Duration>,
        http_client: Client,
    ) -> Result<Self> {
        let checks_enabled = spec.health_check.is_some();
        let mut targets = Vec::new();
        let mut next_id: TargetId = 0;

        for endpoint in &spec.targets {
            let addrs = resolve_endpoint(&endpoint.host, endpoint.port)
                .await
                .with_context(|| format!("resolving endpoint {}:{}", endpoint.host, endpoint.port))?;
            for ip in addrs {
                targets.push(Arc::new(Target::new(next_id, endpoint, ip, checks_enabled)));
                next_id += 1;
            }
        }

        let order: Vec<TargetId> = targets.iter().map(|t| t.id).collect();
        let weights: Option<HashMap<TargetId, u32>> = spec.weights.as_ref().map(|by_key| {
            targets
                .iter()
                .filter_map(|t| by_key.get(&t.weight_key()).map(|w| (t.id, *w)))
                .collect()
        });

        let policy = policy::build(spec.policy, order, weights, session_ttl);

        let health_supervisor = spec.health_check.as_ref().map(|hc_spec| {
            HealthSupervisor::start(
                spec.name.clone(),
                hc_spec.clone(),
                Arc::new(targets.clone()),
                http_client,
            )
        });

        Ok(Self {
            name: spec.name.clone(),
            policy_kind: spec.policy,
            targets,
            policy,
            health_supervisor,
        })
    }

    /// Targets currently considered live: all of them when health checks
    /// are disabled, otherwise only those whose supervisor-owned flag is
    /// healthy right now.
    pub fn eligible(&self) -> Vec<Arc<Target>> {
        self.targets
            .iter()
            .filter(|t| t.is_healthy())
            .cloned()
            .collect()
    }

    pub async fn pick(&self, ctx: &PickContext) -> Result<Arc<Target>, ProxyError> {
        let eligible = self.eligible();
        self.policy.pick(&eligible, ctx).await
    }

    pub fn shutdown(&self) {
        if let Some(supervisor) = &self.health_supervisor {
            supervisor.shutdown();
        }
    }
}

async fn resolve_endpoint(host: &str, port: u16) -> Result<Vec<IpAddr>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }
    let addrs: Vec<IpAddr> = lookup_host((host, port))
        .await?
        .map(|socket_addr| socket_addr.ip())
        .collect();
    if addrs.is_empty() {
        anyhow::bail!("DNS resolution for {host} returned no addresses");
    }
    Ok(addrs)
}
