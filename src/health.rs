//! Background health-check supervisor: one per group with checks enabled.
//!
//! Adapted from the teacher's `features/health_check.rs` `HealthCheckStore`
//! (per-destination consecutive success/failure counters driving a status)
//! generalized to own per-target `Target::healthy` flags directly instead of
//! a side table keyed by URL string, and from `features/circuit_breaker`'s
//! state-machine shape (explicit transition logging on every flip).

use std::{sync::Arc, time::Duration};

use reqwest::Client;
use tokio::sync::watch;

use crate::{config::HealthCheckSpec, constants::health as health_defaults, target::Target};

/// Per-target counters driving the healthy/unhealthy flag. Invariant:
/// at least one of `consecutive_successes`/`consecutive_failures` is zero.
struct HealthCounters {
    consecutive_successes: u32,
    consecutive_failures: u32,
}

pub struct HealthSupervisor {
    path: String,
    interval: Duration,
    succeed_threshold: u32,
    failure_threshold: u32,
    probe_timeout: Duration,
    shutdown_tx: watch::Sender<bool>,
}

impl HealthSupervisor {
    /// Spawns the supervisor's background task and returns a handle that can
    /// signal shutdown via `Drop`/`shutdown`.
    pub fn start(
        group_name: String,
        spec: HealthCheckSpec,
        targets: Arc<Vec<Arc<Target>>>,
        http_client: Client,
    ) -> Arc<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let interval = Duration::from_millis(spec.interval_ms);
        let probe_timeout = Duration::from_millis(health_defaults::PROBE_TIMEOUT_MS);

        let supervisor = Arc::new(Self {
            path: spec.path.clone(),
            interval,
            succeed_threshold: spec.succeed_threshold,
            failure_threshold: spec.failure_threshold,
            probe_timeout,
            shutdown_tx,
        });

        let task_supervisor = supervisor.clone();
        tokio::spawn(async move {
            task_supervisor
                .run(group_name, targets, http_client, shutdown_rx)
                .await;
        });

        supervisor
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn run(
        &self,
        group_name: String,
        targets: Arc<Vec<Arc<Target>>>,
        http_client: Client,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let counters: Arc<Vec<tokio::sync::Mutex<HealthCounters>>> = Arc::new(
            (0..targets.len())
                .map(|_| {
                    tokio::sync::Mutex::new(HealthCounters {
                        consecutive_successes: 0,
                        consecutive_failures: 0,
                    })
                })
                .collect(),
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let probes = targets.iter().enumerate().map(|(idx, target)| {
                let client = http_client.clone();
                let url = target.probe_url(&self.path);
                let timeout = self.probe_timeout;
                async move {
                    let outcome = probe_once(&client, &url, timeout).await;
                    (idx, outcome)
                }
            });

            let results = futures::future::join_all(probes);
            let shutdown_wait = tokio::time::timeout(
                self.probe_timeout * health_defaults::SHUTDOWN_GRACE_MULTIPLE,
                results,
            );

            let outcomes = match shutdown_wait.await {
                Ok(outcomes) => outcomes,
                Err(_) => {
                    tracing::warn!(group = %group_name, "health probe round exceeded shutdown grace period");
                    continue;
                }
            };

            for (idx, success) in outcomes {
                self.apply_outcome(&group_name, &targets[idx], &counters[idx], success)
                    .await;
            }

            if *shutdown_rx.borrow() {
                break;
            }
        }
    }

    async fn apply_outcome(
        &self,
        group_name: &str,
        target: &Target,
        counters: &tokio::sync::Mutex<HealthCounters>,
        success: bool,
    ) {
        let mut counters = counters.lock().await;
        let was_healthy = target.is_healthy();

        if success {
            counters.consecutive_successes += 1;
            counters.consecutive_failures = 0;
            if !was_healthy && counters.consecutive_successes >= self.succeed_threshold {
                target.set_healthy(true);
                tracing::info!(
                    group = %group_name,
                    target = %target.weight_key(),
                    "target transitioned to healthy"
                );
            }
        } else {
            counters.consecutive_failures += 1;
            counters.consecutive_successes = 0;
            if was_healthy && counters.consecutive_failures >= self.failure_threshold {
                target.set_healthy(false);
                tracing::warn!(
                    group = %group_name,
                    target = %target.weight_key(),
                    "target transitioned to unhealthy"
                );
            }
        }
    }
}

async fn probe_once(client: &Client, url: &str, timeout: Duration) -> bool {
    let attempt = client
        .get(url)
        .header("Connection", "close")
        .timeout(timeout)
        .send();

    match attempt.await {
        Ok(response) => response.status().as_u16() == 200,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn make_target(checks_enabled: bool) -> Arc<Target> {
        let spec = crate::config::EndpointSpec {
            host: "127.0.0.1".to_string(),
            port: 9001,
            base_uri: None,
        };
        Arc::new(Target::new(0, &spec, IpAddr::V4(Ipv4Addr::LOCALHOST), checks_enabled))
    }

    #[tokio::test]
    async fn becomes_healthy_only_after_succeed_threshold() {
        let target = make_target(true);
        let counters = tokio::sync::Mutex::new(HealthCounters {
            consecutive_successes: 0,
            consecutive_failures: 0,
        });
        let sup = HealthSupervisor {
            path: "/health".into(),
            interval: Duration::from_secs(30),
            succeed_threshold: 2,
            failure_threshold: 2,
            probe_timeout: Duration::from_secs(5),
            shutdown_tx: watch::channel(false).0,
        };

        sup.apply_outcome("g", &target, &counters, true).await;
        assert!(!target.is_healthy(), "single success must not flip state");

        sup.apply_outcome("g", &target, &counters, true).await;
        assert!(target.is_healthy());
    }

    #[tokio::test]
    async fn becomes_unhealthy_only_after_failure_threshold() {
        let target = make_target(false); // starts healthy
        assert!(target.is_healthy());
        let counters = tokio::sync::Mutex::new(HealthCounters {
            consecutive_successes: 0,
            consecutive_failures: 0,
        });
        let sup = HealthSupervisor {
            path: "/health".into(),
            interval: Duration::from_secs(30),
            succeed_threshold: 2,
            failure_threshold: 2,
            probe_timeout: Duration::from_secs(5),
            shutdown_tx: watch::channel(false).0,
        };

        sup.apply_outcome("g", &target, &counters, false).await;
        assert!(target.is_healthy(), "single failure must not flip state");

        sup.apply_outcome("g", &target, &counters, false).await;
        assert!(!target.is_healthy());
    }

    #[tokio::test]
    async fn single_probe_flip_when_threshold_is_one() {
        let target = make_target(true);
        let counters = tokio::sync::Mutex::new(HealthCounters {
            consecutive_successes: 0,
            consecutive_failures: 0,
        });
        let sup = HealthSupervisor {
            path: "/health".into(),
            interval: Duration::from_secs(5),
            succeed_threshold: 1,
            failure_threshold: 1,
            probe_timeout: Duration::from_secs(5),
            shutdown_tx: watch::channel(false).0,
        };

        sup.apply_outcome("g", &target, &counters, true).await;
        assert!(target.is_healthy());

        sup.apply_outcome("g", &target, &counters, false).await;
        assert!(!target.is_healthy());
    }

    #[tokio::test]
    async fn success_resets_failure_counter_and_vice_versa() {
        let counters = tokio::sync::Mutex::new(HealthCounters {
            consecutive_successes: 3,
            consecutive_failures: 0,
        });
        {
            let mut c = counters.lock().await;
            c.consecutive_failures += 1;
            c.consecutive_successes = 0;
        }
        let c = counters.lock().await;
        assert_eq!(c.consecutive_successes, 0);
        assert_eq!(c.consecutive_failures, 1);
    }
}
