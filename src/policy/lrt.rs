use std::sync::Arc;

use async_trait::async_trait;

use crate::{errors::ProxyError, target::Target};

use super::{PickContext, SelectionPolicy};

/// Least-response-time: picks argmin of `active_connections * avg_ttfb_ms`.
/// A target with no samples yet (`avg_ttfb_ms == 0.0`) scores 0 and is
/// therefore preferred until it accumulates real samples — cold targets
/// get a burst of initial traffic rather than sitting idle.
pub struct LrtPolicy;

impl LrtPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LrtPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SelectionPolicy for LrtPolicy {
    async fn pick(
        &self,
        eligible: &[Arc<Target>],
        _ctx: &PickContext,
    ) -> Result<Arc<Target>, ProxyError> {
        if eligible.is_empty() {
            return Err(ProxyError::NoHealthyTargets);
        }

        let mut best: Option<(Arc<Target>, f64)> = None;
        for target in eligible {
            let metric = target.active_connections() as f64 * target.avg_ttfb_ms().await;
            match &best {
                Some((_, best_metric)) if metric >= *best_metric => {}
                _ => best = Some((target.clone(), metric)),
            }
        }

        Ok(best.expect("eligible is non-empty").0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn target(id: usize) -> Arc<Target> {
        let spec = crate::config::EndpointSpec {
            host: "127.0.0.1".into(),
            port: 9000 + id as u16,
            base_uri: None,
        };
        Arc::new(Target::new(id, &spec, IpAddr::V4(Ipv4Addr::LOCALHOST), false))
    }

    #[tokio::test]
    async fn cold_target_with_no_samples_is_preferred() {
        let hot = target(0);
        hot.record_request_start();
        hot.record_request_end(Some(500.0)).await; // acquires a non-zero ttfb sample
        let cold = target(1);

        let policy = LrtPolicy::new();
        let ctx = PickContext {
            client_fingerprint: String::new(),
        };
        let picked = policy.pick(&[hot, cold.clone()], &ctx).await.unwrap();
        assert_eq!(picked.id, cold.id);
    }

    #[tokio::test]
    async fn picks_lowest_load_times_latency() {
        let low = target(0);
        low.record_request_start();
        low.record_request_end(Some(10.0)).await;

        let high = target(1);
        high.record_request_start();
        high.record_request_end(Some(1000.0)).await;

        let policy = LrtPolicy::new();
        let ctx = PickContext {
            client_fingerprint: String::new(),
        };
        let picked = policy.pick(&[low.clone(), high], &ctx).await.unwrap();
        assert_eq!(picked.id, low.id);
    }

    #[tokio::test]
    async fn ties_break_to_first_declared() {
        let a = target(0);
        let b = target(1);
        let policy = LrtPolicy::new();
        let ctx = PickContext {
            client_fingerprint: String::new(),
        };
        let picked = policy.pick(&[a.clone(), b], &ctx).await.unwrap();
        assert_eq!(picked.id, a.id);
    }
}
