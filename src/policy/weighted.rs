use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{errors::ProxyError, target::{Target, TargetId}};

use super::{PickContext, SelectionPolicy};

/// Smooth weighted round-robin (the nginx algorithm): every pick adds each
/// target's effective weight to its running total, selects the argmax, and
/// subtracts the sum of effective weights from the winner. Effective weight
/// is 0 for targets outside the eligible set, so an unhealthy target's
/// running total simply stalls until it rejoins.
pub struct WeightedPolicy {
    /// Full target set in declaration order; fixes the tie-break.
    order: Vec<TargetId>,
    weights: HashMap<TargetId, u32>,
    current_weight: Mutex<HashMap<TargetId, i64>>,
}

impl WeightedPolicy {
    pub fn new(order: Vec<TargetId>, weights: HashMap<TargetId, u32>) -> Self {
        let current_weight = order.iter().map(|id| (*id, 0i64)).collect();
        Self {
            order,
            weights,
            current_weight: Mutex::new(current_weight),
        }
    }
}

#[async_trait]
impl SelectionPolicy for WeightedPolicy {
    async fn pick(
        &self,
        eligible: &[Arc<Target>],
        _ctx: &PickContext,
    ) -> Result<Arc<Target>, ProxyError> {
        let eligible_ids: std::collections::HashSet<TargetId> =
            eligible.iter().map(|t| t.id).collect();

        let mut current_weight = self.current_weight.lock().await;
        let mut total: i64 = 0;
        for id in &self.order {
            let effective = if eligible_ids.contains(id) {
                *self.weights.get(id).unwrap_or(&0) as i64
            } else {
                0
            };
            total += effective;
            *current_weight.get_mut(id).unwrap() += effective;
        }

        if total == 0 {
            return Err(ProxyError::NoHealthyTargets);
        }

        let mut winner_id = None;
        let mut winner_value = i64::MIN;
        for id in &self.order {
            let value = current_weight[id];
            if value > winner_value {
                winner_value = value;
                winner_id = Some(*id);
            }
        }
        let winner_id = winner_id.expect("order is non-empty when total > 0");
        *current_weight.get_mut(&winner_id).unwrap() -= total;

        eligible
            .iter()
            .find(|t| t.id == winner_id)
            .cloned()
            .ok_or(ProxyError::NoHealthyTargets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn targets_with_weights(weights: &[u32]) -> (Vec<Arc<Target>>, HashMap<TargetId, u32>, Vec<TargetId>) {
        let targets: Vec<Arc<Target>> = weights
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let spec = crate::config::EndpointSpec {
                    host: "127.0.0.1".into(),
                    port: 9000 + i as u16,
                    base_uri: None,
                };
                Arc::new(Target::new(i, &spec, IpAddr::V4(Ipv4Addr::LOCALHOST), false))
            })
            .collect();
        let order: Vec<TargetId> = (0..weights.len()).collect();
        let weight_map = order.iter().map(|id| (*id, weights[*id])).collect();
        (targets, weight_map, order)
    }

    #[tokio::test]
    async fn weighted_fairness_over_w_picks() {
        let weights = [1u32, 2, 5];
        let (targets, weight_map, order) = targets_with_weights(&weights);
        let policy = WeightedPolicy::new(order, weight_map);
        let ctx = PickContext {
            client_fingerprint: String::new(),
        };

        let total: u32 = weights.iter().sum();
        let mut counts = [0u32; 3];
        for _ in 0..total {
            let picked = policy.pick(&targets, &ctx).await.unwrap();
            counts[picked.id] += 1;
        }
        assert_eq!(counts, [1, 2, 5]);
    }

    #[tokio::test]
    async fn ineligible_target_gets_zero_effective_weight() {
        let weights = [1u32, 1];
        let (targets, weight_map, order) = targets_with_weights(&weights);
        let policy = WeightedPolicy::new(order, weight_map);
        let ctx = PickContext {
            client_fingerprint: String::new(),
        };

        // only target 0 is eligible
        let eligible = vec![targets[0].clone()];
        for _ in 0..5 {
            let picked = policy.pick(&eligible, &ctx).await.unwrap();
            assert_eq!(picked.id, 0);
        }
    }

    #[tokio::test]
    async fn all_weights_zero_effective_signals_no_healthy_targets() {
        let weights = [1u32, 1];
        let (_targets, weight_map, order) = targets_with_weights(&weights);
        let policy = WeightedPolicy::new(order, weight_map);
        let ctx = PickContext {
            client_fingerprint: String::new(),
        };
        assert!(matches!(
            policy.pick(&[], &ctx).await,
            Err(ProxyError::NoHealthyTargets)
        ));
    }
}
