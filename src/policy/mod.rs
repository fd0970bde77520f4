//! Pluggable target selection.
//!
//! Represented as a trait object per the design notes (§9 of SPEC_FULL.md)
//! rather than a tagged enum, following the teacher's `RateLimitState`
//! trait (`features/rate_limiter/state.rs`) — one abstract `pick`
//! operation, state kept private inside each implementor.

pub mod lrt;
pub mod round_robin;
pub mod sticky;
pub mod weighted;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{config::PolicyKind, errors::ProxyError, target::Target, target::TargetId};

/// Per-request context a policy may need beyond the eligible set.
/// Only `Sticky` reads `client_fingerprint`; the others ignore it.
pub struct PickContext {
    pub client_fingerprint: String,
}

#[async_trait]
pub trait SelectionPolicy: Send + Sync {
    async fn pick(
        &self,
        eligible: &[Arc<Target>],
        ctx: &PickContext,
    ) -> Result<Arc<Target>, ProxyError>;
}

/// Builds the policy instance for a group from its configured kind.
/// `order` is the group's full target id list in declaration order — every
/// policy's tie-break and, for `Weighted`, its current-weight bookkeeping,
/// is keyed against this fixed order rather than the (shrinking) eligible
/// slice passed to `pick`.
pub fn build(
    kind: PolicyKind,
    order: Vec<TargetId>,
    weights: Option<HashMap<TargetId, u32>>,
    session_ttl: Option<Duration>,
) -> Arc<dyn SelectionPolicy> {
    match kind {
        PolicyKind::RoundRobin => Arc::new(round_robin::RoundRobinPolicy::new()),
        PolicyKind::Weighted => Arc::new(weighted::WeightedPolicy::new(
            order,
            weights.expect("weighted policy requires a weight map; validated at config load"),
        )),
        PolicyKind::Sticky => Arc::new(sticky::StickyPolicy::new(
            session_ttl.expect("sticky policy requires session_ttl_ms; validated at config load"),
        )),
        PolicyKind::Lrt => Arc::new(lrt::LrtPolicy::new()),
    }
}
