use std::sync::{atomic::{AtomicU64, Ordering}, Arc};

use async_trait::async_trait;

use crate::{errors::ProxyError, target::Target};

use super::{PickContext, SelectionPolicy};

pub struct RoundRobinPolicy {
    counter: AtomicU64,
}

impl RoundRobinPolicy {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for RoundRobinPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SelectionPolicy for RoundRobinPolicy {
    async fn pick(
        &self,
        eligible: &[Arc<Target>],
        _ctx: &PickContext,
    ) -> Result<Arc<Target>, ProxyError> {
        pick_from(&self.counter, eligible)
    }
}

/// Shared by `RoundRobinPolicy` and `StickyPolicy`'s fallback path.
pub(super) fn pick_from(
    counter: &AtomicU64,
    eligible: &[Arc<Target>],
) -> Result<Arc<Target>, ProxyError> {
    if eligible.is_empty() {
        return Err(ProxyError::NoHealthyTargets);
    }
    let idx = counter.fetch_add(1, Ordering::Relaxed) as usize % eligible.len();
    Ok(eligible[idx].clone())
}
