use std::sync::{atomic::AtomicU64, Arc};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{errors::ProxyError, target::{Target, TargetId}};

use super::{round_robin::pick_from, PickContext, SelectionPolicy};

struct Session {
    target_id: TargetId,
    expires_at: Instant,
}

/// Per-group client-fingerprint → target pinning. Sessions live in a
/// `DashMap` (the teacher's choice for its `HealthCheckStore`/
/// `CircuitBreakerStore` per-key state) so lookup and refresh never
/// contend across unrelated fingerprints. Expired entries are reaped
/// lazily, on the next access for that key — no periodic sweep.
pub struct StickyPolicy {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    fallback_counter: AtomicU64,
}

impl StickyPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            fallback_counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl SelectionPolicy for StickyPolicy {
    async fn pick(
        &self,
        eligible: &[Arc<Target>],
        ctx: &PickContext,
    ) -> Result<Arc<Target>, ProxyError> {
        let now = Instant::now();

        if let Some(session) = self.sessions.get(&ctx.client_fingerprint) {
            if session.expires_at > now {
                if let Some(target) = eligible.iter().find(|t| t.id == session.target_id) {
                    let target = target.clone();
                    drop(session);
                    self.sessions.entry(ctx.client_fingerprint.clone()).and_modify(|s| {
                        s.expires_at = now + self.ttl;
                    });
                    return Ok(target);
                }
            }
        }

        let picked = pick_from(&self.fallback_counter, eligible)?;
        self.sessions.insert(
            ctx.client_fingerprint.clone(),
            Session {
                target_id: picked.id,
                expires_at: now + self.ttl,
            },
        );
        Ok(picked)
    }
}
