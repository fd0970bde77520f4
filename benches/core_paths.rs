//! Benchmarks for the request-path hot spots: rule resolution, each
//! selection policy's `pick`, and the LRT metric computation.
//!
//! Mirrors the teacher's `benches/performance_tests.rs` shape (one
//! `criterion_group!`, black-boxed inputs, `harness = false`).

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use edgebalance::{
    config::{EndpointSpec, ListenerRuleSpec},
    policy::{
        lrt::LrtPolicy, round_robin::RoundRobinPolicy, sticky::StickyPolicy, weighted::WeightedPolicy, PickContext,
        SelectionPolicy,
    },
    rule_matcher::RuleMatcher,
    target::Target,
};
use std::collections::HashMap;

fn rule_specs(n: usize) -> Vec<ListenerRuleSpec> {
    (0..n)
        .map(|i| ListenerRuleSpec {
            path: format!("/service-{i}"),
            rewrite: format!("/service-{i}"),
            group: format!("group-{i}"),
        })
        .collect()
}

fn bench_rule_resolve(c: &mut Criterion) {
    let matcher = RuleMatcher::new(&rule_specs(64));
    c.bench_function("rule_matcher_resolve_64_rules", |b| {
        b.iter(|| matcher.resolve(black_box("/service-40/v1/resource")))
    });
}

fn make_targets(n: usize) -> Vec<Arc<Target>> {
    (0..n)
        .map(|i| {
            let spec = EndpointSpec {
                host: "127.0.0.1".into(),
                port: 9000 + i as u16,
                base_uri: None,
            };
            Arc::new(Target::new(i, &spec, IpAddr::V4(Ipv4Addr::LOCALHOST), false))
        })
        .collect()
}

fn bench_round_robin(c: &mut Criterion) {
    let targets = make_targets(8);
    let policy = RoundRobinPolicy::new();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = PickContext {
        client_fingerprint: String::new(),
    };

    c.bench_function("round_robin_pick_8_targets", |b| {
        b.iter(|| rt.block_on(policy.pick(black_box(&targets), &ctx)))
    });
}

fn bench_weighted(c: &mut Criterion) {
    let targets = make_targets(8);
    let order: Vec<_> = targets.iter().map(|t| t.id).collect();
    let weights: HashMap<_, _> = order.iter().map(|id| (*id, 3)).collect();
    let policy = WeightedPolicy::new(order, weights);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = PickContext {
        client_fingerprint: String::new(),
    };

    c.bench_function("weighted_pick_8_targets", |b| {
        b.iter(|| rt.block_on(policy.pick(black_box(&targets), &ctx)))
    });
}

fn bench_sticky(c: &mut Criterion) {
    let targets = make_targets(8);
    let policy = StickyPolicy::new(Duration::from_secs(60));
    let rt = tokio::runtime::Runtime::new().unwrap();
    // Same fingerprint on every iteration: measures the steady-state
    // cache-hit path, the one a pinned client actually takes on every
    // request after its first.
    let ctx = PickContext {
        client_fingerprint: "203.0.113.7".to_string(),
    };
    rt.block_on(policy.pick(&targets, &ctx)).unwrap();

    c.bench_function("sticky_pick_8_targets_cache_hit", |b| {
        b.iter(|| rt.block_on(policy.pick(black_box(&targets), &ctx)))
    });
}

fn bench_lrt(c: &mut Criterion) {
    let targets = make_targets(8);
    let policy = LrtPolicy::new();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let ctx = PickContext {
        client_fingerprint: String::new(),
    };

    c.bench_function("lrt_pick_8_targets", |b| {
        b.iter(|| rt.block_on(policy.pick(black_box(&targets), &ctx)))
    });
}

criterion_group!(
    benches,
    bench_rule_resolve,
    bench_round_robin,
    bench_weighted,
    bench_sticky,
    bench_lrt
);
criterion_main!(benches);
