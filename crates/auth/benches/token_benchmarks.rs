use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::collections::BTreeMap;
use std::time::Duration;

use gatekeeper_auth::{AuthorizationPolicy, Identity, PermissionRequirement, TokenCodec};
use gatekeeper_core::SecurityConfig;

const SECRET: &str = "bench-secret-bench-secret-bench-secret";

fn codec() -> TokenCodec {
    TokenCodec::from_config(&SecurityConfig::new(SECRET)).unwrap()
}

fn claims_with(extra: usize) -> BTreeMap<String, String> {
    let mut claims = BTreeMap::from([("sub".to_string(), "alice".to_string())]);
    for i in 0..extra {
        claims.insert(format!("claim_{i}"), format!("value_{i}"));
    }
    claims
}

fn bench_issue(c: &mut Criterion) {
    let codec = codec();
    let mut group = c.benchmark_group("token_issue");

    for extra in [0usize, 4, 16] {
        let claims = claims_with(extra);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(extra), &claims, |b, claims| {
            b.iter(|| codec.issue(black_box(claims), Duration::from_secs(600)).unwrap());
        });
    }

    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let codec = codec();
    let mut group = c.benchmark_group("token_verify");

    for extra in [0usize, 4, 16] {
        let token = codec
            .issue(&claims_with(extra), Duration::from_secs(600))
            .unwrap();
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(extra), &token, |b, token| {
            b.iter(|| codec.verify(black_box(token)).unwrap());
        });
    }

    group.finish();
}

fn bench_authorize(c: &mut Criterion) {
    let config = SecurityConfig::new(SECRET).with_exclude_paths(["/public/**", "/**/health"]);
    let policy = AuthorizationPolicy::from_config(&config).unwrap();
    let identity = Identity::new(
        "alice",
        (0..32).map(|i| format!("perm:{i}")).chain(["order:read".to_string()]).collect(),
    );
    let requirement = PermissionRequirement::authority("order:read");

    c.bench_function("authorize_held_authority", |b| {
        b.iter(|| policy.authorize(black_box("/orders/1"), &requirement, Some(&identity)));
    });
}

criterion_group!(benches, bench_issue, bench_verify, bench_authorize);
criterion_main!(benches);
