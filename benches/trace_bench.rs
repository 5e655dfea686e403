//! Производительность трассировки на цепочках поляризаторов и зеркальном резонаторе.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polartrace::scene::{ComponentKind, ComponentParams, OpticalComponent, Overrides};
use polartrace::{trace, TraceCache, TraceConfig};

fn polarizer_chain(len: usize) -> Vec<OpticalComponent> {
    let mut components = vec![OpticalComponent::new("laser", ComponentKind::Emitter, 0.0, 0.0)];
    for i in 0..len {
        components.push(
            OpticalComponent::new(format!("p{i}"), ComponentKind::Polarizer, 10.0 * (i + 1) as f64, 0.0)
                .with_params(ComponentParams {
                    polarization_angle: Some(90.0 * (i + 1) as f64 / len as f64),
                    ..Default::default()
                }),
        );
    }
    components.push(OpticalComponent::new(
        "sensor",
        ComponentKind::Sensor,
        10.0 * (len + 1) as f64,
        0.0,
    ));
    components
}

fn mirror_cavity() -> Vec<OpticalComponent> {
    let mirror = |id: &str, x: f64| {
        OpticalComponent::new(id, ComponentKind::Mirror, x, 50.0).with_params(ComponentParams {
            angle: Some(90.0),
            ..Default::default()
        })
    };
    vec![
        OpticalComponent::new("laser", ComponentKind::Emitter, 50.0, 50.0),
        mirror("right", 70.0),
        mirror("left", 30.0),
    ]
}

fn benchmark_polarizer_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("polarizer_chain");
    let cfg = TraceConfig {
        max_depth: 256,
        ..TraceConfig::default()
    };
    for len in [4usize, 16, 64] {
        let components = polarizer_chain(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &components, |b, components| {
            b.iter(|| trace(black_box(components), &Overrides::new(), &cfg))
        });
    }
    group.finish();
}

fn benchmark_mirror_cavity(c: &mut Criterion) {
    let components = mirror_cavity();
    let cfg = TraceConfig::default();
    c.bench_function("mirror_cavity", |b| {
        b.iter(|| trace(black_box(&components), &Overrides::new(), &cfg))
    });
}

fn benchmark_cache_hit(c: &mut Criterion) {
    let components = polarizer_chain(16);
    let cfg = TraceConfig::default();
    let cache = TraceCache::default();
    cache.trace(&components, &Overrides::new(), &cfg);
    c.bench_function("cache_hit", |b| {
        b.iter(|| cache.trace(black_box(&components), &Overrides::new(), &cfg))
    });
}

criterion_group!(
    benches,
    benchmark_polarizer_chain,
    benchmark_mirror_cavity,
    benchmark_cache_hit
);

criterion_main!(benches);
