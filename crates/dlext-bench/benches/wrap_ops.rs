//! Criterion micro-benchmarks for descriptor construction and release.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use dlext_bench::{accelerated_engine, reference_engine};
use dlext_core::{ExecutionSpace, Property};
use dlext_tensor::TensorPool;
use dlext_view::SystemView;

fn bench_wrap_host(c: &mut Criterion) {
    let mut engine = reference_engine(42);
    let mut view = SystemView::new(&mut engine);
    c.bench_function("wrap_positions_host", |b| {
        b.iter(|| black_box(view.wrap(Property::Positions, ExecutionSpace::Host).unwrap()));
    });
}

fn bench_wrap_all(c: &mut Criterion) {
    let mut engine = reference_engine(42);
    let mut view = SystemView::new(&mut engine);
    c.bench_function("wrap_all_properties_host", |b| {
        b.iter(|| {
            for property in Property::CALLBACK_ORDER {
                black_box(view.wrap(property, ExecutionSpace::Host).unwrap());
            }
        });
    });
}

fn bench_wrap_device(c: &mut Criterion) {
    let mut engine = accelerated_engine(42);
    let mut view = SystemView::new(&mut engine);
    c.bench_function("wrap_forces_device", |b| {
        b.iter(|| black_box(view.wrap(Property::Forces, ExecutionSpace::Device).unwrap()));
    });
}

fn bench_pooled(c: &mut Criterion) {
    let mut engine = reference_engine(42);
    let mut view = SystemView::new(&mut engine);
    let mut pool = TensorPool::new();
    c.bench_function("wrap_pooled_then_evict", |b| {
        b.iter(|| {
            for property in Property::CALLBACK_ORDER {
                black_box(
                    view.wrap_pooled(&mut pool, property, ExecutionSpace::Host)
                        .unwrap(),
                );
            }
            black_box(pool.evict_all())
        });
    });
}

criterion_group!(
    benches,
    bench_wrap_host,
    bench_wrap_all,
    bench_wrap_device,
    bench_pooled
);
criterion_main!(benches);
