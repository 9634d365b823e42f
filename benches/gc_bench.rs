//! Allocation and GC cycle benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use zmanaged::{Collector, GcConfig, Handle, Heap};

fn create_heap() -> Arc<Heap> {
    Arc::new(Heap::new(GcConfig::default().tlab_size).unwrap())
}

fn bench_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation");
    let heap = create_heap();

    let sizes = [8usize, 16, 32, 64, 80, 128, 256];
    for &size in &sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("young_{}", size), |b| {
            b.iter(|| black_box(heap.allocate_young(size).unwrap()))
        });
    }
    group.finish();
}

fn bench_object_store_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("object");
    let heap = create_heap();
    let a = Handle::new(&heap).unwrap();
    let b = Handle::new(&heap).unwrap();

    group.bench_function("store", |b_| {
        b_.iter(|| {
            a.store(&heap, 0, Some(&b)).unwrap();
            black_box(())
        })
    });

    group.bench_function("load", |b_| {
        b_.iter(|| black_box(a.load(&heap, 0).unwrap()))
    });

    group.finish();
}

fn bench_gc_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc_cycle");
    let heap = create_heap();
    let collector = Arc::new(Collector::new(heap.clone()));

    for _ in 0..256 {
        let _ = heap.allocate_young(80);
    }

    group.bench_function("full_cycle", |b| {
        b.iter(|| {
            collector.gc().unwrap();
            black_box(())
        })
    });

    group.bench_function("minor_cycle", |b| {
        b.iter(|| {
            collector.minor_gc().unwrap();
            black_box(())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_allocation, bench_object_store_load, bench_gc_cycle);
criterion_main!(benches);
