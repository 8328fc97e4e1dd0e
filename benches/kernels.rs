//! Benchmark suite for the measurement kernels
//!
//! Criterion measurements of the raw kernels, independent of the crate's
//! own trial timer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hwprobe::buffer::{AlignedBuffer, BufferSet, DEFAULT_ALIGN};
use hwprobe::kernels::{self, IndexPlan, StencilCoeffs};
use hwprobe::permutation::{random_cycle, shuffled_order};

const SIZES: [usize; 3] = [1 << 10, 1 << 14, 1 << 18];

fn benchmark_throughput_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput_f32");

    for &n in &SIZES {
        let mut bufs = BufferSet::<f32>::provision(n + 8, DEFAULT_ALIGN, 0).unwrap();
        bufs.init_random(12345);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("saxpy", n), &n, |b, &n| {
            b.iter(|| kernels::saxpy(n, black_box(1.111), &bufs.x, &mut bufs.y, 1));
        });
        group.bench_with_input(BenchmarkId::new("dot", n), &n, |b, &n| {
            b.iter(|| black_box(kernels::dot(n, &bufs.x, &bufs.y, 1)));
        });
        group.bench_with_input(BenchmarkId::new("mul", n), &n, |b, &n| {
            b.iter(|| kernels::mul(n, &bufs.x, &bufs.y, &mut bufs.z, 1));
        });
        group.bench_with_input(BenchmarkId::new("stencil3", n), &n, |b, &n| {
            b.iter(|| kernels::stencil3(n, StencilCoeffs::default(), &bufs.x, &mut bufs.y, 1));
        });
    }

    group.finish();
}

fn benchmark_misaligned_saxpy(c: &mut Criterion) {
    let n = 1 << 16;
    let mut group = c.benchmark_group("saxpy_misalign");
    group.throughput(Throughput::Elements(n as u64));

    for misalign in [0, 4, 16, 32] {
        let mut bufs = BufferSet::<f32>::provision(n, DEFAULT_ALIGN, misalign).unwrap();
        bufs.init_random(12345);
        group.bench_with_input(BenchmarkId::from_parameter(misalign), &misalign, |b, _| {
            b.iter(|| kernels::saxpy(n, black_box(1.111), &bufs.x, &mut bufs.y, 1));
        });
    }

    group.finish();
}

fn benchmark_patterns(c: &mut Criterion) {
    let n = 1 << 14;
    let x = AlignedBuffer::<f32>::filled(n, DEFAULT_ALIGN, 0, 1.0).unwrap();
    let mut y = AlignedBuffer::<f32>::filled(n, DEFAULT_ALIGN, 0, 2.0).unwrap();
    let mut group = c.benchmark_group("saxpy_pattern");

    let plans = [
        ("sequential", IndexPlan::Sequential),
        ("strided16", IndexPlan::Strided(16)),
        ("random", IndexPlan::Random(shuffled_order(n, 12345))),
    ];
    for (name, plan) in &plans {
        group.bench_function(*name, |b| {
            b.iter(|| kernels::saxpy_indexed(1.1, &x, &mut y, black_box(plan)));
        });
    }

    group.finish();
}

fn benchmark_chase(c: &mut Criterion) {
    let mut group = c.benchmark_group("chase_1000_hops");

    for bytes in [16 << 10, 1 << 20] {
        let next = random_cycle(bytes / 4, 123_456_789).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(bytes), &next, |b, next| {
            let mut cur = 0;
            b.iter(|| {
                cur = kernels::chase(next, cur, 1000);
                black_box(cur)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_throughput_kernels,
    benchmark_misaligned_saxpy,
    benchmark_patterns,
    benchmark_chase,
);
criterion_main!(benches);
