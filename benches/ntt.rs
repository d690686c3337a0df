use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use recursive_pir::math::{NttContext, Poly, DEFAULT_Q};

fn ntt_benchmark(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let mut group = c.benchmark_group("ntt");

    for d in [1024usize, 2048, 4096] {
        let ctx = NttContext::new(d, DEFAULT_Q);
        let poly = Poly::random_with_rng(d, DEFAULT_Q, &mut rng);
        let other = Poly::random_with_rng(d, DEFAULT_Q, &mut rng);

        group.bench_with_input(BenchmarkId::new("forward", d), &d, |b, _| {
            b.iter(|| {
                let mut coeffs = poly.coeffs().to_vec();
                ctx.forward(&mut coeffs);
                coeffs
            });
        });

        group.bench_with_input(BenchmarkId::new("inverse", d), &d, |b, _| {
            b.iter(|| {
                let mut coeffs = poly.coeffs().to_vec();
                ctx.inverse(&mut coeffs);
                coeffs
            });
        });

        group.bench_with_input(BenchmarkId::new("mul", d), &d, |b, _| {
            b.iter(|| poly.mul_ntt(&other, &ctx));
        });
    }

    group.finish();
}

criterion_group!(benches, ntt_benchmark);
criterion_main!(benches);
