use criterion::{Criterion, criterion_group, criterion_main};
use df_prob::sampler::DEFAULT_NPX;
use df_prob::{EtaDensity, PhiDensity, TabulatedCdf};
use rand::SeedableRng;
use std::hint::black_box;

fn bench_tabulated_cdf(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);

    c.bench_function("phi_table_build_npx50", |b| {
        b.iter(|| black_box(TabulatedCdf::build(&PhiDensity::new(black_box(0.0087)), DEFAULT_NPX).unwrap()))
    });

    c.bench_function("phi_build_and_draw_npx50", |b| {
        b.iter(|| {
            let table = TabulatedCdf::build(&PhiDensity::new(black_box(-0.0087)), DEFAULT_NPX).unwrap();
            black_box(table.sample(&mut rng))
        })
    });

    let eta = TabulatedCdf::build(&EtaDensity::new(0.056, 0.8).unwrap(), DEFAULT_NPX).unwrap();
    c.bench_function("eta_draw_10k", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for _ in 0..10_000 {
                acc += eta.sample(&mut rng);
            }
            black_box(acc)
        })
    });
}

criterion_group!(benches, bench_tabulated_cdf);
criterion_main!(benches);
