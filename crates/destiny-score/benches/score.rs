//! Benchmarks for score generation.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use destiny_score::{ScoreGenerator, ScoreTable, label_for};

fn bench_generate(c: &mut Criterion) {
    let mut generator = ScoreGenerator::seeded(1);
    c.bench_function("score_generate", |b| b.iter(|| black_box(generator.generate())));
}

fn bench_pick(c: &mut Criterion) {
    let table = ScoreTable::default();
    c.bench_function("score_table_pick", |b| {
        b.iter(|| table.pick(black_box(0.82), black_box(0.37)))
    });
}

fn bench_label(c: &mut Criterion) {
    c.bench_function("label_for", |b| b.iter(|| label_for(black_box(87))));
}

criterion_group!(benches, bench_generate, bench_pick, bench_label);
criterion_main!(benches);
