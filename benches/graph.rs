//! Benchmarks for graph construction and search.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use vamana::{Metric, SearchResult, Vamana, VamanaConfig};

fn random_unit_vectors(n: usize, dims: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| {
            let v: Vec<f32> = (0..dims).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect();
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            v.into_iter().map(|x| x / norm.max(1e-10)).collect()
        })
        .collect()
}

fn build(vectors: &[Vec<f32>], max_degree: usize, l: usize) -> Vamana {
    let mut graph = Vamana::new(VamanaConfig {
        dims: vectors[0].len(),
        max_degree,
        metric: Metric::L2,
        medoid_interval: 0,
    })
    .expect("valid config");
    for (id, v) in vectors.iter().enumerate() {
        graph.insert(id as u32, v.clone(), l, 1.2);
    }
    graph
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.sample_size(10);

    for n in [500usize, 2000].iter() {
        let vectors = random_unit_vectors(*n, 64);
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |bench, _| {
            bench.iter(|| build(black_box(&vectors), 16, 48));
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    let vectors = random_unit_vectors(2000, 64);
    let graph = build(&vectors, 16, 48);
    let queries = random_unit_vectors(64, 64);

    for l in [16usize, 64, 128].iter() {
        group.bench_with_input(BenchmarkId::new("beam", l), l, |bench, &l| {
            let mut out = SearchResult::default();
            let mut i = 0usize;
            bench.iter(|| {
                let query = &queries[i % queries.len()];
                i += 1;
                graph.greedy_search(graph.start_node(), black_box(query), 10, l, &mut out, None);
                black_box(out.nearest.len())
            });
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    group.sample_size(10);

    group.bench_function("remove_200_of_1000", |bench| {
        let vectors = random_unit_vectors(1000, 64);
        bench.iter_with_setup(
            || build(&vectors, 16, 48),
            |mut graph| {
                for id in (0..1000u32).step_by(5) {
                    graph.remove(id);
                }
                graph.batch_delete();
                black_box(graph.len())
            },
        );
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_search, bench_remove);
criterion_main!(benches);
