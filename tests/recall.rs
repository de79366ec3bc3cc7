//! Recall measurement against brute-force ground truth.
//!
//! The graph gives no hard guarantees, only a recall property that
//! strengthens with the beam width, so thresholds here are
//! deliberately conservative: failures indicate a broken graph, not a
//! mildly off-tune one.

use rand::prelude::*;
use vamana::{distance, Metric, SearchResult, Vamana, VamanaConfig};

fn random_unit_vectors(n: usize, dims: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let v: Vec<f32> = (0..dims).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect();
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            v.into_iter().map(|x| x / norm.max(1e-10)).collect()
        })
        .collect()
}

fn brute_force_top_k(
    metric: Metric,
    vectors: &[Vec<f32>],
    query: &[f32],
    k: usize,
) -> Vec<u32> {
    let mut scored: Vec<(f32, u32)> = vectors
        .iter()
        .enumerate()
        .map(|(id, v)| (distance::compute(metric, v, query), id as u32))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().take(k).map(|(_, id)| id).collect()
}

fn build(metric: Metric, vectors: &[Vec<f32>], max_degree: usize, l: usize) -> Vamana {
    let mut graph = Vamana::new(VamanaConfig {
        dims: vectors[0].len(),
        max_degree,
        metric,
        medoid_interval: 0,
    })
    .expect("valid config");
    for (id, v) in vectors.iter().enumerate() {
        graph.insert(id as u32, v.clone(), l, 1.2);
    }
    graph
}

fn recall_at_k(graph: &Vamana, metric: Metric, vectors: &[Vec<f32>], k: usize, l: usize) -> f32 {
    let queries = 40.min(vectors.len());
    let mut hits = 0usize;
    let mut total = 0usize;

    for q in 0..queries {
        let query = &vectors[q * vectors.len() / queries];
        let truth = brute_force_top_k(metric, vectors, query, k);

        let mut out = SearchResult::default();
        graph.greedy_search(graph.start_node(), query, k, l, &mut out, None);

        for c in &out.nearest {
            if truth.contains(&c.id) {
                hits += 1;
            }
        }
        total += truth.len();
    }

    hits as f32 / total as f32
}

#[test]
fn self_queries_find_themselves() {
    let vectors = random_unit_vectors(400, 16, 4242);
    let graph = build(Metric::L2, &vectors, 16, 32);

    let mut found = 0usize;
    for (id, v) in vectors.iter().enumerate().step_by(10) {
        let mut out = SearchResult::default();
        graph.greedy_search(graph.start_node(), v, 1, 32, &mut out, None);
        if out.nearest.first().map(|c| c.id) == Some(id as u32) {
            found += 1;
        }
    }
    let total = vectors.len() / 10;
    assert!(
        found * 10 >= total * 9,
        "only {found}/{total} self-queries returned their own id"
    );
}

#[test]
fn l2_recall_against_brute_force() {
    let vectors = random_unit_vectors(500, 16, 91);
    let graph = build(Metric::L2, &vectors, 16, 48);

    let recall = recall_at_k(&graph, Metric::L2, &vectors, 10, 64);
    assert!(recall >= 0.8, "recall@10 = {recall}");
}

#[test]
fn ip_recall_against_brute_force() {
    let vectors = random_unit_vectors(500, 16, 17);
    let graph = build(Metric::InnerProduct, &vectors, 16, 48);

    let recall = recall_at_k(&graph, Metric::InnerProduct, &vectors, 10, 64);
    assert!(recall >= 0.7, "recall@10 = {recall}");
}

#[test]
fn recall_survives_heavy_deletion() {
    let vectors = random_unit_vectors(400, 16, 55);
    let mut graph = build(Metric::L2, &vectors, 16, 48);

    // Delete a third of the collection in place.
    for id in (0..400u32).step_by(3) {
        graph.remove(id);
    }
    graph.batch_delete();
    assert!(graph.validate_graph());

    let live: Vec<(u32, &Vec<f32>)> = vectors
        .iter()
        .enumerate()
        .map(|(id, v)| (id as u32, v))
        .filter(|(id, _)| id % 3 != 0)
        .collect();

    let mut hits = 0usize;
    let queries = 30;
    for (_, query) in live.iter().take(queries) {
        let mut scored: Vec<(f32, u32)> = live
            .iter()
            .map(|(id, v)| (distance::l2(v, query), *id))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        let truth: Vec<u32> = scored.into_iter().take(5).map(|(_, id)| id).collect();

        let mut out = SearchResult::default();
        graph.greedy_search(graph.start_node(), query, 5, 64, &mut out, None);
        hits += out.nearest.iter().filter(|c| truth.contains(&c.id)).count();
    }

    let recall = hits as f32 / (queries * 5) as f32;
    assert!(recall >= 0.7, "post-deletion recall@5 = {recall}");
}
