//! Recall behaves as documented: widening a search never hurts, and
//! product quantization never beats full-precision IVF.

use quiver::eval::{ground_truth, mean_recall};
use quiver::simd::l2_normalized;
use quiver::{
    FlatIndex, Hnsw, HnswParams, IvfIndex, IvfParams, IvfPqIndex, IvfPqParams, LshIndex,
    LshParams, Metric, Neighbor, VectorId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const K: usize = 10;

fn clustered(n: usize, dim: usize, clusters: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<Vec<f32>> = (0..clusters)
        .map(|_| (0..dim).map(|_| rng.gen::<f32>() * 10.0).collect())
        .collect();
    (0..n)
        .map(|_| {
            let c = &centers[rng.gen_range(0..clusters)];
            c.iter().map(|x| x + rng.gen::<f32>() * 2.0 - 1.0).collect()
        })
        .collect()
}

fn unit_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let v: Vec<f32> = (0..dim).map(|_| rng.gen::<f32>() - 0.5).collect();
            l2_normalized(&v)
        })
        .collect()
}

fn truth(data: &[Vec<f32>], queries: &[Vec<f32>], metric: Metric) -> Vec<Vec<VectorId>> {
    let mut flat = FlatIndex::new(data[0].len(), metric).unwrap();
    flat.add(data).unwrap();
    ground_truth(&flat, queries, K).unwrap()
}

fn per_query_recall(truth: &[Vec<VectorId>], results: &[Vec<Neighbor>]) -> Vec<f64> {
    truth
        .iter()
        .zip(results)
        .map(|(t, r)| quiver::eval::recall_at_k(t, r))
        .collect()
}

#[test]
fn ivf_recall_non_decreasing_in_nprobe() {
    let mut data = clustered(2050, 16, 20, 1);
    let queries = data.split_off(2000);
    let truth = truth(&data, &queries, Metric::L2);

    let mut index = IvfIndex::new(16, Metric::L2, IvfParams::new(32).with_seed(1)).unwrap();
    index.train(&data).unwrap();
    index.add(&data).unwrap();

    let mut previous = vec![0.0; queries.len()];
    for nprobe in [1, 2, 4, 8, 16, 32] {
        let results: Vec<_> = queries
            .iter()
            .map(|q| index.search(q, K, Some(nprobe)).unwrap())
            .collect();
        let recall = per_query_recall(&truth, &results);
        for (now, before) in recall.iter().zip(&previous) {
            assert!(now >= before, "nprobe {}: {} < {}", nprobe, now, before);
        }
        previous = recall;
    }
    // every list probed: exact
    assert!(previous.iter().all(|&r| r == 1.0));
}

#[test]
fn lsh_recall_non_decreasing_in_radius() {
    let mut data = unit_vectors(1550, 16, 2);
    let queries = data.split_off(1500);
    let truth = truth(&data, &queries, Metric::L2);

    let mut index = LshIndex::new(16, Metric::L2, LshParams::new(12).with_seed(2)).unwrap();
    index.add(&data).unwrap();

    let mut previous = vec![0.0; queries.len()];
    for radius in 0..=12 {
        let results: Vec<_> = queries
            .iter()
            .map(|q| index.search(q, K, Some(radius)).unwrap())
            .collect();
        let recall = per_query_recall(&truth, &results);
        for (now, before) in recall.iter().zip(&previous) {
            assert!(now >= before, "radius {}: {} < {}", radius, now, before);
        }
        previous = recall;
    }
}

#[test]
fn hnsw_recall_non_decreasing_in_ef_search() {
    let mut data = unit_vectors(2020, 32, 3);
    let queries = data.split_off(2000);
    let truth = truth(&data, &queries, Metric::L2);

    let mut index = Hnsw::new(32, Metric::L2, HnswParams::new(8, 64, 10).with_seed(3)).unwrap();
    index.add(&data).unwrap();

    let mut previous = 0.0;
    for ef in [10, 40, 160, 640] {
        let results: Vec<_> = queries
            .iter()
            .map(|q| index.search(q, K, Some(ef)).unwrap())
            .collect();
        let recall = mean_recall(&truth, &results);
        assert!(recall >= previous, "ef {}: {} < {}", ef, recall, previous);
        previous = recall;
    }
    assert!(previous > 0.95, "recall at ef=640: {}", previous);
}

#[test]
fn hnsw_unit_vector_recall_at_10() {
    let data = unit_vectors(1000, 32, 4);
    let queries = unit_vectors(50, 32, 5);
    let truth = truth(&data, &queries, Metric::L2);

    let mut index =
        Hnsw::new(32, Metric::L2, HnswParams::new(16, 200, 200).with_seed(4)).unwrap();
    index.add(&data).unwrap();

    let results: Vec<_> = queries
        .iter()
        .map(|q| index.search(q, K, None).unwrap())
        .collect();
    let recall = mean_recall(&truth, &results);
    assert!(recall >= 0.95, "recall@10 = {}", recall);
}

#[test]
fn ivf_pq_recall_never_exceeds_ivf() {
    let mut data = clustered(2040, 32, 16, 6);
    let queries = data.split_off(2000);
    let truth = truth(&data, &queries, Metric::L2);

    let mut ivf = IvfIndex::new(32, Metric::L2, IvfParams::new(16).with_seed(6)).unwrap();
    ivf.train(&data).unwrap();
    ivf.add(&data).unwrap();

    let mut ivf_pq =
        IvfPqIndex::new(32, Metric::L2, IvfPqParams::new(16, 8, 6).with_seed(6)).unwrap();
    ivf_pq.train(&data).unwrap();
    ivf_pq.add(&data).unwrap();

    for nprobe in [1, 4, 16] {
        let exact: Vec<_> = queries
            .iter()
            .map(|q| ivf.search(q, K, Some(nprobe)).unwrap())
            .collect();
        let compressed: Vec<_> = queries
            .iter()
            .map(|q| ivf_pq.search(q, K, Some(nprobe)).unwrap())
            .collect();
        let ivf_recall = mean_recall(&truth, &exact);
        let pq_recall = mean_recall(&truth, &compressed);
        assert!(
            pq_recall <= ivf_recall,
            "nprobe {}: ivf-pq {} > ivf {}",
            nprobe,
            pq_recall,
            ivf_recall
        );
    }
}

#[test]
fn inner_product_ivf_full_probe_matches_flat() {
    let mut data = clustered(1010, 8, 8, 7);
    let queries = data.split_off(1000);

    let mut flat = FlatIndex::new(8, Metric::InnerProduct).unwrap();
    flat.add(&data).unwrap();
    let mut ivf = IvfIndex::new(8, Metric::InnerProduct, IvfParams::new(8).with_seed(7)).unwrap();
    ivf.train(&data).unwrap();
    ivf.add(&data).unwrap();

    for q in &queries {
        assert_eq!(ivf.search(q, K, Some(8)).unwrap(), flat.search(q, K).unwrap());
    }
}
