//! Data and config loading used by the `quiver` binary.

use std::io::Write;

use quiver::cli::{
    build_index, clustered_vectors, default_config, index_stats, load_config, load_vectors,
    run_bench, KindArg,
};
use quiver::{IndexKind, IvfParams, Metric, SearchParams, VectorIndex};
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_vectors_from_json() {
    let file = write_temp("[[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]");
    let vectors = load_vectors(file.path()).unwrap();
    assert_eq!(vectors, vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);
}

#[test]
fn rejects_ragged_and_empty_vector_files() {
    let ragged = write_temp("[[0.0, 1.0], [3.0]]");
    let err = load_vectors(ragged.path()).unwrap_err();
    assert!(err.to_string().contains("Vector 1 has dimension 1"), "{}", err);

    let empty = write_temp("[]");
    assert!(load_vectors(empty.path()).is_err());

    let garbage = write_temp("not json");
    assert!(load_vectors(garbage.path()).is_err());
}

#[test]
fn loads_config_with_defaults() {
    let file = write_temp(r#"{"dim": 4, "kind": {"ivf": {"nlist": 2}}}"#);
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.dim, 4);
    assert_eq!(config.metric, Metric::L2);
    match config.kind {
        IndexKind::Ivf(p) => {
            assert_eq!(p.nlist, 2);
            assert_eq!(p.nprobe, IvfParams::default().nprobe);
        }
        other => panic!("unexpected kind {:?}", other),
    }

    let flat = write_temp(r#"{"dim": 2, "metric": "inner_product", "kind": "flat"}"#);
    let config = load_config(flat.path()).unwrap();
    assert_eq!(config.metric, Metric::InnerProduct);
    assert_eq!(config.kind, IndexKind::Flat);
}

#[test]
fn rejects_invalid_config_at_load() {
    let file = write_temp(r#"{"dim": 10, "kind": {"ivf_pq": {"nlist": 2, "m": 4}}}"#);
    let err = load_config(file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("not divisible"), "{:#}", err);
}

#[test]
fn query_flow_over_loaded_file() {
    let data = clustered_vectors(200, 4, 4, 1);
    let file = write_temp(&serde_json::to_string(&data).unwrap());
    let vectors = load_vectors(file.path()).unwrap();

    for kind in [KindArg::Flat, KindArg::Ivf, KindArg::Lsh, KindArg::Hnsw] {
        let config = default_config(kind, 4, Metric::L2, vectors.len(), 7);
        let index = build_index(&config, &vectors).unwrap();
        let results = index.search(&vectors[9], 3, &SearchParams::default()).unwrap();
        assert_eq!(results[0].id, 9, "{:?}", kind);

        let stats = index_stats(&index);
        assert_eq!(stats["vectors"], 200);
        assert_eq!(stats["dimension"], 4);
    }
}

#[test]
fn bench_reports_exact_recall_for_flat() {
    let mut data = clustered_vectors(520, 8, 8, 2);
    let queries = data.split_off(500);
    let config = default_config(KindArg::Flat, 8, Metric::L2, data.len(), 2);

    let report = run_bench(&config, &data, &queries, 5, &SearchParams::default()).unwrap();
    assert_eq!(report.index, "flat");
    assert_eq!(report.count, 500);
    assert_eq!(report.queries, 20);
    assert_eq!(report.recall, 1.0);
}
