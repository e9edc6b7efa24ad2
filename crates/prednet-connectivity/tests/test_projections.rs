// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Projection building tests: selection, shard files and merging
use prednet_config::{Connectivity, ConnectionType, PrednetConfig};
use prednet_connectivity::{
    read_edges, ConnError, ConnectomeBuilder, EdgeSchema, ExecutionContext, Phase, Populations,
    ShardKind, ShardPaths, ShardedStage, TuningTable, TuningVector,
};
use std::fs;
use std::path::Path;
use std::thread;

fn four_neurons() -> TuningTable {
    TuningTable::from_vectors(&[
        TuningVector::new(0.0, 0.0, 1.0, 0.0),
        TuningVector::new(0.5, 0.0, 1.0, 0.0),
        TuningVector::new(0.0, 0.5, 0.0, 1.0),
        TuningVector::new(0.5, 0.5, -1.0, 0.0),
    ])
}

/// Deterministic spread of positions and directions
fn spread(n: usize) -> TuningTable {
    let vectors: Vec<TuningVector> = (0..n)
        .map(|i| {
            let angle = i as f64 * 2.399_963;
            TuningVector::new(
                (i % 5) as f64 / 5.0,
                (i / 5 % 5) as f64 / 5.0,
                0.4 * angle.cos(),
                0.4 * angle.sin(),
            )
        })
        .collect();
    TuningTable::from_vectors(&vectors)
}

fn base_config(dir: &Path, n_exc: usize, n_inh: usize) -> PrednetConfig {
    let mut config = PrednetConfig::default();
    config.network.n_exc = n_exc;
    config.network.n_inh = n_inh;
    config.output.directory = dir.to_path_buf();
    config
}

/// Run one builder per worker on scoped threads
fn run_workers<T, F>(n_workers: usize, config: &PrednetConfig, pops: &Populations, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&ConnectomeBuilder) -> T + Sync,
{
    let contexts = ExecutionContext::thread_group(n_workers);
    thread::scope(|s| {
        let handles: Vec<_> = contexts
            .into_iter()
            .map(|ctx| {
                let f = &f;
                s.spawn(move || {
                    let builder = ConnectomeBuilder::new(config.clone(), pops.clone(), ctx)
                        .expect("builder");
                    f(&builder)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect()
    })
}

// ============================================================================
// Anisotropic selection
// ============================================================================

#[test]
fn test_four_neuron_scenario_merged_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path(), 4, 4);
    config.projections.ee.connectivity = Connectivity::Anisotropic;
    config.projections.ee.p = 0.25;
    config.projections.ee.w_tgt_in_per_cell = 1.0;

    let pops = Populations::new(four_neurons(), four_neurons());
    let builder = ConnectomeBuilder::new(config, pops, ExecutionContext::Local).unwrap();
    let report = builder
        .build_projection(ConnectionType::Ee)
        .unwrap()
        .expect("ee is enabled");

    assert_eq!(report.edges, 4);
    let merged = report.merged.expect("rank 0 merges");
    assert_eq!(merged, dir.path().join("conn_list_ee_0.dat"));
    assert_eq!(
        fs::read_to_string(merged).unwrap(),
        "1\t0\t1.00e+00\t5.00e+02\t5.00e-01\n\
         0\t1\t1.00e+00\t5.00e+02\t5.00e-01\n\
         3\t2\t1.00e+00\t5.00e+02\t1.50e+00\n\
         2\t3\t1.00e+00\t5.00e+02\t1.50e+00\n"
    );
}

#[test]
fn test_anisotropic_shards_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let config = base_config(dir.path(), 25, 10);
    let pops = Populations::new(spread(25), spread(10));

    let builder = ConnectomeBuilder::new(config, pops, ExecutionContext::Local).unwrap();
    let shard = dir.path().join("conn_list_ee_pid0.dat");

    builder.build_projection(ConnectionType::Ee).unwrap();
    let first = fs::read(&shard).unwrap();
    builder.build_projection(ConnectionType::Ee).unwrap();
    let second = fs::read(&shard).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_worker_count_does_not_change_merged_list() {
    let single_dir = tempfile::tempdir().unwrap();
    let multi_dir = tempfile::tempdir().unwrap();
    let pops = Populations::new(spread(25), spread(10));

    let single = base_config(single_dir.path(), 25, 10);
    ConnectomeBuilder::new(single, pops.clone(), ExecutionContext::Local)
        .unwrap()
        .build_projection(ConnectionType::Ei)
        .unwrap();

    let multi = base_config(multi_dir.path(), 25, 10);
    let reports = run_workers(3, &multi, &pops, |builder| {
        builder.build_projection(ConnectionType::Ei).unwrap().unwrap()
    });

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].targets, 0..4);
    assert_eq!(reports[1].targets, 4..7);
    assert_eq!(reports[2].targets, 7..10);
    assert!(reports[0].merged.is_some());
    assert!(reports[1].merged.is_none());

    let expected = fs::read(single_dir.path().join("conn_list_ei_0.dat")).unwrap();
    let merged = fs::read(multi_dir.path().join("conn_list_ei_0.dat")).unwrap();
    assert_eq!(expected, merged);
}

// ============================================================================
// Edge invariants across policies
// ============================================================================

#[test]
fn test_edges_respect_delay_range_and_no_self_loops() {
    for connectivity in [
        Connectivity::Anisotropic,
        Connectivity::Isotropic,
        Connectivity::Random,
    ] {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config(dir.path(), 25, 10);
        config.delays.delay_range = (1.0, 50.0);
        config.kernel.w_sigma_x = 0.5;
        for conn_type in ConnectionType::ALL {
            let projection = config.projections.get_mut(conn_type);
            projection.connectivity = connectivity;
            projection.p = 0.3;
        }
        let pops = Populations::new(spread(25), spread(10));

        let reports = run_workers(2, &config, &pops, |builder| builder.build_all().unwrap());
        assert_eq!(reports[0].len(), 4);

        for conn_type in ConnectionType::ALL {
            let merged = dir.path().join(format!("conn_list_{}_0.dat", conn_type));
            for edge in read_edges(&merged).unwrap() {
                assert!(
                    edge.delay >= 1.0 && edge.delay <= 50.0,
                    "{} {}: delay {}",
                    connectivity,
                    conn_type,
                    edge.delay
                );
                assert!(edge.weight >= 0.0);
                if conn_type.is_recurrent() {
                    assert_ne!(edge.src, edge.tgt, "{} {} self loop", connectivity, conn_type);
                }
            }
        }
    }
}

// ============================================================================
// Merge consistency
// ============================================================================

#[test]
fn test_merge_reports_missing_shard() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("conn_list_ie_");
    let contexts = ExecutionContext::thread_group(2);

    let results: Vec<Option<ConnError>> = thread::scope(|s| {
        let handles: Vec<_> = contexts
            .into_iter()
            .map(|ctx| {
                let base = base.clone();
                s.spawn(move || {
                    let stage = ShardedStage::new(&ctx, ShardPaths::new(base), EdgeSchema::Standard);
                    if ctx.rank() == 0 {
                        stage.write_local(&[]).unwrap();
                    }
                    stage.barrier(Phase::ShardWrite).unwrap();
                    stage.merge(ShardKind::Raw).err()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    match &results[0] {
        Some(ConnError::MissingShard { rank, phase, path }) => {
            assert_eq!(*rank, 1);
            assert_eq!(*phase, Phase::Merge);
            assert_eq!(path, &dir.path().join("conn_list_ie_pid1.dat"));
        }
        other => panic!("expected missing shard, got {:?}", other),
    }
    assert!(results[1].is_none());
}
