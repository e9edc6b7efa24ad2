// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connectome construction for one worker.

`ConnectomeBuilder` ties configuration, tuning tables and the execution
context together. Each worker of a group builds its own instance and calls
the same methods in the same order; shard files are keyed by rank and rank
0 merges them.
*/

use crate::context::ExecutionContext;
use crate::normalization::{normalize_projection, NormalizationReport};
use crate::partition::target_range;
use crate::pipeline::{ShardKind, ShardPaths, ShardedStage};
use crate::policies::{connect_partition, Projection};
use crate::rng::worker_rng;
use crate::tuning::{Populations, TuningTable};
use crate::types::{ConnError, ConnResult, Phase};
use prednet_config::{Connectivity, ConnectionType, PrednetConfig};
use serde::Serialize;
use std::ops::Range;
use std::path::PathBuf;
use tracing::{debug, info};

/// Summary of one projection built by one worker
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionReport {
    pub conn_type: ConnectionType,
    pub connectivity: Connectivity,
    pub rank: usize,
    pub targets: Range<usize>,
    pub edges: usize,
    pub skipped_targets: Vec<usize>,
    pub shard: PathBuf,
    /// Merged edge list, reported by rank 0 only
    pub merged: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ConnectomeBuilder {
    config: PrednetConfig,
    populations: Populations,
    ctx: ExecutionContext,
}

impl ConnectomeBuilder {
    /// Create a builder; population sizes must match the configuration
    pub fn new(
        config: PrednetConfig,
        populations: Populations,
        ctx: ExecutionContext,
    ) -> ConnResult<Self> {
        let (n_exc, n_inh) = (config.network.n_exc, config.network.n_inh);
        if populations.exc.len() != n_exc || populations.inh.len() != n_inh {
            return Err(ConnError::InvalidParameter(format!(
                "tuning tables have {} exc / {} inh cells, configuration expects {} / {}",
                populations.exc.len(),
                populations.inh.len(),
                n_exc,
                n_inh
            ))
            .in_worker(ctx.rank(), Phase::Startup));
        }
        Ok(Self {
            config,
            populations,
            ctx,
        })
    }

    /// Load the combined tuning table named by the configuration
    pub fn from_config(config: PrednetConfig, ctx: ExecutionContext) -> ConnResult<Self> {
        let rank = ctx.rank();
        let table = TuningTable::load(&config.network.tuning_file)
            .map_err(|e| e.in_worker(rank, Phase::Startup))?;
        let populations =
            Populations::from_combined(&table, config.network.n_exc, config.network.n_inh)
                .map_err(|e| e.in_worker(rank, Phase::Startup))?;
        Self::new(config, populations, ctx)
    }

    pub fn config(&self) -> &PrednetConfig {
        &self.config
    }

    pub fn populations(&self) -> &Populations {
        &self.populations
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn projection(&self, conn_type: ConnectionType) -> Projection<'_> {
        Projection::from_config(conn_type, &self.config, &self.populations)
    }

    /// Targets of `conn_type` owned by this worker
    pub fn local_targets(&self, conn_type: ConnectionType) -> Range<usize> {
        let n_targets = self.populations.table(conn_type.target()).len();
        target_range(n_targets, self.ctx.size(), self.ctx.rank())
    }

    /// Connect one population pair with its configured policy.
    ///
    /// Returns `Ok(None)` when the policy is `none`.
    pub fn build_projection(
        &self,
        conn_type: ConnectionType,
    ) -> ConnResult<Option<ProjectionReport>> {
        let projection = self.projection(conn_type);
        let connectivity = projection.params.connectivity;
        let rank = self.ctx.rank();
        if connectivity == Connectivity::None {
            debug!(target: "prednet-connectivity", "[W{}] {} disabled", rank, conn_type);
            return Ok(None);
        }

        let targets = self.local_targets(conn_type);
        if rank == 0 {
            info!(
                target: "prednet-connectivity",
                "Connect {} {} ({} -> {} cells, {} workers)",
                connectivity,
                conn_type,
                projection.n_sources(),
                projection.n_targets(),
                self.ctx.size()
            );
        }

        let mut rng = worker_rng(self.config.network.seed, conn_type, rank);
        let shard = connect_partition(&projection, targets.clone(), rank, &mut rng)
            .map_err(|e| e.in_worker(rank, Phase::Selection))?;

        let stage = ShardedStage::new(
            &self.ctx,
            ShardPaths::new(self.config.output.conn_list_fn_base(conn_type)),
            projection.schema(),
        );
        let shard_path = stage.write_local(&shard.edges)?;
        stage.barrier(Phase::ShardWrite)?;
        let merged = stage.merge(ShardKind::Raw)?;

        Ok(Some(ProjectionReport {
            conn_type,
            connectivity,
            rank,
            targets,
            edges: shard.edges.len(),
            skipped_targets: shard.skipped_targets,
            shard: shard_path,
            merged,
        }))
    }

    /// Startup barrier, then every population pair in `ee, ei, ie, ii` order
    pub fn build_all(&self) -> ConnResult<Vec<ProjectionReport>> {
        self.ctx.barrier(Phase::Startup)?;

        let mut reports = Vec::new();
        for conn_type in ConnectionType::ALL {
            if let Some(report) = self.build_projection(conn_type)? {
                info!(
                    target: "prednet-connectivity",
                    "[W{}] {}: {} edges, {} targets skipped",
                    report.rank,
                    conn_type,
                    report.edges,
                    report.skipped_targets.len()
                );
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Dump raw affinities of `conn_type` and normalize them globally
    pub fn build_normalized_probabilities(
        &self,
        conn_type: ConnectionType,
    ) -> ConnResult<NormalizationReport> {
        let projection = self.projection(conn_type);
        let paths = ShardPaths::new(self.config.output.probability_list_fn_base(conn_type));
        normalize_projection(
            &self.ctx,
            &projection,
            paths,
            self.local_targets(conn_type),
            self.config.normalization.p_to_w_scaling,
            Some(self.config.normalization.w_thresh_connection),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TuningVector;

    fn populations(n_exc: usize, n_inh: usize) -> Populations {
        let vectors = |n: usize| -> TuningTable {
            TuningTable::from_vectors(
                &(0..n)
                    .map(|i| TuningVector::new(i as f64 / n as f64, 0.3, 0.5, 0.1))
                    .collect::<Vec<_>>(),
            )
        };
        Populations::new(vectors(n_exc), vectors(n_inh))
    }

    #[test]
    fn test_population_size_mismatch() {
        let mut config = PrednetConfig::default();
        config.network.n_exc = 4;
        config.network.n_inh = 2;
        let err = ConnectomeBuilder::new(config, populations(4, 3), ExecutionContext::Local)
            .unwrap_err();
        assert!(matches!(
            err,
            ConnError::Worker {
                phase: Phase::Startup,
                ..
            }
        ));
    }

    #[test]
    fn test_disabled_projection_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PrednetConfig::default();
        config.network.n_exc = 4;
        config.network.n_inh = 2;
        config.output.directory = dir.path().to_path_buf();
        config.projections.ei.connectivity = Connectivity::None;

        let builder =
            ConnectomeBuilder::new(config, populations(4, 2), ExecutionContext::Local).unwrap();
        assert!(builder.build_projection(ConnectionType::Ei).unwrap().is_none());
        assert!(!dir.path().join("conn_list_ei_pid0.dat").exists());
    }
}
