// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Selection policies.

A policy turns one target's candidate sources into a bounded edge set with
weights and delays. Policies keep no state across targets, so a worker can
walk its target range in any order; rows come out in the order targets are
visited.

- [`anisotropic`]: top-k (or bottom-k) by motion-prediction affinity
- [`isotropic`]: distance-dependent Bernoulli acceptance
- [`random`]: density-only Bernoulli acceptance with normal weights/delays
*/

pub mod anisotropic;
pub mod isotropic;
pub mod random;

use crate::geometry::Torus;
use crate::io::EdgeSchema;
use crate::probability::KernelParams;
use crate::tuning::{Populations, TuningTable};
use crate::types::{ConnResult, Edge, EdgeShard, Gid};
use prednet_config::{
    Connectivity, ConnectionType, DelayConfig, PrednetConfig, ProjectionConfig,
};
use rand::Rng;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Everything a policy needs to connect one population pair
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    pub conn_type: ConnectionType,
    pub sources: &'a TuningTable,
    pub targets: &'a TuningTable,
    pub params: &'a ProjectionConfig,
    pub kernel: KernelParams,
    pub delays: &'a DelayConfig,
    pub w_thresh: f64,
}

impl<'a> Projection<'a> {
    /// Resolve source and target tables and parameters for `conn_type`
    pub fn from_config(
        conn_type: ConnectionType,
        config: &'a PrednetConfig,
        populations: &'a Populations,
    ) -> Self {
        let torus = Torus::new(config.network.torus_width, config.network.torus_height);
        Self {
            conn_type,
            sources: populations.table(conn_type.source()),
            targets: populations.table(conn_type.target()),
            params: config.projections.get(conn_type),
            kernel: KernelParams::from_config(&config.kernel, torus),
            delays: &config.delays,
            w_thresh: config.normalization.w_thresh_connection,
        }
    }

    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn n_targets(&self) -> usize {
        self.targets.len()
    }

    /// Sources that may connect onto `tgt`; recurrent pairs never self-connect
    pub fn eligible_sources(&self, tgt: Gid) -> impl Iterator<Item = Gid> + '_ {
        let recurrent = self.conn_type.is_recurrent();
        (0..self.n_sources()).filter(move |&src| !(recurrent && src == tgt))
    }

    /// Column layout of the shard this projection's policy writes
    pub fn schema(&self) -> EdgeSchema {
        match self.params.connectivity {
            Connectivity::Anisotropic => EdgeSchema::Anisotropic,
            _ => EdgeSchema::Standard,
        }
    }
}

/// Edges of one target, or why it has none
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOutcome {
    Connected(Vec<Edge>),
    /// No candidate sources, or their probability mass is zero
    Skipped(&'static str),
}

/// Run the configured policy over a worker's target range
pub fn connect_partition<R: Rng>(
    projection: &Projection<'_>,
    targets: Range<Gid>,
    rank: usize,
    rng: &mut R,
) -> ConnResult<EdgeShard> {
    let mut shard = EdgeShard {
        conn_type: projection.conn_type,
        rank,
        targets: targets.clone(),
        edges: Vec::new(),
        skipped_targets: Vec::new(),
    };

    if projection.params.connectivity == Connectivity::Anisotropic
        && anisotropic::sources_per_target(projection.params.p, projection.n_sources()) == 0
    {
        info!(
            target: "prednet-connectivity",
            "[W{}] {}: p = {} keeps no source of {}, no edges",
            rank,
            projection.conn_type,
            projection.params.p,
            projection.n_sources()
        );
    }

    for tgt in targets {
        let outcome = match projection.params.connectivity {
            Connectivity::Anisotropic => anisotropic::connect_target(projection, tgt)?,
            Connectivity::Isotropic => isotropic::connect_target(projection, tgt, rng)?,
            Connectivity::Random => random::connect_target(projection, tgt, rng)?,
            Connectivity::None => TargetOutcome::Connected(Vec::new()),
        };
        match outcome {
            TargetOutcome::Connected(edges) => shard.edges.extend(edges),
            TargetOutcome::Skipped(reason) => {
                warn!(
                    target: "prednet-connectivity",
                    "[W{}] {} target {} skipped: {}",
                    rank,
                    projection.conn_type,
                    tgt,
                    reason
                );
                shard.skipped_targets.push(tgt);
            }
        }
    }

    debug!(
        target: "prednet-connectivity",
        "[W{}] {} targets {:?}: {} edges, {} skipped",
        rank,
        projection.conn_type,
        shard.targets,
        shard.edges.len(),
        shard.skipped_targets.len()
    );
    Ok(shard)
}

/// Drop edges at or below the pruning threshold
pub(crate) fn prune(edges: &mut Vec<Edge>, w_thresh: f64) {
    edges.retain(|edge| edge.weight > w_thresh);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::TuningVector;

    /// Four neurons on the unit torus used across policy tests
    pub fn four_neurons() -> TuningTable {
        TuningTable::from_vectors(&[
            TuningVector::new(0.0, 0.0, 1.0, 0.0),
            TuningVector::new(0.5, 0.0, 1.0, 0.0),
            TuningVector::new(0.0, 0.5, 0.0, 1.0),
            TuningVector::new(0.5, 0.5, -1.0, 0.0),
        ])
    }

    pub fn config(connectivity: Connectivity, p: f64) -> PrednetConfig {
        let mut config = PrednetConfig::default();
        config.network.n_exc = 4;
        config.network.n_inh = 4;
        for conn_type in ConnectionType::ALL {
            let projection = config.projections.get_mut(conn_type);
            projection.connectivity = connectivity;
            projection.p = p;
            projection.w_tgt_in_per_cell = 1.0;
        }
        config.kernel.w_sigma_x = 0.3;
        config.kernel.w_sigma_v = 0.3;
        config.normalization.w_thresh_connection = 0.0;
        config
    }

    pub fn populations() -> Populations {
        Populations::new(four_neurons(), four_neurons())
    }
}
