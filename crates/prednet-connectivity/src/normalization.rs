// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Two-phase weight normalization.

Phase 1 dumps the raw affinity of every eligible pair in the worker's
target range. Phase 2 reloads the dump, reduces the probability mass over
all workers and rescales every row so the whole projection sums to
`p_to_w_scaling`:

```text
w = p / Σ_all_workers p · p_to_w_scaling
```

Rows at or below the pruning threshold are dropped after rescaling. Rank 0
then merges the normalized shards.
*/

use crate::context::ExecutionContext;
use crate::io::EdgeSchema;
use crate::pipeline::{ShardKind, ShardPaths, ShardedStage};
use crate::policies::anisotropic::score_sources;
use crate::policies::Projection;
use crate::types::{ConnError, ConnResult, Edge, Gid, Phase};
use serde::Serialize;
use std::ops::Range;
use std::path::PathBuf;
use tracing::{debug, info};

/// Outcome of a normalization run on one worker
#[derive(Debug, Clone, Serialize)]
pub struct NormalizationReport {
    pub rank: usize,
    pub rows_dumped: usize,
    pub rows_kept: usize,
    pub local_sum: f64,
    pub global_sum: f64,
    pub shard: PathBuf,
    pub merged: Option<PathBuf>,
}

/// Phase 1 rows `(src, tgt, raw p, delay)` for a target range
pub fn probability_rows(
    projection: &Projection<'_>,
    targets: Range<Gid>,
) -> ConnResult<Vec<Edge>> {
    let mut rows = Vec::new();
    for tgt in targets {
        for candidate in score_sources(projection, tgt)? {
            let delay = projection
                .delays
                .clamp(candidate.latency * projection.delays.delay_scale);
            rows.push(Edge::new(candidate.src, tgt, candidate.probability, delay));
        }
    }
    Ok(rows)
}

/// Rescale rows by the global probability mass.
///
/// # Errors
///
/// `ConnError::Degenerate` if the global sum is zero (or not finite).
pub fn rescale(
    mut rows: Vec<Edge>,
    global_sum: f64,
    p_to_w_scaling: f64,
    w_thresh: Option<f64>,
) -> ConnResult<Vec<Edge>> {
    if !(global_sum > 0.0) || !global_sum.is_finite() {
        return Err(ConnError::Degenerate(format!(
            "global probability sum is {}",
            global_sum
        )));
    }
    for row in &mut rows {
        row.weight = row.weight / global_sum * p_to_w_scaling;
    }
    if let Some(thresh) = w_thresh {
        rows.retain(|row| row.weight > thresh);
    }
    Ok(rows)
}

/// Run both phases and the merge for one projection.
///
/// Every worker of `ctx` must call this with the same arguments.
pub fn normalize_projection(
    ctx: &ExecutionContext,
    projection: &Projection<'_>,
    paths: ShardPaths,
    targets: Range<Gid>,
    p_to_w_scaling: f64,
    w_thresh: Option<f64>,
) -> ConnResult<NormalizationReport> {
    let rank = ctx.rank();
    let stage = ShardedStage::new(ctx, paths, EdgeSchema::Probability);

    let rows = probability_rows(projection, targets.clone())
        .map_err(|e| e.in_worker(rank, Phase::Selection))?;
    let rows_dumped = rows.len();
    stage.write_local(&rows)?;
    debug!(
        target: "prednet-connectivity",
        "[W{}] {} probability dump: {} rows for targets {:?}",
        rank,
        projection.conn_type,
        rows_dumped,
        targets
    );
    stage.barrier(Phase::ShardWrite)?;

    let outcome = stage.reduce_and_rewrite(
        |rows| rows.iter().map(|row| row.weight).sum(),
        |rows, global| rescale(rows, global, p_to_w_scaling, w_thresh),
    )?;
    stage.barrier(Phase::Normalization)?;

    let merged = stage.merge(ShardKind::Normalized)?;
    if let Some(path) = &merged {
        info!(
            target: "prednet-connectivity",
            "{} normalized over global sum {:.4e} into {}",
            projection.conn_type,
            outcome.global,
            path.display()
        );
    }

    Ok(NormalizationReport {
        rank,
        rows_dumped,
        rows_kept: outcome.rows_out,
        local_sum: outcome.local,
        global_sum: outcome.global,
        shard: outcome.path,
        merged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_sums_to_scaling() {
        let rows = vec![
            Edge::new(0, 1, 0.2, 1.0),
            Edge::new(1, 0, 0.6, 1.0),
            Edge::new(2, 0, 0.2, 1.0),
        ];
        let out = rescale(rows, 1.0, 3.0, None).unwrap();
        let total: f64 = out.iter().map(|r| r.weight).sum();
        assert!((total - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rescale_prunes_after_scaling() {
        let rows = vec![Edge::new(0, 1, 0.01, 1.0), Edge::new(1, 0, 0.99, 1.0)];
        let out = rescale(rows, 1.0, 1.0, Some(0.05)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].src, 1);
    }

    #[test]
    fn test_zero_global_sum_is_degenerate() {
        let rows = vec![Edge::new(0, 1, 0.0, 1.0)];
        assert!(matches!(
            rescale(rows, 0.0, 1.0, None),
            Err(ConnError::Degenerate(_))
        ));
    }
}
