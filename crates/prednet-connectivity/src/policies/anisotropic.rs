// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Anisotropic top-k selection.

Every eligible source is scored against the target with the
motion-prediction model and ranked ascending by probability (stable, so
ties keep source order). Excitatory sources keep the `k` highest scores,
inhibitory sources the `k` lowest, with `k = round(p · n_src)`. Kept edges
share the target's input budget in proportion to their probability:

```text
w_i = w_tgt_in / Σ_kept p · p_i
```
*/

use super::{prune, Projection, TargetOutcome};
use crate::geometry::euclidean;
use crate::types::{ConnResult, ConnectionCandidate, Edge, Gid};
use prednet_config::Population;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Score every eligible source of `tgt`, in source order
pub fn score_sources(
    projection: &Projection<'_>,
    tgt: Gid,
) -> ConnResult<Vec<ConnectionCandidate>> {
    let tgt_tuning = projection.targets.get(tgt);
    let sources: Vec<Gid> = projection.eligible_sources(tgt).collect();

    #[cfg(feature = "parallel")]
    let iter = sources.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = sources.iter();

    iter.map(|&src| {
        projection
            .kernel
            .candidate(src, &projection.sources.get(src), tgt, &tgt_tuning)
    })
    .collect()
}

/// Number of sources kept per target
pub fn sources_per_target(p: f64, n_src: usize) -> usize {
    (p * n_src as f64).round().max(0.0) as usize
}

/// Pick the kept candidates out of a target's scored sources
pub fn select(
    mut candidates: Vec<ConnectionCandidate>,
    k: usize,
    source_population: Population,
) -> Vec<ConnectionCandidate> {
    candidates.sort_by(|a, b| a.probability.total_cmp(&b.probability));
    let k = k.min(candidates.len());
    match source_population {
        Population::Excitatory => candidates.split_off(candidates.len() - k),
        Population::Inhibitory => {
            candidates.truncate(k);
            candidates
        }
    }
}

pub fn connect_target(projection: &Projection<'_>, tgt: Gid) -> ConnResult<TargetOutcome> {
    let k = sources_per_target(projection.params.p, projection.n_sources());
    if k == 0 {
        return Ok(TargetOutcome::Connected(Vec::new()));
    }

    let candidates = score_sources(projection, tgt)?;
    if candidates.is_empty() {
        return Ok(TargetOutcome::Skipped("no eligible sources"));
    }

    let kept = select(candidates, k, projection.conn_type.source());
    let mass: f64 = kept.iter().map(|c| c.probability).sum();
    if !(mass > 0.0) {
        return Ok(TargetOutcome::Skipped("zero probability mass"));
    }

    let scale = projection.params.w_tgt_in_per_cell / mass;
    let tgt_tuning = projection.targets.get(tgt).as_array();
    let mut edges: Vec<Edge> = kept
        .iter()
        .map(|c| {
            let delay = projection
                .delays
                .clamp(c.latency * projection.delays.delay_scale);
            let distance = euclidean(&projection.sources.get(c.src).as_array(), &tgt_tuning);
            Edge::new(c.src, tgt, scale * c.probability, delay).with_distance(distance)
        })
        .collect();
    prune(&mut edges, projection.w_thresh);

    Ok(TargetOutcome::Connected(edges))
}
