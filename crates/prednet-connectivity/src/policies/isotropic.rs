// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Isotropic distance-dependent connectivity.

Each candidate source is accepted with probability
`p_max · exp(-d / (2σx²))` where `d` is the toroidal distance between the
preferred positions. Accepted edges start with the uniform weight and are
then rescaled so the target receives exactly its input budget; in-degree
varies from target to target.
*/

use super::{prune, Projection, TargetOutcome};
use crate::geometry::torus_distance_2d;
use crate::types::{ConnResult, Edge, Gid};
use rand::Rng;

/// Acceptance probability for a source at distance `d`
pub fn isotropic_acceptance(d: f64, p_max: f64, sigma_x: f64) -> f64 {
    p_max * (-d / (2.0 * sigma_x * sigma_x)).exp()
}

pub fn connect_target<R: Rng>(
    projection: &Projection<'_>,
    tgt: Gid,
    rng: &mut R,
) -> ConnResult<TargetOutcome> {
    let tgt_tuning = projection.targets.get(tgt);
    let torus = projection.kernel.torus;
    let params = projection.params;

    let mut eligible = 0usize;
    let mut accepted: Vec<(Gid, f64)> = Vec::new();
    for src in projection.eligible_sources(tgt) {
        eligible += 1;
        let src_tuning = projection.sources.get(src);
        let d = torus_distance_2d(src_tuning.x, tgt_tuning.x, src_tuning.y, tgt_tuning.y, torus);
        let p = isotropic_acceptance(d, params.p_max, projection.kernel.sigma_x);
        if rng.gen::<f64>() <= p {
            accepted.push((src, d));
        }
    }

    if eligible == 0 {
        return Ok(TargetOutcome::Skipped("no eligible sources"));
    }
    if accepted.is_empty() {
        return Ok(TargetOutcome::Connected(Vec::new()));
    }

    // Uniform weights rescaled to the budget
    let total = params.w_uniform * accepted.len() as f64;
    if !(total > 0.0) {
        return Ok(TargetOutcome::Skipped("zero probability mass"));
    }
    let weight = params.w_uniform * params.w_tgt_in_per_cell / total;

    let mut edges: Vec<Edge> = accepted
        .into_iter()
        .map(|(src, d)| {
            let delay = projection.delays.clamp(d * projection.delays.delay_scale);
            Edge::new(src, tgt, weight, delay)
        })
        .collect();
    prune(&mut edges, projection.w_thresh);

    Ok(TargetOutcome::Connected(edges))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::rng::worker_rng;
    use prednet_config::{Connectivity, ConnectionType};

    #[test]
    fn test_acceptance_for_half_unit_distance() {
        let p = isotropic_acceptance(0.5, 1.0, 0.1);
        assert!((p - (-0.5f64 / (2.0 * 0.01)).exp()).abs() < 1e-20);
        assert!((p - 1.3887943864964021e-11).abs() < 1e-22);
    }

    #[test]
    fn test_acceptance_peaks_at_zero_distance() {
        assert_eq!(isotropic_acceptance(0.0, 0.7, 0.3), 0.7);
    }

    #[test]
    fn test_accepted_weights_sum_to_budget() {
        let mut config = config(Connectivity::Isotropic, 0.5);
        // Wide kernel accepts nearly everything
        config.kernel.w_sigma_x = 100.0;
        config.projections.ee.w_tgt_in_per_cell = 0.8;
        let pops = populations();
        let projection = Projection::from_config(ConnectionType::Ee, &config, &pops);
        let mut rng = worker_rng(7, ConnectionType::Ee, 0);

        match connect_target(&projection, 1, &mut rng).unwrap() {
            TargetOutcome::Connected(edges) => {
                assert!(!edges.is_empty());
                assert!(edges.iter().all(|e| e.src != 1));
                let total: f64 = edges.iter().map(|e| e.weight).sum();
                assert!((total - 0.8).abs() < 1e-12);
            }
            TargetOutcome::Skipped(reason) => panic!("unexpected skip: {}", reason),
        }
    }

    #[test]
    fn test_delay_is_clamped_distance() {
        let mut config = config(Connectivity::Isotropic, 0.5);
        config.kernel.w_sigma_x = 100.0;
        config.delays.delay_scale = 1000.0;
        config.delays.delay_range = (1.0, 200.0);
        let pops = populations();
        let projection = Projection::from_config(ConnectionType::Ei, &config, &pops);
        let mut rng = worker_rng(3, ConnectionType::Ei, 0);

        if let TargetOutcome::Connected(edges) = connect_target(&projection, 0, &mut rng).unwrap() {
            for edge in edges {
                assert!(edge.delay >= 1.0 && edge.delay <= 200.0);
                if edge.src == 0 {
                    assert_eq!(edge.delay, 1.0);
                } else {
                    assert_eq!(edge.delay, 200.0);
                }
            }
        }
    }
}
