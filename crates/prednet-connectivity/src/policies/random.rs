// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Random connectivity with normally distributed weights and delays.

Tuning is ignored: every source-target pair connects independently with
probability `p`. Weights are drawn around `w_tgt_in / (n_src · p)` so the
expected input per target matches the budget of the structured policies.
*/

use super::{Projection, TargetOutcome};
use crate::io::{write_edges, EdgeSchema};
use crate::types::{ConnError, ConnResult, Edge, Gid};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::ops::Range;
use std::path::Path;
use tracing::info;

/// Upper bound on redraws of a single weight or delay
pub const MAX_REDRAWS: usize = 10_000;

/// Distributions of one random edge population
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomNormalParams {
    pub p: f64,
    pub w_mean: f64,
    pub w_sigma: f64,
    pub d_mean: f64,
    pub d_sigma: f64,
    /// Constant delay used when `d_sigma` is zero
    pub d_min: f64,
}

impl RandomNormalParams {
    /// Parameters of the random policy for a projection
    pub fn for_projection(projection: &Projection<'_>) -> ConnResult<Self> {
        let p = projection.params.p;
        let n_src = projection.n_sources() as f64;
        if !(p > 0.0) || n_src == 0.0 {
            return Err(ConnError::InvalidParameter(format!(
                "random {} connectivity needs p > 0 and sources (p = {}, n_src = {})",
                projection.conn_type, p, n_src
            )));
        }
        let w_mean = projection.params.w_tgt_in_per_cell / (n_src * p);
        let w_sigma = w_mean * 0.5 * (projection.kernel.sigma_x + projection.kernel.sigma_v);
        Ok(Self {
            p,
            w_mean,
            w_sigma,
            d_mean: projection.delays.standard_delay,
            d_sigma: projection.delays.standard_delay_sigma,
            d_min: projection.delays.delay_min(),
        })
    }

    fn sampler(&self) -> ConnResult<EdgeSampler> {
        let weight = Normal::new(self.w_mean, self.w_sigma).map_err(|e| {
            ConnError::InvalidParameter(format!(
                "weight distribution N({}, {}): {}",
                self.w_mean, self.w_sigma, e
            ))
        })?;
        let delay = if self.d_sigma == 0.0 {
            None
        } else {
            Some(Normal::new(self.d_mean, self.d_sigma).map_err(|e| {
                ConnError::InvalidParameter(format!(
                    "delay distribution N({}, {}): {}",
                    self.d_mean, self.d_sigma, e
                ))
            })?)
        };
        Ok(EdgeSampler {
            p: self.p,
            weight,
            delay,
            d_min: self.d_min,
        })
    }
}

struct EdgeSampler {
    p: f64,
    weight: Normal<f64>,
    delay: Option<Normal<f64>>,
    d_min: f64,
}

impl EdgeSampler {
    /// Bernoulli trial, then weight and delay for an accepted pair
    fn draw<R: Rng>(&self, rng: &mut R) -> ConnResult<Option<(f64, f64)>> {
        if rng.gen::<f64>() > self.p {
            return Ok(None);
        }
        let weight = redraw(rng, &self.weight, |w| w >= 0.0, "weight")?;
        let delay = match &self.delay {
            Some(dist) => redraw(rng, dist, |d| d > 0.0, "delay")?,
            None => self.d_min,
        };
        Ok(Some((weight, delay)))
    }
}

fn redraw<R: Rng>(
    rng: &mut R,
    dist: &Normal<f64>,
    accept: impl Fn(f64) -> bool,
    what: &str,
) -> ConnResult<f64> {
    for _ in 0..MAX_REDRAWS {
        let value = dist.sample(rng);
        if accept(value) {
            return Ok(value);
        }
    }
    Err(ConnError::Degenerate(format!(
        "no acceptable {} after {} draws from N({}, {})",
        what,
        MAX_REDRAWS,
        dist.mean(),
        dist.std_dev()
    )))
}

pub fn connect_target<R: Rng>(
    projection: &Projection<'_>,
    tgt: Gid,
    rng: &mut R,
) -> ConnResult<TargetOutcome> {
    if projection.params.p == 0.0 {
        return Ok(TargetOutcome::Connected(Vec::new()));
    }
    let sampler = RandomNormalParams::for_projection(projection)?.sampler()?;

    let mut edges = Vec::new();
    for src in projection.eligible_sources(tgt) {
        if let Some((weight, delay)) = sampler.draw(rng)? {
            edges.push(Edge::new(src, tgt, weight, projection.delays.clamp(delay)));
        }
    }
    Ok(TargetOutcome::Connected(edges))
}

/// Random-normal edges between two gid ranges, source-major
pub fn random_normal_edges<R: Rng>(
    sources: Range<Gid>,
    targets: Range<Gid>,
    params: &RandomNormalParams,
    rng: &mut R,
) -> ConnResult<Vec<Edge>> {
    let sampler = params.sampler()?;
    let mut edges = Vec::new();
    for src in sources {
        for tgt in targets.clone() {
            if let Some((weight, delay)) = sampler.draw(rng)? {
                edges.push(Edge::new(src, tgt, weight, delay));
            }
        }
    }
    Ok(edges)
}

/// Write a random-normal edge list to `output`
pub fn random_normal_edge_list<R: Rng>(
    output: &Path,
    sources: Range<Gid>,
    targets: Range<Gid>,
    params: &RandomNormalParams,
    rng: &mut R,
) -> ConnResult<usize> {
    let edges = random_normal_edges(sources, targets, params, rng)?;
    write_edges(output, &edges, EdgeSchema::Standard)?;
    info!(
        target: "prednet-connectivity",
        "Wrote {} random-normal edges to {}",
        edges.len(),
        output.display()
    );
    Ok(edges.len())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::rng::{seeded_rng, worker_rng};
    use prednet_config::{Connectivity, ConnectionType};

    #[test]
    fn test_weight_statistics_from_budget() {
        let config = config(Connectivity::Random, 0.5);
        let pops = populations();
        let projection = Projection::from_config(ConnectionType::Ee, &config, &pops);

        let params = RandomNormalParams::for_projection(&projection).unwrap();
        assert!((params.w_mean - 0.5).abs() < 1e-12);
        assert!((params.w_sigma - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_random_policy_edges_are_valid() {
        let mut config = config(Connectivity::Random, 1.0);
        config.delays.delay_range = (0.5, 4.0);
        let pops = populations();
        let projection = Projection::from_config(ConnectionType::Ii, &config, &pops);
        let mut rng = worker_rng(11, ConnectionType::Ii, 0);

        for tgt in 0..4 {
            match connect_target(&projection, tgt, &mut rng).unwrap() {
                TargetOutcome::Connected(edges) => {
                    assert_eq!(edges.len(), 3);
                    for edge in edges {
                        assert_ne!(edge.src, tgt);
                        assert!(edge.weight >= 0.0);
                        assert!(edge.delay >= 0.5 && edge.delay <= 4.0);
                    }
                }
                TargetOutcome::Skipped(reason) => panic!("unexpected skip: {}", reason),
            }
        }
    }

    #[test]
    fn test_constant_delay_without_spread() {
        let params = RandomNormalParams {
            p: 1.0,
            w_mean: 1.0,
            w_sigma: 0.1,
            d_mean: 3.0,
            d_sigma: 0.0,
            d_min: 1.0,
        };
        let edges = random_normal_edges(0..3, 10..12, &params, &mut seeded_rng(5)).unwrap();
        assert_eq!(edges.len(), 6);
        assert_eq!((edges[0].src, edges[0].tgt), (0, 10));
        assert_eq!((edges[1].src, edges[1].tgt), (0, 11));
        assert!(edges.iter().all(|e| e.delay == 1.0));
    }

    #[test]
    fn test_impossible_weight_is_degenerate() {
        let params = RandomNormalParams {
            p: 1.0,
            w_mean: -1e6,
            w_sigma: 1.0,
            d_mean: 3.0,
            d_sigma: 0.0,
            d_min: 1.0,
        };
        let err = random_normal_edges(0..1, 0..1, &params, &mut seeded_rng(5)).unwrap_err();
        assert!(matches!(err, ConnError::Degenerate(_)));
    }

    #[test]
    fn test_edge_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("random_normal.dat");
        let params = RandomNormalParams {
            p: 1.0,
            w_mean: 0.2,
            w_sigma: 0.05,
            d_mean: 3.0,
            d_sigma: 1.0,
            d_min: 1.0,
        };
        let n = random_normal_edge_list(&output, 0..2, 0..2, &params, &mut seeded_rng(9)).unwrap();
        assert_eq!(n, 4);
        assert_eq!(crate::io::read_edges(&output).unwrap().len(), 4);
    }
}
