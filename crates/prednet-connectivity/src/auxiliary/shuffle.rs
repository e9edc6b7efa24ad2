// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Source-shuffle randomizer: same targets, weights and delays, permuted sources.
*/

use crate::io::{read_edges, write_edges, EdgeSchema};
use crate::types::{ConnResult, Gid};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;
use tracing::info;

/// Permute the source column of `input` and write the result to `output`.
///
/// Reals are written at full precision so weights and delays come out
/// exactly as they were read; the distance column is kept if every input
/// row has one. Returns the number of rows written.
pub fn shuffle_sources<R: Rng>(input: &Path, output: &Path, rng: &mut R) -> ConnResult<usize> {
    let mut edges = read_edges(input)?;
    let mut sources: Vec<Gid> = edges.iter().map(|e| e.src).collect();
    sources.shuffle(rng);
    for (edge, src) in edges.iter_mut().zip(sources) {
        edge.src = src;
    }

    let schema = EdgeSchema::Exact {
        distance: !edges.is_empty() && edges.iter().all(|e| e.distance.is_some()),
    };
    write_edges(output, &edges, schema)?;
    info!(
        target: "prednet-connectivity",
        "Shuffled sources of {} rows: {} -> {}",
        edges.len(),
        input.display(),
        output.display()
    );
    Ok(edges.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded_rng;
    use crate::types::Edge;

    #[test]
    fn test_only_sources_move() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("conn_list_ee_0.dat");
        let output = dir.path().join("random_weight_list_0.dat");
        let edges: Vec<Edge> = (0..20)
            .map(|i| Edge::new(i, i % 3, 0.01 * (i + 1) as f64, 1.0 + i as f64))
            .collect();
        write_edges(&input, &edges, EdgeSchema::Standard).unwrap();

        let n = shuffle_sources(&input, &output, &mut seeded_rng(98765)).unwrap();
        assert_eq!(n, 20);

        let original = read_edges(&input).unwrap();
        let shuffled = read_edges(&output).unwrap();
        for (a, b) in original.iter().zip(&shuffled) {
            assert_eq!(a.tgt, b.tgt);
            assert_eq!(a.weight, b.weight);
            assert_eq!(a.delay, b.delay);
        }

        let mut src_a: Vec<_> = original.iter().map(|e| e.src).collect();
        let mut src_b: Vec<_> = shuffled.iter().map(|e| e.src).collect();
        assert_ne!(src_a, src_b);
        src_a.sort();
        src_b.sort();
        assert_eq!(src_a, src_b);
    }

    #[test]
    fn test_probability_list_weights_survive_shuffle() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("p_conn_list_ee_0.dat");
        let output = dir.path().join("p_conn_list_ee_shuffled.dat");
        let edges: Vec<Edge> = (0..4).map(|i| Edge::new(i, 3 - i, 0.12345, 2.5)).collect();
        write_edges(&input, &edges, EdgeSchema::Probability).unwrap();

        shuffle_sources(&input, &output, &mut seeded_rng(7)).unwrap();

        for edge in read_edges(&output).unwrap() {
            assert_eq!(edge.weight, 0.12345);
            assert_eq!(edge.delay, 2.5);
            assert_eq!(edge.distance, None);
        }
    }

    #[test]
    fn test_distance_column_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("conn_list_ee_0.dat");
        let output = dir.path().join("shuffled.dat");
        let edges: Vec<Edge> = (0..6)
            .map(|i| Edge::new(i, i, 0.3, 1.0).with_distance(0.1 * i as f64))
            .collect();
        write_edges(&input, &edges, EdgeSchema::Exact { distance: true }).unwrap();

        shuffle_sources(&input, &output, &mut seeded_rng(11)).unwrap();

        let shuffled = read_edges(&output).unwrap();
        for (a, b) in edges.iter().zip(&shuffled) {
            assert_eq!(a.distance, b.distance);
        }
    }
}
