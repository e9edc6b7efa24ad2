// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Directional excitatory-to-inhibitory selector.

For each inhibitory target, the excitatory sources whose preferred velocity
is most orthogonal to the source-to-target offset are chosen, i.e. the
smallest `|(p_inh - p_exc) · (u, v)|`. Offsets are plain coordinate
differences.
*/

use crate::geometry::{torus_distance_2d, Torus};
use crate::tuning::TuningTable;
use crate::types::{ConnError, ConnResult, Gid};
use ndarray::Array2;

/// `n` sources per inhibitory target, one row per target
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalSelection {
    /// Excitatory source indices, ascending by scalar product
    pub indices: Array2<Gid>,
    /// Torus distance from each source's predicted position to the target
    pub distances: Array2<f64>,
}

pub fn exc_to_inh_connections(
    exc: &TuningTable,
    inh: &TuningTable,
    n: usize,
    torus: Torus,
) -> ConnResult<DirectionalSelection> {
    if n > exc.len() {
        return Err(ConnError::InvalidParameter(format!(
            "cannot select {} sources out of {} excitatory cells",
            n,
            exc.len()
        )));
    }

    let mut indices = Array2::zeros((inh.len(), n));
    let mut distances = Array2::zeros((inh.len(), n));

    for (tgt, target) in inh.iter().enumerate() {
        let mut scored: Vec<(Gid, f64)> = exc
            .iter()
            .enumerate()
            .map(|(src, source)| {
                let dot = (target.x - source.x) * source.u + (target.y - source.y) * source.v;
                (src, dot.abs())
            })
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (slot, &(src, _)) in scored.iter().take(n).enumerate() {
            let source = exc.get(src);
            indices[[tgt, slot]] = src;
            distances[[tgt, slot]] = torus_distance_2d(
                source.x + source.u,
                target.x,
                source.y + source.v,
                target.y,
                torus,
            );
        }
    }

    Ok(DirectionalSelection { indices, distances })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TuningVector;

    #[test]
    fn test_picks_orthogonal_movers() {
        let exc = TuningTable::from_vectors(&[
            // moving straight at the target
            TuningVector::new(0.0, 0.0, 1.0, 0.0),
            // moving perpendicular to the offset
            TuningVector::new(0.0, 0.0, 0.0, 0.2),
            // moving diagonally
            TuningVector::new(0.0, 0.0, 0.5, 0.5),
        ]);
        let inh = TuningTable::from_vectors(&[TuningVector::new(0.3, 0.0, 0.0, 0.0)]);

        let selection = exc_to_inh_connections(&exc, &inh, 2, Torus::UNIT).unwrap();
        assert_eq!(selection.indices.row(0).to_vec(), vec![1, 2]);

        // src 1 predicted at (0, 0.2): distance sqrt(0.09 + 0.04)
        assert!((selection.distances[[0, 0]] - 0.13f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_too_many_sources() {
        let exc = TuningTable::from_vectors(&[TuningVector::new(0.0, 0.0, 1.0, 0.0)]);
        let inh = TuningTable::from_vectors(&[TuningVector::new(0.3, 0.0, 0.0, 0.0)]);
        assert!(exc_to_inh_connections(&exc, &inh, 2, Torus::UNIT).is_err());
    }
}
