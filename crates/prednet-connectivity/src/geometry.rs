// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Distance primitives on the toroidal sensory sheet.
*/

/// Periods of the 2D torus
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torus {
    pub width: f64,
    pub height: f64,
}

impl Torus {
    pub const UNIT: Torus = Torus {
        width: 1.0,
        height: 1.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Torus {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Shortest distance between `a` and `b` on a ring of length `period`.
///
/// Inputs need not lie inside `[0, period)`; extrapolated positions are
/// wrapped first, so the result is always in `[0, period / 2]`.
pub fn torus_distance(a: f64, b: f64, period: f64) -> f64 {
    let d = (a - b).rem_euclid(period);
    d.min(period - d)
}

/// Euclidean norm of the two independent ring distances
pub fn torus_distance_2d(x0: f64, x1: f64, y0: f64, y1: f64, torus: Torus) -> f64 {
    let dx = torus_distance(x0, x1, torus.width);
    let dy = torus_distance(y0, y1, torus.height);
    (dx * dx + dy * dy).sqrt()
}

/// Plain distance between two tuning vectors (diagnostics only)
pub fn euclidean(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_torus_distance_wraps() {
        assert!((torus_distance(0.1, 0.9, 1.0) - 0.2).abs() < EPS);
        assert!((torus_distance(0.0, 0.5, 1.0) - 0.5).abs() < EPS);
        assert!((torus_distance(1.3, 0.1, 1.0) - 0.2).abs() < EPS);
        assert!((torus_distance(-0.25, 0.25, 1.0) - 0.5).abs() < EPS);
        assert_eq!(torus_distance(0.4, 0.4, 1.0), 0.0);
    }

    #[test]
    fn test_torus_distance_2d() {
        let d = torus_distance_2d(0.0, 0.9, 0.0, 0.8, Torus::UNIT);
        assert!((d - (0.01f64 + 0.04).sqrt()).abs() < EPS);

        let wide = Torus::new(4.0, 1.0);
        let d = torus_distance_2d(0.0, 3.0, 0.5, 0.5, wide);
        assert!((d - 1.0).abs() < EPS);
    }

    #[test]
    fn test_euclidean() {
        let d = euclidean(&[0.0, 0.0, 1.0, 0.0], &[0.0, 0.0, 0.0, 1.0]);
        assert!((d - 2f64.sqrt()).abs() < EPS);
    }

    proptest! {
        #[test]
        fn prop_torus_distance_symmetric_and_bounded(
            a in -10.0f64..10.0,
            b in -10.0f64..10.0,
            period in 0.1f64..5.0,
        ) {
            let ab = torus_distance(a, b, period);
            let ba = torus_distance(b, a, period);
            prop_assert!((ab - ba).abs() < 1e-9);
            prop_assert!(ab >= 0.0);
            prop_assert!(ab <= period / 2.0 + 1e-12);
        }
    }
}
