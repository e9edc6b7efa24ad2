// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Dense random connection matrices.
*/

use crate::io::format_sci;
use crate::types::{ConnError, ConnResult};
use ndarray::Array2;
use rand::seq::index::sample;
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// `n × n` matrix, uniform in `[0, w_max)`, zero diagonal.
///
/// With `sparseness > 0`, exactly `round(sparseness · n²) - n` off-diagonal
/// entries (bounded by the number of off-diagonal entries) are zeroed on
/// top of the diagonal, chosen without replacement. `sparseness = 1` gives
/// an empty matrix.
pub fn random_connection_matrix<R: Rng>(
    n: usize,
    w_max: f64,
    sparseness: f64,
    rng: &mut R,
) -> ConnResult<Array2<f64>> {
    if !(0.0..=1.0).contains(&sparseness) {
        return Err(ConnError::InvalidParameter(format!(
            "sparseness must be within [0, 1], got {}",
            sparseness
        )));
    }
    if !(w_max >= 0.0) {
        return Err(ConnError::InvalidParameter(format!(
            "w_max must be non-negative, got {}",
            w_max
        )));
    }

    let mut matrix = Array2::from_shape_simple_fn((n, n), || rng.gen::<f64>() * w_max);
    matrix.diag_mut().fill(0.0);

    let off_diagonal = n * n - n;
    let requested = (sparseness * (n * n) as f64).round() - n as f64;
    let n_zero = (requested.max(0.0) as usize).min(off_diagonal);
    if n_zero > 0 {
        let row_len = n - 1;
        for idx in sample(rng, off_diagonal, n_zero) {
            let row = idx / row_len;
            let col = idx % row_len;
            let col = if col >= row { col + 1 } else { col };
            matrix[[row, col]] = 0.0;
        }
    }

    debug!(
        target: "prednet-connectivity",
        "Random {}x{} matrix with {} sparsified entries",
        n,
        n,
        n_zero
    );
    Ok(matrix)
}

/// Write a matrix as space-separated `%.18e` rows
pub fn write_matrix(path: &Path, matrix: &Array2<f64>) -> ConnResult<()> {
    let file = File::create(path).map_err(|e| ConnError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for row in matrix.rows() {
        let line: Vec<String> = row.iter().map(|&w| format_sci(w, 18)).collect();
        writeln!(writer, "{}", line.join(" ")).map_err(|e| ConnError::io(path, e))?;
    }
    writer.flush().map_err(|e| ConnError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded_rng;

    #[test]
    fn test_dense_matrix() {
        let matrix = random_connection_matrix(5, 2.0, 0.0, &mut seeded_rng(1234)).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                if i == j {
                    assert_eq!(matrix[[i, j]], 0.0);
                } else {
                    assert!(matrix[[i, j]] >= 0.0 && matrix[[i, j]] < 2.0);
                }
            }
        }
    }

    #[test]
    fn test_exact_sparsification_count() {
        let n = 10;
        let matrix = random_connection_matrix(n, 1.0, 0.5, &mut seeded_rng(1234)).unwrap();
        let zeros = matrix.iter().filter(|&&w| w == 0.0).count();
        // Diagonal plus round(0.5 * 100) - 10 sampled positions
        assert_eq!(zeros, n + 40);
    }

    #[test]
    fn test_full_sparseness_is_empty() {
        let matrix = random_connection_matrix(4, 1.0, 1.0, &mut seeded_rng(7)).unwrap();
        assert!(matrix.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_rejects_out_of_range_sparseness() {
        assert!(random_connection_matrix(4, 1.0, 1.5, &mut seeded_rng(7)).is_err());
    }

    #[test]
    fn test_write_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.dat");
        let matrix = Array2::from_shape_vec((2, 2), vec![0.0, 0.5, 0.25, 0.0]).unwrap();
        write_matrix(&path, &matrix).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let first = content.lines().next().unwrap();
        assert_eq!(
            first,
            "0.000000000000000000e+00 5.000000000000000000e-01"
        );
    }
}
