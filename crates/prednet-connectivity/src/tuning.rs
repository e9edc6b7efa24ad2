// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Tuning-property tables.

A table is a dense `(n_cells, 4)` array of `x, y, u, v` rows indexed by gid,
loaded once and shared read-only by every policy.
*/

use crate::types::{ConnError, ConnResult, Gid, TuningVector};
use ndarray::{s, Array2, ArrayView1, Axis};
use prednet_config::Population;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read-only table of tuning vectors
#[derive(Debug, Clone, PartialEq)]
pub struct TuningTable {
    data: Array2<f64>,
}

impl TuningTable {
    /// Wrap an `(n, 4)` array
    pub fn from_array(data: Array2<f64>) -> ConnResult<Self> {
        if data.ncols() != 4 {
            return Err(ConnError::InvalidParameter(format!(
                "tuning table must have 4 columns (x, y, u, v), got {}",
                data.ncols()
            )));
        }
        Ok(Self { data })
    }

    pub fn from_vectors(vectors: &[TuningVector]) -> Self {
        let mut data = Array2::zeros((vectors.len(), 4));
        for (mut row, tv) in data.axis_iter_mut(Axis(0)).zip(vectors) {
            row.assign(&ArrayView1::from(&tv.as_array()[..]));
        }
        Self { data }
    }

    /// Load a whitespace-delimited text table, one `x y u v` row per neuron.
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub fn load(path: impl AsRef<Path>) -> ConnResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConnError::io(path, e))?;

        let mut values = Vec::new();
        let mut n_rows = 0;
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 4 {
                return Err(ConnError::MalformedRow {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("expected 4 columns, found {}", fields.len()),
                });
            }
            for field in fields {
                let value: f64 = field.parse().map_err(|_| ConnError::MalformedRow {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("'{}' is not a number", field),
                })?;
                values.push(value);
            }
            n_rows += 1;
        }

        let data = Array2::from_shape_vec((n_rows, 4), values)
            .map_err(|e| ConnError::InvalidParameter(e.to_string()))?;
        debug!(target: "prednet-connectivity", "Loaded {} tuning vectors from {}", n_rows, path.display());
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Tuning vector of `gid`; panics if out of range like slice indexing
    pub fn get(&self, gid: Gid) -> TuningVector {
        let row = self.data.row(gid);
        TuningVector::new(row[0], row[1], row[2], row[3])
    }

    pub fn iter(&self) -> impl Iterator<Item = TuningVector> + '_ {
        self.data
            .axis_iter(Axis(0))
            .map(|row| TuningVector::new(row[0], row[1], row[2], row[3]))
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Split a combined table into its first `n_first` rows and the rest
    pub fn split_at(&self, n_first: usize) -> ConnResult<(TuningTable, TuningTable)> {
        if n_first > self.len() {
            return Err(ConnError::InvalidParameter(format!(
                "cannot split {} tuning vectors at {}",
                self.len(),
                n_first
            )));
        }
        let head = self.data.slice(s![..n_first, ..]).to_owned();
        let tail = self.data.slice(s![n_first.., ..]).to_owned();
        Ok((Self { data: head }, Self { data: tail }))
    }
}

/// Excitatory and inhibitory tuning tables
#[derive(Debug, Clone)]
pub struct Populations {
    pub exc: TuningTable,
    pub inh: TuningTable,
}

impl Populations {
    pub fn new(exc: TuningTable, inh: TuningTable) -> Self {
        Self { exc, inh }
    }

    /// Split a combined table whose first `n_exc` rows are excitatory
    pub fn from_combined(table: &TuningTable, n_exc: usize, n_inh: usize) -> ConnResult<Self> {
        if table.len() != n_exc + n_inh {
            return Err(ConnError::InvalidParameter(format!(
                "tuning table has {} rows but n_exc + n_inh = {}",
                table.len(),
                n_exc + n_inh
            )));
        }
        let (exc, inh) = table.split_at(n_exc)?;
        Ok(Self { exc, inh })
    }

    pub fn table(&self, population: Population) -> &TuningTable {
        match population {
            Population::Excitatory => &self.exc,
            Population::Inhibitory => &self.inh,
        }
    }
}
