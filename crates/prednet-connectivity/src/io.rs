// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Edge-list text files.

Rows are tab separated, ids are plain integers and real-valued columns use
C-style scientific notation (`1.23e-02`), which is what the simulator's
loaders expect. The column layout is fixed per producer, see [`EdgeSchema`].
*/

use crate::types::{ConnError, ConnResult, Edge, Gid};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::trace;

/// Column layout of an edge-list file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSchema {
    /// `src tgt weight delay distance`, all reals `%.2e`
    Anisotropic,
    /// `src tgt weight delay`, reals `%.2e` (isotropic and random policies)
    Standard,
    /// `src tgt p delay` with `p` as `%.4e` (probability dumps and their
    /// normalized rewrite)
    Probability,
    /// Every real as `%.18e`, with or without the distance column. Rewrites
    /// of an existing list use this so no value loses precision.
    Exact { distance: bool },
}

impl EdgeSchema {
    pub fn columns(&self) -> usize {
        match self {
            EdgeSchema::Anisotropic | EdgeSchema::Exact { distance: true } => 5,
            EdgeSchema::Standard | EdgeSchema::Probability | EdgeSchema::Exact { .. } => 4,
        }
    }

    fn weight_precision(&self) -> usize {
        match self {
            EdgeSchema::Probability => 4,
            EdgeSchema::Exact { .. } => 18,
            _ => 2,
        }
    }

    fn precision(&self) -> usize {
        match self {
            EdgeSchema::Exact { .. } => 18,
            _ => 2,
        }
    }

    /// Render one row, without the trailing newline
    pub fn format_row(&self, edge: &Edge) -> String {
        let mut row = format!(
            "{}\t{}\t{}\t{}",
            edge.src,
            edge.tgt,
            format_sci(edge.weight, self.weight_precision()),
            format_sci(edge.delay, self.precision())
        );
        if self.columns() == 5 {
            row.push('\t');
            row.push_str(&format_sci(edge.distance.unwrap_or(0.0), self.precision()));
        }
        row
    }
}

/// Format like C's `%.<precision>e`: signed exponent of at least two digits
pub fn format_sci(value: f64, precision: usize) -> String {
    let rendered = format!("{:.*e}", precision, value);
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => rendered.to_lowercase(),
    }
}

/// Write `edges` to `path`, replacing any existing file
pub fn write_edges(path: &Path, edges: &[Edge], schema: EdgeSchema) -> ConnResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConnError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| ConnError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for edge in edges {
        writeln!(writer, "{}", schema.format_row(edge)).map_err(|e| ConnError::io(path, e))?;
    }
    writer.flush().map_err(|e| ConnError::io(path, e))?;
    trace!(target: "prednet-connectivity", "Wrote {} rows to {}", edges.len(), path.display());
    Ok(())
}

/// Read an edge list with 4 or 5 columns.
///
/// Ids written in float notation (`3.000000000000000000e+00`) are accepted
/// as long as they are integral.
pub fn read_edges(path: &Path) -> ConnResult<Vec<Edge>> {
    let content = fs::read_to_string(path).map_err(|e| ConnError::io(path, e))?;
    let mut edges = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let malformed = |reason: String| ConnError::MalformedRow {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 && fields.len() != 5 {
            return Err(malformed(format!(
                "expected 4 or 5 columns, found {}",
                fields.len()
            )));
        }

        let mut reals = [0.0f64; 5];
        for (slot, field) in reals.iter_mut().zip(&fields) {
            *slot = field
                .parse()
                .map_err(|_| malformed(format!("'{}' is not a number", field)))?;
        }

        let src = parse_id(reals[0])
            .ok_or_else(|| malformed(format!("bad source id '{}'", fields[0])))?;
        let tgt = parse_id(reals[1])
            .ok_or_else(|| malformed(format!("bad target id '{}'", fields[1])))?;
        let mut edge = Edge::new(src, tgt, reals[2], reals[3]);
        if fields.len() == 5 {
            edge = edge.with_distance(reals[4]);
        }
        edges.push(edge);
    }

    Ok(edges)
}

fn parse_id(value: f64) -> Option<Gid> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Some(value as Gid)
    } else {
        None
    }
}
