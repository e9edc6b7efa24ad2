// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core types for connectivity generation.
*/

use prednet_config::{ConfigError, ConnectionType};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Neuron index inside its population
pub type Gid = usize;

/// Preferred stimulus position `(x, y)` and velocity `(u, v)` of one neuron
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TuningVector {
    pub x: f64,
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

impl TuningVector {
    pub const fn new(x: f64, y: f64, u: f64, v: f64) -> Self {
        Self { x, y, u, v }
    }

    /// Magnitude of the preferred velocity
    pub fn speed(&self) -> f64 {
        (self.u * self.u + self.v * self.v).sqrt()
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x, self.y, self.u, self.v]
    }
}

/// Affinity of one source for one target, alive for one target's evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionCandidate {
    pub src: Gid,
    pub tgt: Gid,
    pub probability: f64,
    pub latency: f64,
}

/// Directed synaptic connection as written to edge-list files
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edge {
    pub src: Gid,
    pub tgt: Gid,
    pub weight: f64,
    pub delay: f64,
    /// Tuning-space distance, carried by anisotropic edges for diagnostics
    pub distance: Option<f64>,
}

impl Edge {
    pub fn new(src: Gid, tgt: Gid, weight: f64, delay: f64) -> Self {
        Self {
            src,
            tgt,
            weight,
            delay,
            distance: None,
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }
}

/// Edges computed by one worker for its target range
#[derive(Debug, Clone)]
pub struct EdgeShard {
    pub conn_type: ConnectionType,
    pub rank: usize,
    pub targets: Range<Gid>,
    pub edges: Vec<Edge>,
    /// Targets that produced no edges because their candidate set was empty
    pub skipped_targets: Vec<Gid>,
}

/// Stage of a distributed run, reported with every worker failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Startup,
    Selection,
    ShardWrite,
    Normalization,
    Merge,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Startup => "startup",
            Phase::Selection => "selection",
            Phase::ShardWrite => "shard write",
            Phase::Normalization => "normalization",
            Phase::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// Result type for connectivity operations
pub type ConnResult<T> = Result<T, ConnError>;

/// Errors that can occur during connectivity generation
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Source {src} has zero preferred speed; latency is undefined")]
    ZeroSourceSpeed { src: Gid },

    #[error("Numeric degeneracy: {0}")]
    Degenerate(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed row in {} line {line}: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Worker {rank}: shard {} is missing ({phase})", .path.display())]
    MissingShard {
        rank: usize,
        phase: Phase,
        path: PathBuf,
    },

    #[error("Worker count mismatch: expected {expected} shards but found extra shard {}", .path.display())]
    WorkerCountMismatch { expected: usize, path: PathBuf },

    #[error("Worker {rank}: collective operation failed during {phase}: {reason}")]
    Collective {
        rank: usize,
        phase: Phase,
        reason: String,
    },

    #[error("Worker {rank} failed during {phase}: {source}")]
    Worker {
        rank: usize,
        phase: Phase,
        #[source]
        source: Box<ConnError>,
    },
}

impl ConnError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ConnError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Attach worker identity and phase, unless already attached
    pub fn in_worker(self, rank: usize, phase: Phase) -> Self {
        match self {
            err @ (ConnError::Worker { .. }
            | ConnError::MissingShard { .. }
            | ConnError::Collective { .. }) => err,
            other => ConnError::Worker {
                rank,
                phase,
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed() {
        let tv = TuningVector::new(0.1, 0.2, 3.0, 4.0);
        assert_eq!(tv.speed(), 5.0);
    }

    #[test]
    fn test_worker_context_is_attached_once() {
        let err = ConnError::ZeroSourceSpeed { src: 3 }
            .in_worker(2, Phase::Selection)
            .in_worker(0, Phase::Merge);
        let msg = err.to_string();
        assert!(msg.contains("Worker 2"));
        assert!(msg.contains("selection"));
    }
}
