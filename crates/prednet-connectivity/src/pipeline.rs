// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Shard-then-merge stage.

One stage is: every worker writes its own shard, a barrier, an optional
collective reduce followed by a per-shard rewrite, and finally worker 0
concatenates the shards in rank order into the canonical file.

```text
<base>pid<rank>.dat               worker shard
<base>pid<rank>_normalized.dat    rewritten shard
<base>0.dat                       merged list (rank 0 only)
```
*/

use crate::context::ExecutionContext;
use crate::io::{read_edges, write_edges, EdgeSchema};
use crate::types::{ConnError, ConnResult, Edge, Phase};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File names derived from one base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPaths {
    base: PathBuf,
}

impl ShardPaths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn shard(&self, rank: usize) -> PathBuf {
        self.with_suffix(&format!("pid{}.dat", rank))
    }

    pub fn normalized(&self, rank: usize) -> PathBuf {
        self.with_suffix(&format!("pid{}_normalized.dat", rank))
    }

    pub fn merged(&self) -> PathBuf {
        self.with_suffix("0.dat")
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.base.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }
}

/// Which set of shards a merge concatenates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardKind {
    Raw,
    Normalized,
}

/// Result of a collective rewrite on one worker
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    pub local: f64,
    pub global: f64,
    pub rows_in: usize,
    pub rows_out: usize,
    pub path: PathBuf,
}

/// Partitioned write, barrier, reduce, rewrite, single-writer merge
#[derive(Debug)]
pub struct ShardedStage<'a> {
    ctx: &'a ExecutionContext,
    paths: ShardPaths,
    schema: EdgeSchema,
}

impl<'a> ShardedStage<'a> {
    pub fn new(ctx: &'a ExecutionContext, paths: ShardPaths, schema: EdgeSchema) -> Self {
        Self { ctx, paths, schema }
    }

    pub fn paths(&self) -> &ShardPaths {
        &self.paths
    }

    /// Write this worker's shard, replacing a previous run's file
    pub fn write_local(&self, edges: &[Edge]) -> ConnResult<PathBuf> {
        let rank = self.ctx.rank();
        let path = self.paths.shard(rank);
        write_edges(&path, edges, self.schema).map_err(|e| e.in_worker(rank, Phase::ShardWrite))?;
        debug!(
            target: "prednet-connectivity",
            "[W{}] wrote {} edges to {}",
            rank,
            edges.len(),
            path.display()
        );
        Ok(path)
    }

    pub fn barrier(&self, phase: Phase) -> ConnResult<()> {
        self.ctx.barrier(phase)
    }

    /// Reload this worker's shard, reduce a per-shard statistic across all
    /// workers and write the rewritten shard.
    ///
    /// Every worker must call this, since the reduction is collective.
    pub fn reduce_and_rewrite<S, R>(&self, local_stat: S, rewrite: R) -> ConnResult<RewriteOutcome>
    where
        S: FnOnce(&[Edge]) -> f64,
        R: FnOnce(Vec<Edge>, f64) -> ConnResult<Vec<Edge>>,
    {
        let rank = self.ctx.rank();
        let phase = Phase::Normalization;
        let shard = self.paths.shard(rank);
        if !shard.exists() {
            return Err(ConnError::MissingShard {
                rank,
                phase,
                path: shard,
            });
        }

        let edges = read_edges(&shard).map_err(|e| e.in_worker(rank, phase))?;
        let rows_in = edges.len();
        let local = local_stat(&edges);
        let global = self.ctx.all_reduce_sum(local, phase)?;

        let rewritten = rewrite(edges, global).map_err(|e| e.in_worker(rank, phase))?;
        let path = self.paths.normalized(rank);
        write_edges(&path, &rewritten, self.schema).map_err(|e| e.in_worker(rank, phase))?;

        Ok(RewriteOutcome {
            local,
            global,
            rows_in,
            rows_out: rewritten.len(),
            path,
        })
    }

    /// Concatenate all shards of `kind` in rank order into the merged file.
    ///
    /// Only rank 0 writes; other ranks return `Ok(None)`. Call after the
    /// end-of-phase barrier.
    pub fn merge(&self, kind: ShardKind) -> ConnResult<Option<PathBuf>> {
        if !self.ctx.is_root() {
            return Ok(None);
        }
        let size = self.ctx.size();
        let shard_path = |rank| match kind {
            ShardKind::Raw => self.paths.shard(rank),
            ShardKind::Normalized => self.paths.normalized(rank),
        };

        let shards: Vec<PathBuf> = (0..size).map(shard_path).collect();
        if let Some((rank, path)) = shards.iter().enumerate().find(|(_, p)| !p.exists()) {
            return Err(ConnError::MissingShard {
                rank,
                phase: Phase::Merge,
                path: path.clone(),
            });
        }
        let extra = shard_path(size);
        if extra.exists() {
            return Err(ConnError::WorkerCountMismatch {
                expected: size,
                path: extra,
            });
        }

        let merged = self.paths.merged();
        concatenate(&shards, &merged).map_err(|e| e.in_worker(0, Phase::Merge))?;
        info!(
            target: "prednet-connectivity",
            "Merged {} shards into {}",
            size,
            merged.display()
        );
        Ok(Some(merged))
    }
}

fn concatenate(inputs: &[PathBuf], output: &Path) -> ConnResult<()> {
    let file = File::create(output).map_err(|e| ConnError::io(output, e))?;
    let mut writer = BufWriter::new(file);
    for input in inputs {
        let mut reader = File::open(input).map_err(|e| ConnError::io(input, e))?;
        io::copy(&mut reader, &mut writer).map_err(|e| ConnError::io(output, e))?;
    }
    writer.flush().map_err(|e| ConnError::io(output, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_shard_paths() {
        let paths = ShardPaths::new("Connections/conn_list_ee_");
        assert_eq!(paths.shard(3), PathBuf::from("Connections/conn_list_ee_pid3.dat"));
        assert_eq!(
            paths.normalized(0),
            PathBuf::from("Connections/conn_list_ee_pid0_normalized.dat")
        );
        assert_eq!(paths.merged(), PathBuf::from("Connections/conn_list_ee_0.dat"));
    }

    #[test]
    fn test_local_write_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::Local;
        let stage = ShardedStage::new(
            &ctx,
            ShardPaths::new(dir.path().join("conn_list_ei_")),
            EdgeSchema::Standard,
        );
        stage.write_local(&[Edge::new(0, 0, 0.5, 1.0)]).unwrap();
        stage.barrier(Phase::ShardWrite).unwrap();
        let merged = stage.merge(ShardKind::Raw).unwrap().unwrap();

        let content = fs::read_to_string(merged).unwrap();
        assert_eq!(content, "0\t0\t5.00e-01\t1.00e+00\n");
    }

    #[test]
    fn test_merge_rejects_extra_shard() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ShardPaths::new(dir.path().join("conn_list_ee_"));
        fs::write(paths.shard(1), "").unwrap();

        let ctx = ExecutionContext::Local;
        let stage = ShardedStage::new(&ctx, paths, EdgeSchema::Standard);
        stage.write_local(&[]).unwrap();
        assert!(matches!(
            stage.merge(ShardKind::Raw),
            Err(ConnError::WorkerCountMismatch { expected: 1, .. })
        ));
    }

    #[test]
    fn test_rewrite_requires_own_shard() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::Local;
        let stage = ShardedStage::new(
            &ctx,
            ShardPaths::new(dir.path().join("p_conn_list_ee_")),
            EdgeSchema::Probability,
        );
        let err = stage
            .reduce_and_rewrite(|_| 0.0, |edges, _| Ok(edges))
            .unwrap_err();
        assert!(matches!(
            err,
            ConnError::MissingShard {
                rank: 0,
                phase: Phase::Normalization,
                ..
            }
        ));
    }
}
