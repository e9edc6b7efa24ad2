// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connectome builder

Builds the edge lists of every enabled population pair and, on request,
the globally normalized probability lists.

Usage:
  cargo run --release --bin build_connectome -- --config prednet_configuration.toml --workers 4

Parameter overrides use the flat parameter names:
  build_connectome --set connectivity_ii=random --set p_ii=0.2 --set delay_range=1,20

Per-crate debug logging: `--debug-prednet-connectivity`, `--debug-all`, or
`PREDNET_DEBUG=prednet-connectivity,prednet-config`.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use prednet::config::{load_config, ConnectionType, PrednetConfig};
use prednet::connectivity::normalization::NormalizationReport;
use prednet::connectivity::{
    ConnError, ConnResult, ConnectomeBuilder, ExecutionContext, Populations, ProjectionReport,
    TuningTable,
};
use prednet::observability::{self, CrateDebugFlags, LogFormat};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;
use tracing::{error, info};

/// Motion-prediction connectivity builder
#[derive(Parser, Debug)]
#[command(name = "build_connectome", version, long_about = None)]
struct Args {
    /// Configuration file (default: search for prednet_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Combined tuning table, overrides `network.tuning_file`
    #[arg(short, long)]
    tuning: Option<PathBuf>,

    /// Number of in-process workers
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Also write normalized probability lists for these connection types
    /// (comma-separated, e.g. "ee,ei")
    #[arg(long, value_delimiter = ',')]
    normalize: Vec<ConnectionType>,

    /// Parameter override `key=value`, repeatable
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Write a JSON report of every worker's results
    #[arg(long)]
    report: Option<PathBuf>,

    /// Emit console logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

/// Everything one worker produced
#[derive(Debug, Serialize)]
struct WorkerSummary {
    rank: usize,
    projections: Vec<ProjectionReport>,
    normalization: Vec<NormalizationReport>,
}

fn parse_overrides(raw: &[String]) -> Result<HashMap<String, String>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| anyhow!("override '{}' is not of the form key=value", entry))
        })
        .collect()
}

fn run_worker(
    config: PrednetConfig,
    populations: Populations,
    ctx: ExecutionContext,
    normalize: &[ConnectionType],
) -> ConnResult<WorkerSummary> {
    let rank = ctx.rank();
    let builder = ConnectomeBuilder::new(config, populations, ctx)?;
    let projections = builder.build_all()?;
    let normalization = normalize
        .iter()
        .map(|&conn_type| builder.build_normalized_probabilities(conn_type))
        .collect::<ConnResult<Vec<_>>>()?;
    Ok(WorkerSummary {
        rank,
        projections,
        normalization,
    })
}

fn main() -> Result<()> {
    // Debug flags are not clap arguments; strip them before parsing
    let raw_args: Vec<String> = std::env::args().collect();
    let debug_flags = CrateDebugFlags::from_args(raw_args.iter().cloned()).with_env();
    let args = Args::parse_from(raw_args.iter().filter(|a| !a.starts_with("--debug-")));

    if args.workers == 0 {
        bail!("--workers must be at least 1");
    }

    let overrides = parse_overrides(&args.overrides)?;
    let mut config = load_config(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;
    if let Some(tuning) = &args.tuning {
        config.network.tuning_file = tuning.clone();
    }

    let logging = observability::LoggingConfig {
        level: config.logging.level.clone(),
        format: if args.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        ..Default::default()
    };
    #[cfg(feature = "file-logging")]
    let _guard = observability::init_logging(&logging, &debug_flags, 0)?;
    #[cfg(not(feature = "file-logging"))]
    observability::init_console_logging(&logging, &debug_flags)?;

    let table = TuningTable::load(&config.network.tuning_file).with_context(|| {
        format!(
            "Failed to load tuning table {}",
            config.network.tuning_file.display()
        )
    })?;
    let populations =
        Populations::from_combined(&table, config.network.n_exc, config.network.n_inh)?;

    info!(
        target: "prednet",
        "Building connectome: {} exc, {} inh, {} worker(s), output {}",
        config.network.n_exc,
        config.network.n_inh,
        args.workers,
        config.output.directory.display()
    );
    let started = Instant::now();

    let results: Vec<Result<WorkerSummary>> = if args.workers == 1 {
        vec![run_worker(config, populations, ExecutionContext::Local, &args.normalize)
            .map_err(anyhow::Error::from)]
    } else {
        let contexts = ExecutionContext::thread_group(args.workers);
        thread::scope(|s| {
            let handles: Vec<_> = contexts
                .into_iter()
                .map(|ctx| {
                    let config = config.clone();
                    let populations = populations.clone();
                    let normalize = &args.normalize;
                    s.spawn(move || run_worker(config, populations, ctx, normalize))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| match handle.join() {
                    Ok(result) => result.map_err(anyhow::Error::from),
                    Err(_) => Err(anyhow!("worker {} panicked", rank)),
                })
                .collect()
        })
    };

    let mut summaries = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                error!(target: "prednet", "{:#}", e);
                failures.push(e);
            }
        }
    }
    // Peers of a failed worker only see the broken collective; report the cause
    failures.sort_by_key(|e| {
        matches!(
            e.downcast_ref::<ConnError>(),
            Some(ConnError::Collective { .. })
        )
    });
    if let Some(first) = failures.into_iter().next() {
        return Err(first.context("Connectome build failed"));
    }

    let edges: usize = summaries
        .iter()
        .flat_map(|s| s.projections.iter())
        .map(|r| r.edges)
        .sum();
    info!(
        target: "prednet",
        "Wrote {} edges in {:.2?}",
        edges,
        started.elapsed()
    );

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&summaries)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(target: "prednet", "Report written to {}", path.display());
    }

    Ok(())
}
