// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # prednet - motion-prediction connectivity for spiking networks
//!
//! prednet precomputes the synaptic connectivity of a network whose
//! neurons carry a preferred position and a preferred velocity on a
//! toroidal sensory sheet. Sources are wired onto the targets their
//! extrapolated motion predicts; the result is a set of edge lists a
//! simulator loads directly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prednet::prelude::*;
//!
//! let config = load_config(None, None)?;
//! let builder = ConnectomeBuilder::from_config(config, ExecutionContext::Local)?;
//! let reports = builder.build_all()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`parallel`** (default): score sources with rayon inside each worker
//! - **`file-logging`**: per-crate JSON log files for the `build_connectome` tool
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  prednet-config                                         │
//! │  (TOML parameters, env and CLI overrides, validation)   │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  prednet-connectivity                                   │
//! │  (probabilities, policies, shards, normalization)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  tools/build_connectome                                 │
//! │  (prednet-observability logging, worker threads)        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use prednet_config as config;
pub use prednet_connectivity as connectivity;
pub use prednet_observability as observability;

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::config::{
        load_config, Connectivity, ConnectionType, KernelForm, PrednetConfig,
    };
    pub use crate::connectivity::{
        ConnError, ConnResult, ConnectomeBuilder, Edge, ExecutionContext, Populations,
        ProjectionReport, ThreadGroup, TuningTable, TuningVector,
    };
}
