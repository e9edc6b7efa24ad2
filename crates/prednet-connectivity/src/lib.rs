// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# prednet Connectivity

Offline connectivity generation for a spiking network whose neurons are
tuned to a preferred position and velocity on a toroidal sensory sheet:
- Motion-prediction connection probabilities and latencies
- Selection policies (anisotropic top-k, isotropic, random)
- Sharded edge lists with a single-writer merge
- Two-phase global weight normalization
- Auxiliary generators (directional exc→inh selection, random matrices,
  source shuffling, random-normal edge lists)

## Distributed runs

Work is split over the targets of each projection. Every operation that
involves more than one worker takes an explicit [`ExecutionContext`]; the
in-process [`ThreadGroup`] runs a whole group on threads.

```rust,no_run
use prednet_config::PrednetConfig;
use prednet_connectivity::{ConnectomeBuilder, ExecutionContext};

let config = PrednetConfig::default();
let builder = ConnectomeBuilder::from_config(config, ExecutionContext::Local)?;
for report in builder.build_all()? {
    println!("{}: {} edges", report.conn_type, report.edges);
}
# Ok::<(), prednet_connectivity::ConnError>(())
```

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod auxiliary;
pub mod builder;
pub mod context;
pub mod geometry;
pub mod io;
pub mod normalization;
pub mod partition;
pub mod pipeline;
pub mod policies;
pub mod probability;
pub mod rng;
pub mod tuning;
pub mod types;

pub use builder::{ConnectomeBuilder, ProjectionReport};
pub use context::{Communicator, ExecutionContext, ThreadGroup};
pub use geometry::{euclidean, torus_distance, torus_distance_2d, Torus};
pub use io::{format_sci, read_edges, write_edges, EdgeSchema};
pub use normalization::{normalize_projection, NormalizationReport};
pub use partition::{distribute_n, target_range};
pub use pipeline::{ShardKind, ShardPaths, ShardedStage};
pub use policies::isotropic::isotropic_acceptance;
pub use policies::random::{random_normal_edge_list, RandomNormalParams};
pub use policies::{connect_partition, Projection, TargetOutcome};
pub use probability::{connection_probability, Affinity, KernelParams};
pub use tuning::{Populations, TuningTable};
pub use types::{
    ConnError, ConnResult, ConnectionCandidate, Edge, EdgeShard, Gid, Phase, TuningVector,
};
