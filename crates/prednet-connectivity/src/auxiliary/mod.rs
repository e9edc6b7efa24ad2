// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Auxiliary connectivity generators used outside the main projection runs.
*/

pub mod directional;
pub mod matrix;
pub mod shuffle;

pub use directional::{exc_to_inh_connections, DirectionalSelection};
pub use matrix::{random_connection_matrix, write_matrix};
pub use shuffle::shuffle_sources;
