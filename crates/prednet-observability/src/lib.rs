// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # prednet-observability
//!
//! Logging infrastructure shared by the prednet crates, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: per-crate JSON log files in a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known prednet crate names (log targets) for debug flags
pub const KNOWN_CRATES: &[&str] = &["prednet", "prednet-config", "prednet-connectivity"];
