// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # prednet Configuration System
//!
//! Type-safe configuration for connectivity generation with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides keyed by the flat parameter names
//!   (`connectivity_ee`, `p_ie`, `w_tgt_in_per_cell_ii`, `delay_range`, ...)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use prednet_config::{load_config, ConnectionType};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//! println!("n_exc: {}", config.network.n_exc);
//! println!("ee policy: {}", config.projections.get(ConnectionType::Ee).connectivity);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "std")]
pub mod loader;

pub mod types;
pub mod validation;

#[cfg(feature = "std")]
pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    CONFIG_FILE_NAME,
};

pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown connection type '{0}' (expected ee, ei, ie or ii)")]
    UnknownConnectionType(String),

    #[error("Unknown connectivity '{0}' (expected anisotropic, isotropic, random or none)")]
    UnknownConnectivity(String),

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(feature = "std")]
impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
