// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)
//!
//! An override that does not parse is an error.

use crate::{ConfigError, ConfigResult, ConnectionType, PrednetConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// File name searched for when no explicit path is given
pub const CONFIG_FILE_NAME: &str = "prednet_configuration.toml";

/// Find the prednet configuration file
///
/// Search order:
/// 1. `PREDNET_CONFIG_PATH` environment variable
/// 2. Current working directory: `./prednet_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("PREDNET_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by PREDNET_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet PREDNET_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is not found, contains invalid TOML, an override
/// does not parse, or validation fails
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<PrednetConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    debug!(target: "prednet-config", "Loading configuration from {}", config_file.display());

    let content = fs::read_to_string(&config_file)?;
    let mut config: PrednetConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    crate::validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `PREDNET_N_EXC` -> `network.n_exc`
/// - `PREDNET_N_INH` -> `network.n_inh`
/// - `PREDNET_SEED` -> `network.seed`
/// - `PREDNET_OUTPUT_DIR` -> `output.directory`
/// - `PREDNET_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut PrednetConfig) -> ConfigResult<()> {
    if let Ok(value) = env::var("PREDNET_N_EXC") {
        config.network.n_exc = parse_value("PREDNET_N_EXC", &value)?;
    }
    if let Ok(value) = env::var("PREDNET_N_INH") {
        config.network.n_inh = parse_value("PREDNET_N_INH", &value)?;
    }
    if let Ok(value) = env::var("PREDNET_SEED") {
        config.network.seed = parse_value("PREDNET_SEED", &value)?;
    }
    if let Ok(value) = env::var("PREDNET_OUTPUT_DIR") {
        config.output.directory = PathBuf::from(value);
    }
    if let Ok(value) = env::var("PREDNET_LOG_LEVEL") {
        config.logging.level = value;
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// Keys are the flat parameter names, e.g.
/// `{"connectivity_ee": "isotropic", "p_ei": "0.1", "delay_range": "1,10"}`.
/// Per-projection keys end in the connection type (`_ee`, `_ei`, `_ie`, `_ii`).
pub fn apply_cli_overrides(
    config: &mut PrednetConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    // Sorted so that error reporting is stable
    let mut keys: Vec<&String> = cli_args.keys().collect();
    keys.sort();

    for key in keys {
        let value = &cli_args[key];
        apply_override(config, key, value)?;
    }
    Ok(())
}

fn apply_override(config: &mut PrednetConfig, key: &str, value: &str) -> ConfigResult<()> {
    match key {
        "n_exc" => config.network.n_exc = parse_value(key, value)?,
        "n_inh" => config.network.n_inh = parse_value(key, value)?,
        "seed" => config.network.seed = parse_value(key, value)?,
        "torus_width" => config.network.torus_width = parse_value(key, value)?,
        "torus_height" => config.network.torus_height = parse_value(key, value)?,
        "tuning_file" => config.network.tuning_file = PathBuf::from(value),
        "w_sigma_x" => config.kernel.w_sigma_x = parse_value(key, value)?,
        "w_sigma_v" => config.kernel.w_sigma_v = parse_value(key, value)?,
        "kernel_form" => config.kernel.form = value.parse()?,
        "delay_range" => config.delays.delay_range = parse_range(key, value)?,
        "delay_scale" => config.delays.delay_scale = parse_value(key, value)?,
        "standard_delay" => config.delays.standard_delay = parse_value(key, value)?,
        "standard_delay_sigma" => config.delays.standard_delay_sigma = parse_value(key, value)?,
        "w_thresh_connection" => {
            config.normalization.w_thresh_connection = parse_value(key, value)?
        }
        "p_to_w_scaling" => config.normalization.p_to_w_scaling = parse_value(key, value)?,
        "output_dir" => config.output.directory = PathBuf::from(value),
        "log_level" => config.logging.level = value.to_string(),
        _ => return apply_projection_override(config, key, value),
    }
    Ok(())
}

fn apply_projection_override(
    config: &mut PrednetConfig,
    key: &str,
    value: &str,
) -> ConfigResult<()> {
    let (name, suffix) = key
        .rsplit_once('_')
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let conn_type: ConnectionType = suffix
        .parse()
        .map_err(|_| ConfigError::UnknownKey(key.to_string()))?;
    let projection = config.projections.get_mut(conn_type);

    match name {
        "connectivity" => projection.connectivity = value.parse()?,
        "p" => projection.p = parse_value(key, value)?,
        "w_tgt_in_per_cell" => projection.w_tgt_in_per_cell = parse_value(key, value)?,
        "w_uniform" => projection.w_uniform = parse_value(key, value)?,
        "p_max" => projection.p_max = parse_value(key, value)?,
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    }
    Ok(())
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(format!("{} = '{}' could not be parsed", key, value))
    })
}

fn parse_range(key: &str, value: &str) -> ConfigResult<(f64, f64)> {
    let (lo, hi) = value.split_once(',').ok_or_else(|| {
        ConfigError::InvalidValue(format!("{} = '{}' must be 'min,max'", key, value))
    })?;
    Ok((parse_value(key, lo)?, parse_value(key, hi)?))
}
