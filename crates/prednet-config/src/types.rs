// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `prednet_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrednetConfig {
    pub network: NetworkConfig,
    pub kernel: KernelConfig,
    pub projections: ProjectionsConfig,
    pub delays: DelayConfig,
    pub normalization: NormalizationConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Population sizes and the sensory sheet
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    pub n_exc: usize,
    pub n_inh: usize,
    /// Period of the torus along x
    pub torus_width: f64,
    /// Period of the torus along y
    pub torus_height: f64,
    /// Base seed for every random stream
    pub seed: u64,
    /// Tuning-property table (exc rows first, then inh rows)
    pub tuning_file: PathBuf,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            n_exc: 900,
            n_inh: 225,
            torus_width: 1.0,
            torus_height: 1.0,
            seed: 12345,
            tuning_file: PathBuf::from("tuning_prop.dat"),
        }
    }
}

/// Gaussian kernel widths of the motion-prediction model
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    pub w_sigma_x: f64,
    pub w_sigma_v: f64,
    pub form: KernelForm,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            w_sigma_x: 0.3,
            w_sigma_v: 0.3,
            form: KernelForm::Separable,
        }
    }
}

/// Exponent grouping of the probability kernel.
///
/// `Separable` is `exp(-.5 dx²/σx² - .5 dy²/σx²) · exp(-.5 du²/σv² - .5 dv²/σv²)`.
/// `Grouped` is `exp(-(dx² + dy²/(2σx²))) · exp(-(du² + dv²)/(2σv²))`, where only
/// the y-term is divided by the width. The two are not numerically equivalent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelForm {
    #[default]
    Separable,
    Grouped,
}

impl FromStr for KernelForm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "separable" => Ok(Self::Separable),
            "grouped" => Ok(Self::Grouped),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown kernel form '{}' (expected separable or grouped)",
                other
            ))),
        }
    }
}

/// Directed population pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Ee,
    Ei,
    Ie,
    Ii,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 4] = [Self::Ee, Self::Ei, Self::Ie, Self::Ii];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ee => "ee",
            Self::Ei => "ei",
            Self::Ie => "ie",
            Self::Ii => "ii",
        }
    }

    pub fn source(&self) -> Population {
        match self {
            Self::Ee | Self::Ei => Population::Excitatory,
            Self::Ie | Self::Ii => Population::Inhibitory,
        }
    }

    pub fn target(&self) -> Population {
        match self {
            Self::Ee | Self::Ie => Population::Excitatory,
            Self::Ei | Self::Ii => Population::Inhibitory,
        }
    }

    /// Recurrent connectivity inside one population
    pub fn is_recurrent(&self) -> bool {
        self.source() == self.target()
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ee" => Ok(Self::Ee),
            "ei" => Ok(Self::Ei),
            "ie" => Ok(Self::Ie),
            "ii" => Ok(Self::Ii),
            other => Err(ConfigError::UnknownConnectionType(other.to_string())),
        }
    }
}

/// Neuron population role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Population {
    Excitatory,
    Inhibitory,
}

/// Connectivity policy selected per population pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    Anisotropic,
    Isotropic,
    Random,
    None,
}

impl FromStr for Connectivity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anisotropic" => Ok(Self::Anisotropic),
            "isotropic" => Ok(Self::Isotropic),
            "random" => Ok(Self::Random),
            "none" => Ok(Self::None),
            other => Err(ConfigError::UnknownConnectivity(other.to_string())),
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Anisotropic => "anisotropic",
            Self::Isotropic => "isotropic",
            Self::Random => "random",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Parameters of one population pair (`[projections.<type>]`)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    /// `connectivity_<type>`
    pub connectivity: Connectivity,
    /// `p_<type>`: target connection density
    pub p: f64,
    /// `w_tgt_in_per_cell_<type>`: summed input weight per target
    pub w_tgt_in_per_cell: f64,
    /// Uniform weight given to accepted isotropic edges before rescaling
    pub w_uniform: f64,
    /// Peak acceptance probability of the isotropic kernel
    pub p_max: f64,
}

impl ProjectionConfig {
    fn with(connectivity: Connectivity, p: f64, w_tgt_in_per_cell: f64) -> Self {
        Self {
            connectivity,
            p,
            w_tgt_in_per_cell,
            ..Self::default()
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Anisotropic,
            p: 0.05,
            w_tgt_in_per_cell: 0.5,
            w_uniform: 0.01,
            p_max: 1.0,
        }
    }
}

/// The four population pairs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionsConfig {
    pub ee: ProjectionConfig,
    pub ei: ProjectionConfig,
    pub ie: ProjectionConfig,
    pub ii: ProjectionConfig,
}

impl ProjectionsConfig {
    pub fn get(&self, conn_type: ConnectionType) -> &ProjectionConfig {
        match conn_type {
            ConnectionType::Ee => &self.ee,
            ConnectionType::Ei => &self.ei,
            ConnectionType::Ie => &self.ie,
            ConnectionType::Ii => &self.ii,
        }
    }

    pub fn get_mut(&mut self, conn_type: ConnectionType) -> &mut ProjectionConfig {
        match conn_type {
            ConnectionType::Ee => &mut self.ee,
            ConnectionType::Ei => &mut self.ei,
            ConnectionType::Ie => &mut self.ie,
            ConnectionType::Ii => &mut self.ii,
        }
    }
}

impl Default for ProjectionsConfig {
    fn default() -> Self {
        Self {
            ee: ProjectionConfig::with(Connectivity::Anisotropic, 0.05, 0.5),
            ei: ProjectionConfig::with(Connectivity::Anisotropic, 0.1, 1.0),
            ie: ProjectionConfig::with(Connectivity::Anisotropic, 0.1, 1.0),
            ii: ProjectionConfig::with(Connectivity::Isotropic, 0.1, 0.5),
        }
    }
}

/// Synaptic delay derivation
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DelayConfig {
    /// `(delay_min, delay_max)` clamp in ms
    pub delay_range: (f64, f64),
    /// Latency (or distance) to delay conversion factor
    pub delay_scale: f64,
    /// Mean delay of the random policy
    pub standard_delay: f64,
    /// Delay spread of the random policy; zero means constant `delay_min`
    pub standard_delay_sigma: f64,
}

impl DelayConfig {
    pub fn delay_min(&self) -> f64 {
        self.delay_range.0
    }

    pub fn delay_max(&self) -> f64 {
        self.delay_range.1
    }

    pub fn clamp(&self, delay: f64) -> f64 {
        delay.max(self.delay_range.0).min(self.delay_range.1)
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            delay_range: (0.1, 5000.0),
            delay_scale: 1000.0,
            standard_delay: 3.0,
            standard_delay_sigma: 1.0,
        }
    }
}

/// Post-selection weight processing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationConfig {
    /// Edges with weight at or below this value are dropped
    pub w_thresh_connection: f64,
    /// Total weight the normalized probability list sums to
    pub p_to_w_scaling: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            w_thresh_connection: 1e-5,
            p_to_w_scaling: 1.0,
        }
    }
}

/// Where shard, normalized and merged files are written
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl OutputConfig {
    /// `<directory>/conn_list_<type>_`
    pub fn conn_list_fn_base(&self, conn_type: ConnectionType) -> PathBuf {
        self.directory.join(format!("conn_list_{}_", conn_type))
    }

    /// `<directory>/p_conn_list_<type>_`
    pub fn probability_list_fn_base(&self, conn_type: ConnectionType) -> PathBuf {
        self.directory.join(format!("p_conn_list_{}_", conn_type))
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("Connections"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
