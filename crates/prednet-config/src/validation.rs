// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent and within valid ranges before any connectivity is computed.

use crate::{ConfigError, ConfigResult, ConnectionType, PrednetConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Population sizes and torus periods
/// - Kernel widths
/// - Per-projection densities and weight budgets
/// - Delay range ordering
/// - Normalization constants
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &PrednetConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_network(config, &mut errors);
    validate_kernel(config, &mut errors);
    validate_projections(config, &mut errors);
    validate_delays(config, &mut errors);
    validate_normalization(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn invalid(field: &str, reason: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_network(config: &PrednetConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.network.n_exc == 0 {
        errors.push(invalid("network.n_exc", "must be positive"));
    }
    if !(config.network.torus_width > 0.0) {
        errors.push(invalid("network.torus_width", "must be positive"));
    }
    if !(config.network.torus_height > 0.0) {
        errors.push(invalid("network.torus_height", "must be positive"));
    }
    if config.network.tuning_file.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "network.tuning_file".to_string(),
        });
    }
}

fn validate_kernel(config: &PrednetConfig, errors: &mut Vec<ConfigValidationError>) {
    if !(config.kernel.w_sigma_x > 0.0) {
        errors.push(invalid("kernel.w_sigma_x", "must be positive"));
    }
    if !(config.kernel.w_sigma_v > 0.0) {
        errors.push(invalid("kernel.w_sigma_v", "must be positive"));
    }
}

fn validate_projections(config: &PrednetConfig, errors: &mut Vec<ConfigValidationError>) {
    for conn_type in ConnectionType::ALL {
        let projection = config.projections.get(conn_type);
        if !(0.0..=1.0).contains(&projection.p) {
            errors.push(invalid(
                &format!("projections.{}.p", conn_type),
                "must be between 0.0 and 1.0",
            ));
        }
        if !(0.0..=1.0).contains(&projection.p_max) {
            errors.push(invalid(
                &format!("projections.{}.p_max", conn_type),
                "must be between 0.0 and 1.0",
            ));
        }
        if !(projection.w_tgt_in_per_cell >= 0.0) {
            errors.push(invalid(
                &format!("projections.{}.w_tgt_in_per_cell", conn_type),
                "must be non-negative",
            ));
        }
        if !(projection.w_uniform >= 0.0) {
            errors.push(invalid(
                &format!("projections.{}.w_uniform", conn_type),
                "must be non-negative",
            ));
        }
    }
}

fn validate_delays(config: &PrednetConfig, errors: &mut Vec<ConfigValidationError>) {
    let (delay_min, delay_max) = config.delays.delay_range;
    if !(delay_min > 0.0) {
        errors.push(invalid("delays.delay_range", "minimum delay must be positive"));
    }
    if !(delay_min <= delay_max) {
        errors.push(invalid("delays.delay_range", "min must not exceed max"));
    }
    if !(config.delays.delay_scale >= 0.0) {
        errors.push(invalid("delays.delay_scale", "must be non-negative"));
    }
    if !(config.delays.standard_delay_sigma >= 0.0) {
        errors.push(invalid("delays.standard_delay_sigma", "must be non-negative"));
    }
}

fn validate_normalization(config: &PrednetConfig, errors: &mut Vec<ConfigValidationError>) {
    if !(config.normalization.w_thresh_connection >= 0.0) {
        errors.push(invalid(
            "normalization.w_thresh_connection",
            "must be non-negative",
        ));
    }
    if !(config.normalization.p_to_w_scaling > 0.0) {
        errors.push(invalid("normalization.p_to_w_scaling", "must be positive"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PrednetConfig::default();
        let result = validate_config(&config);
        if let Err(e) = &result {
            eprintln!("Validation error: {}", e);
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_density() {
        let mut config = PrednetConfig::default();
        config.projections.ei.p = 1.5;

        let result = validate_config(&config);
        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("projections.ei.p"));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_inverted_delay_range() {
        let mut config = PrednetConfig::default();
        config.delays.delay_range = (10.0, 1.0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_all_violations_are_reported() {
        let mut config = PrednetConfig::default();
        config.kernel.w_sigma_x = 0.0;
        config.kernel.w_sigma_v = f64::NAN;
        config.normalization.p_to_w_scaling = -1.0;

        match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("kernel.w_sigma_x"));
                assert!(msg.contains("kernel.w_sigma_v"));
                assert!(msg.contains("normalization.p_to_w_scaling"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
