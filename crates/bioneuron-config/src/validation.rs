// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! All violations are collected and reported together.

use crate::{BioneuronConfig, ConfigError, ConfigResult};

const LOG_FORMATS: [&str; 2] = ["text", "json"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
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
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &BioneuronConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

fn collect_errors(config: &BioneuronConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_solver(config, &mut errors);
    validate_problem(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn invalid(field: &str, reason: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_solver(config: &BioneuronConfig, errors: &mut Vec<ConfigValidationError>) {
    // NaN must fail too, hence the negated comparisons
    if !(config.solver.tolerance > 0.0) {
        errors.push(invalid("solver.tolerance", "must be positive"));
    }
    if !(config.solver.rho > 0.0) {
        errors.push(invalid("solver.rho", "must be positive"));
    }
}

fn validate_problem(config: &BioneuronConfig, errors: &mut Vec<ConfigValidationError>) {
    if !(config.problem.regularisation >= 0.0) {
        errors.push(invalid("problem.regularisation", "must be non-negative"));
    }
    if !config.problem.j_threshold.is_finite() {
        errors.push(invalid("problem.j_threshold", "must be finite"));
    }
}

fn validate_logging(config: &BioneuronConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.logging.level.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "logging.level".to_string(),
        });
    } else if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(invalid(
            "logging.level",
            "must be one of trace, debug, info, warn, error",
        ));
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(invalid("logging.format", "must be 'text' or 'json'"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BioneuronConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_tolerance() {
        let mut config = BioneuronConfig::default();
        config.solver.tolerance = 0.0;
        assert_eq!(
            collect_errors(&config),
            vec![invalid("solver.tolerance", "must be positive")]
        );

        config.solver.tolerance = f64::NAN;
        assert_eq!(collect_errors(&config).len(), 1);
    }

    #[test]
    fn test_negative_regularisation() {
        let mut config = BioneuronConfig::default();
        config.problem.regularisation = -0.1;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_regularisation_is_valid() {
        let mut config = BioneuronConfig::default();
        config.problem.regularisation = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_all_errors_are_collected() {
        let mut config = BioneuronConfig::default();
        config.solver.rho = -1.0;
        config.logging.format = "xml".to_string();
        config.logging.level = String::new();

        let errors = collect_errors(&config);
        assert_eq!(errors.len(), 3);

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("solver.rho"));
        assert!(message.contains("logging.format"));
        assert!(message.contains("Missing required configuration: logging.level"));
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = BioneuronConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
