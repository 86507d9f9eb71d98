// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Dendra Configuration System
//!
//! Type-safe configuration for a single-cell simulation run:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//! - Collecting validation of every section
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dendra_config::{load_config, DendraConfig};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//!
//! println!("dt: {} ms", config.simulation.dt_ms);
//! println!("scheme: {}", config.simulation.scheme);
//! ```
//!
//! Every section has defaults equal to the reference granule-cell
//! parameter set, so an empty file is a complete configuration.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration file name searched for by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "dendra_configuration.toml";

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

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
