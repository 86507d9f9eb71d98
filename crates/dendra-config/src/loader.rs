// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{validate_config, ConfigError, ConfigResult, DendraConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the Dendra configuration file
///
/// Search order:
/// 1. `DENDRA_CONFIG_PATH` environment variable
/// 2. Current working directory: `./dendra_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("DENDRA_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by DENDRA_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        search_paths.extend(
            cwd.ancestors()
                .skip(1)
                .take(5)
                .map(|dir| dir.join(CONFIG_FILE_NAME)),
        );
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Dendra configuration file '{}' not found in any of these locations:\n{}\n\nSet DENDRA_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load and validate configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is missing or unreadable, contains invalid TOML,
/// an override does not parse, or the result fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<DendraConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: DendraConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    validate_config(&config)?;
    Ok(config)
}

fn parse_f64(source: &str, value: &str) -> ConfigResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidValue(format!("{source}: '{value}' is not a number")))
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `DENDRA_DT_MS` -> `simulation.dt_ms`
/// - `DENDRA_DURATION_MS` -> `simulation.duration_ms`
/// - `DENDRA_SCHEME` -> `simulation.scheme`
/// - `DENDRA_LOG_LEVEL` -> `logging.level`
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when a numeric variable does not parse
pub fn apply_environment_overrides(config: &mut DendraConfig) -> ConfigResult<()> {
    if let Ok(value) = env::var("DENDRA_DT_MS") {
        config.simulation.dt_ms = parse_f64("DENDRA_DT_MS", &value)?;
    }
    if let Ok(value) = env::var("DENDRA_DURATION_MS") {
        config.simulation.duration_ms = parse_f64("DENDRA_DURATION_MS", &value)?;
    }
    if let Ok(value) = env::var("DENDRA_SCHEME") {
        config.simulation.scheme = value.to_lowercase();
    }
    if let Ok(value) = env::var("DENDRA_LOG_LEVEL") {
        config.logging.level = value;
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"dt_ms": "0.05", "scheme": "forward_euler"}`)
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when a numeric argument does not parse
pub fn apply_cli_overrides(
    config: &mut DendraConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("dt_ms") {
        config.simulation.dt_ms = parse_f64("dt_ms", value)?;
    }
    if let Some(value) = cli_args.get("duration_ms") {
        config.simulation.duration_ms = parse_f64("duration_ms", value)?;
    }
    if let Some(value) = cli_args.get("scheme") {
        config.simulation.scheme = value.to_lowercase();
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    Ok(())
}
