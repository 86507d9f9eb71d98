// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Somatic current-step sweep.
//!
//! Runs one fully independent simulation per amplitude (in parallel), then
//! reports spike count, peak deflection and, for hyperpolarising steps, sag
//! ratio and input resistance as JSON.
//!
//! ```text
//! current_sweep --amplitudes=-100,-50,0,50,100,200 --output sweep.json
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use dendra::analysis::{run_step_protocol, StepProtocol, StepResponse};
use dendra::config::{find_config_file, load_config, DendraConfig};
use dendra::engine::IntegrationScheme;
use dendra::observability::{
    debug_flags_help, init_logging, parse_debug_flags, strip_debug_flags, LogFormat,
    LoggingConfig,
};

/// Somatic current-step sweep over a single multi-compartment cell.
///
/// `--debug-<crate>` and `--debug-all` are read by `parse_debug_flags` and
/// removed before parsing.
#[derive(Parser, Debug)]
#[command(
    name = "current_sweep",
    version,
    author,
    long_about = None,
    after_help = debug_flags_help()
)]
struct Args {
    /// Configuration file (default: search for dendra_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Injected amplitudes in pA (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "-100")]
    amplitudes: Vec<f64>,

    /// Step onset (ms)
    #[arg(long, default_value_t = 300.0)]
    onset_ms: f64,

    /// Step offset (ms)
    #[arg(long, default_value_t = 1300.0)]
    offset_ms: f64,

    /// Start of the peak-deflection window (ms)
    #[arg(long, default_value_t = 1000.0)]
    peak_from_ms: f64,

    /// Time taken as steady state for sag ratio and input resistance (ms)
    #[arg(long, default_value_t = 1200.0)]
    steady_state_ms: f64,

    /// Dendritic compartment for the dendritic input resistance
    #[arg(long, default_value = "dend00")]
    dendrite: String,

    /// Override simulation.dt_ms
    #[arg(long)]
    dt_ms: Option<f64>,

    /// Override simulation.scheme (backward_euler | forward_euler)
    #[arg(long)]
    scheme: Option<String>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SweepReport {
    dt_ms: f64,
    duration_ms: f64,
    scheme: IntegrationScheme,
    onset_ms: f64,
    offset_ms: f64,
    steady_state_ms: f64,
    points: Vec<StepResponse>,
}

fn resolve_config(args: &Args) -> Result<DendraConfig> {
    let mut overrides = HashMap::new();
    if let Some(dt) = args.dt_ms {
        overrides.insert("dt_ms".to_string(), dt.to_string());
    }
    if let Some(scheme) = &args.scheme {
        overrides.insert("scheme".to_string(), scheme.clone());
    }

    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    match path {
        Some(path) => load_config(Some(&path), Some(&overrides))
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            let mut config = DendraConfig::default();
            dendra::config::apply_environment_overrides(&mut config)?;
            dendra::config::apply_cli_overrides(&mut config, &overrides)?;
            dendra::config::validate_config(&config)?;
            Ok(config)
        }
    }
}

/// Configured `[[stimulus]]` entries are replaced by the sweep step
fn run_point(config: &DendraConfig, protocol: StepProtocol, dendrite: &str) -> Result<StepResponse> {
    let response = run_step_protocol(config, &protocol, dendrite)?;
    info!(
        amplitude_pa = protocol.amplitude_pa,
        spikes = response.spike_count,
        peak_mv = ?response.peak_deflection_mv,
        "[SWEEP] amplitude done"
    );
    Ok(response)
}

fn write_report(report: &SweepReport, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("[SWEEP] report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(strip_debug_flags(env::args()));
    let config = resolve_config(&args)?;

    let logging = LoggingConfig {
        level: config.logging.level.clone(),
        format: config
            .logging
            .format
            .parse::<LogFormat>()
            .map_err(anyhow::Error::msg)?,
        file_logging: config.logging.file_logging,
        log_dir: config.logging.log_dir.clone(),
        ..LoggingConfig::default()
    };
    let _guard = init_logging(&logging, &debug_flags)?;
    if debug_flags.any_enabled() {
        info!(crates = ?debug_flags.enabled_crates(), "[SWEEP] debug logging enabled");
    }
    if !config.stimulus.is_empty() {
        info!(
            configured = config.stimulus.len(),
            "[SWEEP] configured stimuli replaced by the sweep step"
        );
    }

    if args.amplitudes.is_empty() {
        warn!("[SWEEP] no amplitudes given, nothing to do");
        return Ok(());
    }
    info!(
        amplitudes = ?args.amplitudes,
        dt_ms = config.simulation.dt_ms,
        scheme = %config.simulation.scheme,
        "[SWEEP] starting"
    );

    let points = args
        .amplitudes
        .par_iter()
        .map(|&amplitude_pa| {
            let protocol = StepProtocol {
                amplitude_pa,
                onset_ms: args.onset_ms,
                offset_ms: args.offset_ms,
                peak_from_ms: args.peak_from_ms,
                steady_state_ms: args.steady_state_ms,
            };
            run_point(&config, protocol, &args.dendrite)
                .with_context(|| format!("Run at {amplitude_pa} pA failed"))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = SweepReport {
        dt_ms: config.simulation.dt_ms,
        duration_ms: config.simulation.duration_ms,
        scheme: config.simulation.scheme.parse()?,
        onset_ms: args.onset_ms,
        offset_ms: args.offset_ms,
        steady_state_ms: args.steady_state_ms,
        points,
    };
    write_report(&report, args.output.as_deref())
}
