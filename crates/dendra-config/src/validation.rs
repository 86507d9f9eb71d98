// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every check runs and every problem is collected, so a broken file is
//! reported in one pass rather than one field at a time.

use crate::{ConfigError, ConfigResult, DendraConfig, ReceptorConfig};

/// Accepted values of `simulation.scheme`
pub const KNOWN_SCHEMES: [&str; 2] = ["backward_euler", "forward_euler"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NotPositive { field: String, value: f64 },
    Negative { field: String, value: f64 },
    NotFinite { field: String },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPositive { field, value } => {
                write!(f, "{} = {} must be positive", field, value)
            }
            Self::Negative { field, value } => {
                write!(f, "{} = {} must not be negative", field, value)
            }
            Self::NotFinite { field } => write!(f, "{} must be a finite number", field),
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
/// - Positive clock, geometry, capacitance and time constants
/// - Non-negative conductances
/// - Spike reset below threshold, non-negative refractory period
/// - Stimulus windows with `start < end`
/// - Known integration scheme, non-zero decimation
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &DendraConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_simulation(config, &mut errors);
    validate_morphology(config, &mut errors);
    validate_membrane(config, &mut errors);
    validate_synapses(config, &mut errors);
    validate_spike(config, &mut errors);
    validate_stimulus(config, &mut errors);

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

fn positive(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() {
        errors.push(ConfigValidationError::NotFinite {
            field: field.to_string(),
        });
    } else if value <= 0.0 {
        errors.push(ConfigValidationError::NotPositive {
            field: field.to_string(),
            value,
        });
    }
}

fn non_negative(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() {
        errors.push(ConfigValidationError::NotFinite {
            field: field.to_string(),
        });
    } else if value < 0.0 {
        errors.push(ConfigValidationError::Negative {
            field: field.to_string(),
            value,
        });
    }
}

fn finite(field: &str, value: f64, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() {
        errors.push(ConfigValidationError::NotFinite {
            field: field.to_string(),
        });
    }
}

fn validate_simulation(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    let sim = &config.simulation;
    positive("simulation.dt_ms", sim.dt_ms, errors);
    positive("simulation.duration_ms", sim.duration_ms, errors);

    if !KNOWN_SCHEMES.contains(&sim.scheme.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.scheme".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                sim.scheme,
                KNOWN_SCHEMES.join(", ")
            ),
        });
    }
    if sim.decimation == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.decimation".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    for probe in &sim.record {
        if probe.split_once('.').map_or(true, |(c, v)| c.is_empty() || v.is_empty()) {
            errors.push(ConfigValidationError::InvalidValue {
                field: "simulation.record".to_string(),
                reason: format!("'{}' is not of the form <compartment>.<variable>", probe),
            });
        }
    }
}

/// Largest branch count per tree level that keeps compartment names unique
pub const MAX_PER_LEVEL: usize = 9;

fn validate_morphology(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    let m = &config.morphology;
    for (name, segment) in [
        ("soma", &m.soma),
        ("proximal", &m.proximal),
        ("medial", &m.medial),
        ("distal", &m.distal),
    ] {
        positive(&format!("morphology.{name}.length_um"), segment.length_um, errors);
        positive(&format!("morphology.{name}.diameter_um"), segment.diameter_um, errors);
    }
    positive(
        "morphology.bulk_resistivity_ohm_cm",
        m.bulk_resistivity_ohm_cm,
        errors,
    );

    // Compartment names carry one digit per level (dend0, dend01, dend012)
    for (name, count) in [
        ("branches", m.branches),
        ("medial_per_branch", m.medial_per_branch),
        ("tips_per_medial", m.tips_per_medial),
    ] {
        if count > MAX_PER_LEVEL {
            errors.push(ConfigValidationError::InvalidValue {
                field: format!("morphology.{name}"),
                reason: format!("{count} exceeds {MAX_PER_LEVEL} per level"),
            });
        }
    }
}

fn validate_membrane(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    for (name, membrane) in [("soma", &config.passive.soma), ("dendrite", &config.passive.dendrite)] {
        positive(
            &format!("passive.{name}.cm_uf_per_cm2"),
            membrane.cm_uf_per_cm2,
            errors,
        );
        non_negative(
            &format!("passive.{name}.g_leak_s_per_cm2"),
            membrane.g_leak_s_per_cm2,
            errors,
        );
        finite(&format!("passive.{name}.e_leak_mv"), membrane.e_leak_mv, errors);
    }

    let a = &config.adaptation;
    positive("adaptation.tau_ms", a.tau_ms, errors);
    non_negative("adaptation.g_ns", a.g_ns, errors);
    finite("adaptation.kick_pa", a.kick_pa, errors);
}

fn validate_receptor(name: &str, r: &ReceptorConfig, errors: &mut Vec<ConfigValidationError>) {
    non_negative(&format!("synapses.{name}.g_max_ns"), r.g_max_ns, errors);
    finite(&format!("synapses.{name}.e_rev_mv"), r.e_rev_mv, errors);
    positive(&format!("synapses.{name}.tau_decay_ms"), r.tau_decay_ms, errors);
    if let Some(rise) = r.tau_rise_ms {
        positive(&format!("synapses.{name}.tau_rise_ms"), rise, errors);
        non_negative(&format!("synapses.{name}.alpha_per_ms"), r.alpha_per_ms, errors);
    }
}

fn validate_synapses(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    let s = &config.synapses;
    validate_receptor("nmda", &s.nmda, errors);
    validate_receptor("ampa", &s.ampa, errors);
    validate_receptor("gaba_soma", &s.gaba_soma, errors);
    validate_receptor("gaba_dendrite", &s.gaba_dendrite, errors);
    non_negative("synapses.mg_block.eta_per_mm", s.mg_block.eta_per_mm, errors);
    non_negative("synapses.mg_block.mg_mm", s.mg_block.mg_mm, errors);
    finite("synapses.mg_block.gamma_per_mv", s.mg_block.gamma_per_mv, errors);
}

fn validate_spike(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    let s = &config.spike;
    finite("spike.threshold_mv", s.threshold_mv, errors);
    finite("spike.reset_mv", s.reset_mv, errors);
    non_negative("spike.refractory_ms", s.refractory_ms, errors);
    if s.reset_mv >= s.threshold_mv {
        errors.push(ConfigValidationError::InvalidValue {
            field: "spike.reset_mv".to_string(),
            reason: format!(
                "must be below threshold ({} >= {})",
                s.reset_mv, s.threshold_mv
            ),
        });
    }
}

fn validate_stimulus(config: &DendraConfig, errors: &mut Vec<ConfigValidationError>) {
    for (i, stim) in config.stimulus.iter().enumerate() {
        if stim.compartment.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("stimulus[{i}].compartment"),
            });
        }
        finite(&format!("stimulus[{i}].amplitude_pa"), stim.amplitude_pa, errors);
        non_negative(&format!("stimulus[{i}].start_ms"), stim.start_ms, errors);
        if !(stim.start_ms < stim.end_ms) {
            errors.push(ConfigValidationError::InvalidValue {
                field: format!("stimulus[{i}]"),
                reason: format!(
                    "window [{}, {}) must have start < end",
                    stim.start_ms, stim.end_ms
                ),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DendraConfig, StimulusConfig};

    fn messages(config: &DendraConfig) -> String {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = DendraConfig::default();
        let result = validate_config(&config);
        if let Err(e) = &result {
            eprintln!("Validation error: {}", e);
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = DendraConfig::default();
        config.simulation.dt_ms = 0.0;
        config.simulation.scheme = "rk4".to_string();
        config.passive.dendrite.cm_uf_per_cm2 = -1.0;
        config.spike.reset_mv = -50.0;

        let msg = messages(&config);
        assert!(msg.contains("simulation.dt_ms"));
        assert!(msg.contains("'rk4' is not one of backward_euler, forward_euler"));
        assert!(msg.contains("passive.dendrite.cm_uf_per_cm2"));
        assert!(msg.contains("spike.reset_mv"));
        assert_eq!(msg.lines().count(), 5);
    }

    #[test]
    fn test_stimulus_window_order() {
        let mut config = DendraConfig::default();
        config.stimulus.push(StimulusConfig {
            compartment: "soma".to_string(),
            amplitude_pa: 10.0,
            start_ms: 500.0,
            end_ms: 500.0,
        });
        assert!(messages(&config).contains("stimulus[0]"));
    }

    #[test]
    fn test_negative_conductance_rejected() {
        let mut config = DendraConfig::default();
        config.synapses.gaba_soma.g_max_ns = -1.0;
        assert!(messages(&config).contains("synapses.gaba_soma.g_max_ns"));
    }

    #[test]
    fn test_zero_decimation_and_bad_probe() {
        let mut config = DendraConfig::default();
        config.simulation.decimation = 0;
        config.simulation.record = vec!["soma".to_string()];
        let msg = messages(&config);
        assert!(msg.contains("simulation.decimation"));
        assert!(msg.contains("<compartment>.<variable>"));
    }

    #[test]
    fn test_branch_counts_limited_to_one_digit() {
        let mut config = DendraConfig::default();
        config.morphology.branches = 12;
        config.morphology.tips_per_medial = 10;
        let msg = messages(&config);
        assert!(msg.contains("morphology.branches: 12 exceeds 9 per level"), "{msg}");
        assert!(msg.contains("morphology.tips_per_medial"));
        assert!(!msg.contains("morphology.medial_per_branch"));

        config.morphology.branches = 9;
        config.morphology.tips_per_medial = 9;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_nan_is_reported() {
        let mut config = DendraConfig::default();
        config.adaptation.tau_ms = f64::NAN;
        assert!(messages(&config).contains("adaptation.tau_ms must be a finite number"));
    }
}
