// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `dendra_configuration.toml`. Units follow the field suffixes
//! (`_ms`, `_mv`, `_ns`, `_pa`, `_um`, `_ohm_cm`, `_uf_per_cm2`, `_s_per_cm2`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DendraConfig {
    pub simulation: SimulationConfig,
    pub morphology: MorphologyConfig,
    pub passive: PassiveConfig,
    pub synapses: SynapsesConfig,
    pub adaptation: AdaptationConfig,
    pub spike: SpikeConfig,
    /// Stimulus protocol, applied in order
    pub stimulus: Vec<StimulusConfig>,
    pub logging: LoggingConfig,
}

/// Clock and integration settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub dt_ms: f64,
    pub duration_ms: f64,
    /// `backward_euler` or `forward_euler`
    pub scheme: String,
    /// Record every n-th step
    pub decimation: u32,
    /// Probes registered at construction, `"<compartment>.<variable>"`
    pub record: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt_ms: 0.1,
            duration_ms: 1500.0,
            scheme: "backward_euler".to_string(),
            decimation: 1,
            record: vec!["soma.v".to_string()],
        }
    }
}

/// Length and diameter of one compartment class
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SegmentConfig {
    pub length_um: f64,
    pub diameter_um: f64,
}

/// Regular branched morphology
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MorphologyConfig {
    pub soma: SegmentConfig,
    pub proximal: SegmentConfig,
    pub medial: SegmentConfig,
    pub distal: SegmentConfig,
    pub branches: usize,
    pub medial_per_branch: usize,
    pub tips_per_medial: usize,
    pub bulk_resistivity_ohm_cm: f64,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            soma: SegmentConfig {
                length_um: 18.0,
                diameter_um: 12.0,
            },
            proximal: SegmentConfig {
                length_um: 83.0,
                diameter_um: 1.0,
            },
            medial: SegmentConfig {
                length_um: 83.0,
                diameter_um: 0.9,
            },
            distal: SegmentConfig {
                length_um: 83.0,
                diameter_um: 0.8,
            },
            branches: 3,
            medial_per_branch: 2,
            tips_per_medial: 2,
            bulk_resistivity_ohm_cm: 210.0,
        }
    }
}

/// Specific passive membrane properties
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MembraneConfig {
    pub cm_uf_per_cm2: f64,
    pub g_leak_s_per_cm2: f64,
    pub e_leak_mv: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PassiveConfig {
    pub soma: MembraneConfig,
    pub dendrite: MembraneConfig,
}

impl Default for PassiveConfig {
    fn default() -> Self {
        Self {
            soma: MembraneConfig {
                cm_uf_per_cm2: 1.0,
                g_leak_s_per_cm2: 0.00003,
                e_leak_mv: -87.0,
            },
            dendrite: MembraneConfig {
                cm_uf_per_cm2: 2.5,
                g_leak_s_per_cm2: 0.00001,
                e_leak_mv: -82.0,
            },
        }
    }
}

fn default_alpha() -> f64 {
    1.0
}

/// One ligand-gated pathway.
///
/// Without `tau_rise_ms` the gating variable follows single-exponential decay.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ReceptorConfig {
    pub g_max_ns: f64,
    pub e_rev_mv: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau_rise_ms: Option<f64>,
    pub tau_decay_ms: f64,
    #[serde(default = "default_alpha")]
    pub alpha_per_ms: f64,
}

impl ReceptorConfig {
    const fn dual(g_max_ns: f64, e_rev_mv: f64, tau_rise_ms: f64, tau_decay_ms: f64) -> Self {
        Self {
            g_max_ns,
            e_rev_mv,
            tau_rise_ms: Some(tau_rise_ms),
            tau_decay_ms,
            alpha_per_ms: 1.0,
        }
    }
}

/// NMDA magnesium block `1 / (1 + η·[Mg]·exp(−γ·V))`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MgBlockConfig {
    pub eta_per_mm: f64,
    pub mg_mm: f64,
    pub gamma_per_mv: f64,
}

impl Default for MgBlockConfig {
    fn default() -> Self {
        Self {
            eta_per_mm: 0.2,
            mg_mm: 2.0,
            gamma_per_mv: 0.04,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SynapsesConfig {
    pub nmda: ReceptorConfig,
    pub ampa: ReceptorConfig,
    /// Somatic (basket) inhibition
    pub gaba_soma: ReceptorConfig,
    /// Dendritic (HIPP) inhibition
    pub gaba_dendrite: ReceptorConfig,
    pub mg_block: MgBlockConfig,
}

impl Default for SynapsesConfig {
    fn default() -> Self {
        let g_ampa = 0.8066;
        Self {
            nmda: ReceptorConfig::dual(1.08 * g_ampa, 0.0, 0.33, 50.0),
            ampa: ReceptorConfig::dual(g_ampa, 0.0, 0.1, 2.5),
            gaba_soma: ReceptorConfig::dual(10.0, -86.0, 0.7, 6.4),
            gaba_dendrite: ReceptorConfig::dual(2.2, -86.0, 2.5, 40.8),
            mg_block: MgBlockConfig::default(),
        }
    }
}

/// Somatic after-hyperpolarisation current
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdaptationConfig {
    pub tau_ms: f64,
    pub g_ns: f64,
    pub kick_pa: f64,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            tau_ms: 45.0,
            g_ns: 2.0,
            kick_pa: 45.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpikeConfig {
    pub threshold_mv: f64,
    pub reset_mv: f64,
    pub refractory_ms: f64,
    pub clamp_during_refractory: bool,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            threshold_mv: -56.0,
            reset_mv: -74.0,
            refractory_ms: 20.0,
            clamp_during_refractory: true,
        }
    }
}

/// Constant current injected into one compartment over `[start_ms, end_ms)`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StimulusConfig {
    #[serde(default = "default_stimulus_target")]
    pub compartment: String,
    pub amplitude_pa: f64,
    pub start_ms: f64,
    pub end_ms: f64,
}

fn default_stimulus_target() -> String {
    "soma".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// `full`, `compact` or `json`
    pub format: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}
