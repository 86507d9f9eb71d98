// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Receptor classes and ligand-gated current evaluation
//!
//! ```text
//! I_ampa = g_ampa · s_ampa · (V - E_ampa)
//! I_gaba = g_gaba · s_gaba · (V - E_gaba)
//! I_nmda = g_nmda · s_nmda · (V - E_nmda) / (1 + η · [Mg] · exp(-γ · V))
//! ```

use core::fmt;
use core::str::FromStr;

use super::kinetics::Kinetics;
use crate::models::traits::ModelParameters;
use crate::types::{NeuralError, Result};

/// Transmitter class of a ligand-gated pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Receptor {
    Nmda,
    Ampa,
    Gaba,
}

impl Receptor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Receptor::Nmda => "nmda",
            Receptor::Ampa => "ampa",
            Receptor::Gaba => "gaba",
        }
    }
}

impl fmt::Display for Receptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Receptor {
    type Err = NeuralError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nmda" => Ok(Receptor::Nmda),
            "ampa" => Ok(Receptor::Ampa),
            "gaba" => Ok(Receptor::Gaba),
            other => Err(NeuralError::invalid(
                "receptor",
                format!("unknown receptor '{other}' (expected nmda, ampa or gaba)"),
            )),
        }
    }
}

/// Voltage-dependent magnesium block of the NMDA conductance
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MgBlock {
    /// Mg sensitivity of unblock (1/mM)
    pub eta_per_mm: f64,
    /// Extracellular Mg concentration (mM)
    pub mg_mm: f64,
    /// Steepness of the voltage dependence (1/mV)
    pub gamma_per_mv: f64,
}

impl Default for MgBlock {
    fn default() -> Self {
        Self {
            eta_per_mm: 0.2,
            mg_mm: 2.0,
            gamma_per_mv: 0.04,
        }
    }
}

impl MgBlock {
    /// Fraction of NMDA conductance left unblocked at `v_mv`
    #[inline]
    pub fn unblocked_fraction(&self, v_mv: f64) -> f64 {
        1.0 / (1.0 + self.eta_per_mm * self.mg_mm * (-self.gamma_per_mv * v_mv).exp())
    }
}

impl ModelParameters for MgBlock {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("eta_per_mm", self.eta_per_mm),
            ("mg_mm", self.mg_mm),
            ("gamma_per_mv", self.gamma_per_mv),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(NeuralError::invalid(
                    format!("mg_block.{field}"),
                    format!("must be non-negative, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Maximum conductance, reversal and kinetics of one pathway
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReceptorParams {
    pub g_max_ns: f64,
    pub e_rev_mv: f64,
    pub kinetics: Kinetics,
}

impl ReceptorParams {
    /// Open conductance (nS) for gating value `s`
    #[inline]
    pub fn conductance(&self, s: f64) -> f64 {
        self.g_max_ns * s
    }

    /// Outward current (pA) at `v_mv`
    #[inline]
    pub fn current(&self, s: f64, v_mv: f64) -> f64 {
        self.conductance(s) * (v_mv - self.e_rev_mv)
    }
}

impl ModelParameters for ReceptorParams {
    fn validate(&self) -> Result<()> {
        if !(self.g_max_ns.is_finite() && self.g_max_ns >= 0.0) {
            return Err(NeuralError::invalid(
                "g_max_ns",
                format!("must be non-negative, got {}", self.g_max_ns),
            ));
        }
        if !self.e_rev_mv.is_finite() {
            return Err(NeuralError::invalid("e_rev_mv", "must be finite"));
        }
        self.kinetics.validate()
    }
}

/// Every ligand-gated pathway of the cell.
///
/// Somatic and dendritic inhibition are parameterised separately (basket vs
/// HIPP input); both use the same gating equation family.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SynapticParams {
    pub nmda: ReceptorParams,
    pub ampa: ReceptorParams,
    pub gaba_soma: ReceptorParams,
    pub gaba_dendrite: ReceptorParams,
    pub mg_block: MgBlock,
}

impl Default for SynapticParams {
    fn default() -> Self {
        let g_ampa = 0.8066;
        Self {
            nmda: ReceptorParams {
                g_max_ns: 1.08 * g_ampa,
                e_rev_mv: 0.0,
                kinetics: Kinetics::DualExponential {
                    tau_rise_ms: 0.33,
                    tau_decay_ms: 50.0,
                    alpha_per_ms: 1.0,
                },
            },
            ampa: ReceptorParams {
                g_max_ns: g_ampa,
                e_rev_mv: 0.0,
                kinetics: Kinetics::DualExponential {
                    tau_rise_ms: 0.1,
                    tau_decay_ms: 2.5,
                    alpha_per_ms: 1.0,
                },
            },
            gaba_soma: ReceptorParams {
                g_max_ns: 10.0,
                e_rev_mv: -86.0,
                kinetics: Kinetics::DualExponential {
                    tau_rise_ms: 0.7,
                    tau_decay_ms: 6.4,
                    alpha_per_ms: 1.0,
                },
            },
            gaba_dendrite: ReceptorParams {
                g_max_ns: 2.2,
                e_rev_mv: -86.0,
                kinetics: Kinetics::DualExponential {
                    tau_rise_ms: 2.5,
                    tau_decay_ms: 40.8,
                    alpha_per_ms: 1.0,
                },
            },
            mg_block: MgBlock::default(),
        }
    }
}

impl ModelParameters for SynapticParams {
    fn validate(&self) -> Result<()> {
        for (name, params) in [
            ("nmda", &self.nmda),
            ("ampa", &self.ampa),
            ("gaba_soma", &self.gaba_soma),
            ("gaba_dendrite", &self.gaba_dendrite),
        ] {
            params.validate().map_err(|err| match err {
                NeuralError::InvalidConfiguration { field, reason } => {
                    NeuralError::invalid(format!("synapses.{name}.{field}"), reason)
                }
                other => other,
            })?;
        }
        self.mg_block.validate()
    }
}
