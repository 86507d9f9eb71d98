// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Passive membrane: capacitance and leak

use super::traits::ModelParameters;
use crate::types::units::{capacitance_pf, conductance_ns};
use crate::types::{NeuralError, Result};

/// Specific (per-area) passive properties
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassiveParams {
    /// Specific membrane capacitance (µF/cm²)
    pub cm_uf_per_cm2: f64,
    /// Leak conductance density (S/cm²)
    pub g_leak_s_per_cm2: f64,
    /// Leak reversal potential (mV)
    pub e_leak_mv: f64,
}

impl PassiveParams {
    /// Reference somatic membrane
    pub const SOMA: PassiveParams = PassiveParams {
        cm_uf_per_cm2: 1.0,
        g_leak_s_per_cm2: 0.00003,
        e_leak_mv: -87.0,
    };

    /// Reference dendritic membrane
    pub const DENDRITE: PassiveParams = PassiveParams {
        cm_uf_per_cm2: 2.5,
        g_leak_s_per_cm2: 0.00001,
        e_leak_mv: -82.0,
    };

    /// Scale densities to a compartment of `area_um2`
    pub fn for_area(&self, area_um2: f64) -> PassiveMembrane {
        PassiveMembrane {
            capacitance_pf: capacitance_pf(self.cm_uf_per_cm2, area_um2),
            g_leak_ns: conductance_ns(self.g_leak_s_per_cm2, area_um2),
            e_leak_mv: self.e_leak_mv,
        }
    }
}

impl ModelParameters for PassiveParams {
    fn validate(&self) -> Result<()> {
        if !(self.cm_uf_per_cm2.is_finite() && self.cm_uf_per_cm2 > 0.0) {
            return Err(NeuralError::invalid(
                "cm_uf_per_cm2",
                format!("must be positive, got {}", self.cm_uf_per_cm2),
            ));
        }
        if !(self.g_leak_s_per_cm2.is_finite() && self.g_leak_s_per_cm2 >= 0.0) {
            return Err(NeuralError::invalid(
                "g_leak_s_per_cm2",
                format!("must be non-negative, got {}", self.g_leak_s_per_cm2),
            ));
        }
        if !self.e_leak_mv.is_finite() {
            return Err(NeuralError::invalid("e_leak_mv", "must be finite"));
        }
        Ok(())
    }
}

/// Absolute passive properties of one compartment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassiveMembrane {
    pub capacitance_pf: f64,
    pub g_leak_ns: f64,
    pub e_leak_mv: f64,
}

impl PassiveMembrane {
    #[inline]
    pub fn leak_current(&self, v_mv: f64) -> f64 {
        self.g_leak_ns * (v_mv - self.e_leak_mv)
    }
}
