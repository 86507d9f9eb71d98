// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Root (somatic) compartment
//!
//! ```text
//! I_syn  = I_gaba - I_inj + I_ahp
//! I_gaba = g_gaba · s_gaba · (V - E_gaba)
//! τ_ahp · dI_ahp/dt = g_ahp · (V - E_leak) - I_ahp
//! C · dV/dt = -I_leak - I_syn + axial
//! ```
//!
//! On a spike the voltage is clamped to V_reset and `I_ahp` is kicked up by a
//! fixed amount; the outward adaptation current then lowers the firing rate
//! of subsequent spikes.

use super::passive::PassiveMembrane;
use super::traits::{CurrentContribution, MembraneTerms, ModelParameters};
use crate::synapse::{GatingState, ReceptorParams};
use crate::types::{NeuralError, Result};

/// Spike-triggered adaptation (AHP) current parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdaptationParams {
    pub tau_ms: f64,
    /// Subthreshold coupling of the adaptation current to (V - E_leak)
    pub g_ns: f64,
    /// Increment applied at each spike
    pub kick_pa: f64,
}

impl Default for AdaptationParams {
    fn default() -> Self {
        Self {
            tau_ms: 45.0,
            g_ns: 2.0,
            kick_pa: 45.0,
        }
    }
}

impl ModelParameters for AdaptationParams {
    fn validate(&self) -> Result<()> {
        if !(self.tau_ms.is_finite() && self.tau_ms > 0.0) {
            return Err(NeuralError::invalid(
                "adaptation.tau_ms",
                format!("must be positive, got {}", self.tau_ms),
            ));
        }
        if !(self.g_ns.is_finite() && self.g_ns >= 0.0) {
            return Err(NeuralError::invalid(
                "adaptation.g_ns",
                format!("must be non-negative, got {}", self.g_ns),
            ));
        }
        if !self.kick_pa.is_finite() {
            return Err(NeuralError::invalid("adaptation.kick_pa", "must be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SomaModel {
    pub v_mv: f64,
    pub passive: PassiveMembrane,
    pub gaba: ReceptorParams,
    pub gaba_gate: GatingState,
    pub adaptation: AdaptationParams,
    pub i_ahp_pa: f64,
    pub i_inj_pa: f64,
}

impl SomaModel {
    /// Soma at rest: voltage at the leak reversal, no gating, no adaptation
    pub fn at_rest(
        passive: PassiveMembrane,
        gaba: ReceptorParams,
        adaptation: AdaptationParams,
    ) -> Self {
        Self {
            v_mv: passive.e_leak_mv,
            passive,
            gaba,
            gaba_gate: GatingState::default(),
            adaptation,
            i_ahp_pa: 0.0,
            i_inj_pa: 0.0,
        }
    }

    pub fn gaba_current(&self) -> f64 {
        self.gaba.current(self.gaba_gate.s, self.v_mv)
    }

    /// `I_gaba - I_inj + I_ahp`
    pub fn synaptic_current(&self) -> f64 {
        self.gaba_current() - self.i_inj_pa + self.i_ahp_pa
    }

    /// Steady-state adaptation current for `v_mv`
    #[inline]
    fn ahp_target(&self, v_mv: f64) -> f64 {
        self.adaptation.g_ns * (v_mv - self.passive.e_leak_mv)
    }

    /// Forward-Euler adaptation update driven by `v_mv`
    pub fn relax_adaptation_explicit(&mut self, v_mv: f64, dt_ms: f64) {
        self.i_ahp_pa += dt_ms / self.adaptation.tau_ms * (self.ahp_target(v_mv) - self.i_ahp_pa);
    }

    /// Backward-Euler adaptation update driven by the end-of-step voltage
    pub fn relax_adaptation_implicit(&mut self, v_new_mv: f64, dt_ms: f64) {
        let h = dt_ms / self.adaptation.tau_ms;
        self.i_ahp_pa = (self.i_ahp_pa + h * self.ahp_target(v_new_mv)) / (1.0 + h);
    }

    /// Put the adaptation current at its steady state for the present voltage
    pub fn settle_adaptation(&mut self) {
        self.i_ahp_pa = self.ahp_target(self.v_mv);
    }

    /// Clamp to `v_reset_mv` and kick the adaptation current.
    /// Returns the adaptation current before and after the kick.
    pub fn fire(&mut self, v_reset_mv: f64) -> (f64, f64) {
        let before = self.i_ahp_pa;
        self.v_mv = v_reset_mv;
        self.i_ahp_pa += self.adaptation.kick_pa;
        (before, self.i_ahp_pa)
    }
}

impl CurrentContribution for SomaModel {
    fn kind_name(&self) -> &'static str {
        "root"
    }

    fn capacitance_pf(&self) -> f64 {
        self.passive.capacitance_pf
    }

    fn voltage(&self) -> f64 {
        self.v_mv
    }

    fn set_voltage(&mut self, v_mv: f64) {
        self.v_mv = v_mv;
    }

    #[inline]
    fn membrane_terms(&self) -> MembraneTerms {
        let g_gaba = self.gaba.conductance(self.gaba_gate.s);
        MembraneTerms {
            conductance_ns: self.passive.g_leak_ns + g_gaba,
            source_pa: self.passive.g_leak_ns * self.passive.e_leak_mv
                + g_gaba * self.gaba.e_rev_mv
                - self.i_ahp_pa
                + self.i_inj_pa,
        }
    }

    /// Adaptation at its steady state `g_ahp · (V - E_leak)` acts as an
    /// extra conductance toward the leak reversal.
    fn steady_state_terms(&self) -> MembraneTerms {
        let g_gaba = self.gaba.conductance(self.gaba_gate.s);
        let g_ahp = self.adaptation.g_ns;
        MembraneTerms {
            conductance_ns: self.passive.g_leak_ns + g_gaba + g_ahp,
            source_pa: (self.passive.g_leak_ns + g_ahp) * self.passive.e_leak_mv
                + g_gaba * self.gaba.e_rev_mv
                + self.i_inj_pa,
        }
    }

    fn advance_gating(&mut self, dt_ms: f64) {
        self.gaba_gate.advance(&self.gaba.kinetics, dt_ms);
    }

    fn injected_current(&self) -> f64 {
        self.i_inj_pa
    }

    fn set_injected_current(&mut self, i_pa: f64) {
        self.i_inj_pa = i_pa;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PassiveParams;
    use crate::synapse::SynapticParams;
    use crate::types::units::cylinder_area_um2;

    fn soma() -> SomaModel {
        SomaModel::at_rest(
            PassiveParams::SOMA.for_area(cylinder_area_um2(18.0, 12.0)),
            SynapticParams::default().gaba_soma,
            AdaptationParams::default(),
        )
    }

    #[test]
    fn test_rest_has_no_membrane_current() {
        let s = soma();
        assert_eq!(s.v_mv, -87.0);
        assert!(s.membrane_terms().current(s.v_mv).abs() < 1e-12);
    }

    #[test]
    fn test_injection_depolarises() {
        let mut s = soma();
        s.set_injected_current(100.0);
        // Negative outward current == net inward drive
        assert!((s.membrane_terms().current(s.v_mv) + 100.0).abs() < 1e-9);
        assert_eq!(s.synaptic_current(), -100.0);
    }

    #[test]
    fn test_fire_resets_and_kicks() {
        let mut s = soma();
        s.i_ahp_pa = 12.5;
        s.v_mv = -50.0;
        let (before, after) = s.fire(-74.0);
        assert_eq!(s.v_mv, -74.0);
        assert_eq!(before, 12.5);
        assert_eq!(after, 57.5);
    }

    #[test]
    fn test_adaptation_relaxes_to_target() {
        let mut implicit = soma();
        let mut explicit = soma();
        for _ in 0..10_000 {
            implicit.relax_adaptation_implicit(-77.0, 0.1);
            explicit.relax_adaptation_explicit(-77.0, 0.1);
        }
        // g_ahp · (V - E_leak) = 2 nS · 10 mV
        assert!((implicit.i_ahp_pa - 20.0).abs() < 1e-9);
        assert!((explicit.i_ahp_pa - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_steady_state_terms_fold_in_adaptation() {
        let mut s = soma();
        s.v_mv = -80.0;
        s.settle_adaptation();
        assert!((s.i_ahp_pa - 14.0).abs() < 1e-9);
        let dynamic = s.membrane_terms().current(s.v_mv);
        let steady = s.steady_state_terms().current(s.v_mv);
        assert!((dynamic - steady).abs() < 1e-9);
    }
}
