// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Branch (dendritic) compartment
//!
//! ```text
//! I_syn = I_nmda + I_ampa + I_gaba - I_inj
//! C · dV/dt = -I_leak - I_syn + axial
//! ```

use super::passive::PassiveMembrane;
use super::traits::{CurrentContribution, MembraneTerms};
use crate::synapse::{GatingState, MgBlock, Receptor, ReceptorParams};

#[derive(Debug, Clone, PartialEq)]
pub struct DendriteModel {
    pub v_mv: f64,
    pub passive: PassiveMembrane,
    pub nmda: ReceptorParams,
    pub ampa: ReceptorParams,
    pub gaba: ReceptorParams,
    pub mg_block: MgBlock,
    pub nmda_gate: GatingState,
    pub ampa_gate: GatingState,
    pub gaba_gate: GatingState,
    pub i_inj_pa: f64,
}

impl DendriteModel {
    pub fn at_rest(
        passive: PassiveMembrane,
        nmda: ReceptorParams,
        ampa: ReceptorParams,
        gaba: ReceptorParams,
        mg_block: MgBlock,
    ) -> Self {
        Self {
            v_mv: passive.e_leak_mv,
            passive,
            nmda,
            ampa,
            gaba,
            mg_block,
            nmda_gate: GatingState::default(),
            ampa_gate: GatingState::default(),
            gaba_gate: GatingState::default(),
            i_inj_pa: 0.0,
        }
    }

    /// NMDA conductance with the Mg block evaluated at the present voltage
    #[inline]
    fn nmda_conductance(&self) -> f64 {
        self.nmda.conductance(self.nmda_gate.s) * self.mg_block.unblocked_fraction(self.v_mv)
    }

    pub fn nmda_current(&self) -> f64 {
        self.nmda_conductance() * (self.v_mv - self.nmda.e_rev_mv)
    }

    pub fn ampa_current(&self) -> f64 {
        self.ampa.current(self.ampa_gate.s, self.v_mv)
    }

    pub fn gaba_current(&self) -> f64 {
        self.gaba.current(self.gaba_gate.s, self.v_mv)
    }

    /// `I_nmda + I_ampa + I_gaba - I_inj`
    pub fn synaptic_current(&self) -> f64 {
        self.nmda_current() + self.ampa_current() + self.gaba_current() - self.i_inj_pa
    }

    pub fn gate(&self, receptor: Receptor) -> &GatingState {
        match receptor {
            Receptor::Nmda => &self.nmda_gate,
            Receptor::Ampa => &self.ampa_gate,
            Receptor::Gaba => &self.gaba_gate,
        }
    }

    pub fn gate_mut(&mut self, receptor: Receptor) -> (&mut GatingState, &ReceptorParams) {
        match receptor {
            Receptor::Nmda => (&mut self.nmda_gate, &self.nmda),
            Receptor::Ampa => (&mut self.ampa_gate, &self.ampa),
            Receptor::Gaba => (&mut self.gaba_gate, &self.gaba),
        }
    }
}

impl CurrentContribution for DendriteModel {
    fn kind_name(&self) -> &'static str {
        "branch"
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
        let g_nmda = self.nmda_conductance();
        let g_ampa = self.ampa.conductance(self.ampa_gate.s);
        let g_gaba = self.gaba.conductance(self.gaba_gate.s);
        MembraneTerms {
            conductance_ns: self.passive.g_leak_ns + g_nmda + g_ampa + g_gaba,
            source_pa: self.passive.g_leak_ns * self.passive.e_leak_mv
                + g_nmda * self.nmda.e_rev_mv
                + g_ampa * self.ampa.e_rev_mv
                + g_gaba * self.gaba.e_rev_mv
                + self.i_inj_pa,
        }
    }

    fn advance_gating(&mut self, dt_ms: f64) {
        self.nmda_gate.advance(&self.nmda.kinetics, dt_ms);
        self.ampa_gate.advance(&self.ampa.kinetics, dt_ms);
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

    fn dendrite() -> DendriteModel {
        let syn = SynapticParams::default();
        DendriteModel::at_rest(
            PassiveParams::DENDRITE.for_area(cylinder_area_um2(83.0, 0.8)),
            syn.nmda,
            syn.ampa,
            syn.gaba_dendrite,
            syn.mg_block,
        )
    }

    #[test]
    fn test_terms_match_explicit_currents() {
        let mut d = dendrite();
        d.v_mv = -60.0;
        d.nmda_gate.s = 0.3;
        d.ampa_gate.s = 0.2;
        d.gaba_gate.s = 0.1;
        d.i_inj_pa = 5.0;

        let expected = d.passive.leak_current(d.v_mv) + d.synaptic_current();
        let terms = d.membrane_terms();
        assert!((terms.current(d.v_mv) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_nmda_is_weaker_than_ampa_when_hyperpolarised() {
        let mut d = dendrite();
        d.v_mv = -80.0;
        d.nmda_gate.s = 1.0;
        d.ampa_gate.s = 1.0;
        // Same gating, g_nmda = 1.08 g_ampa, but the Mg block dominates
        assert!(d.nmda_current().abs() < d.ampa_current().abs());
    }

    #[test]
    fn test_gating_decays_autonomously() {
        let mut d = dendrite();
        let (gate, params) = d.gate_mut(Receptor::Ampa);
        let kinetics = params.kinetics;
        gate.on_event(&kinetics, 1.0);
        for _ in 0..10 {
            d.advance_gating(0.1);
        }
        let s_early = d.gate(Receptor::Ampa).s;
        for _ in 0..1000 {
            d.advance_gating(0.1);
        }
        assert!(s_early > 0.0);
        assert!(d.gate(Receptor::Ampa).s < s_early * 1e-3);
    }
}
