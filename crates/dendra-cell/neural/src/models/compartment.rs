// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Closed set of compartment kinds, selected per compartment at construction

use core::fmt;
use core::str::FromStr;

use super::dendrite::DendriteModel;
use super::soma::SomaModel;
use super::traits::{CurrentContribution, MembraneTerms};
use crate::synapse::Receptor;
use crate::types::{NeuralError, Result};

/// Observable state variable of a compartment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Membrane voltage (mV)
    V,
    ILeak,
    /// Total synaptic-term current as it enters the membrane equation
    ISyn,
    IInj,
    IGaba,
    SGaba,
    /// Root only
    IAhp,
    /// Branch only
    INmda,
    /// Branch only
    IAmpa,
    /// Branch only
    SNmda,
    /// Branch only
    SAmpa,
}

impl Variable {
    pub const ALL: [Variable; 11] = [
        Variable::V,
        Variable::ILeak,
        Variable::ISyn,
        Variable::IInj,
        Variable::IGaba,
        Variable::SGaba,
        Variable::IAhp,
        Variable::INmda,
        Variable::IAmpa,
        Variable::SNmda,
        Variable::SAmpa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::V => "v",
            Variable::ILeak => "i_leak",
            Variable::ISyn => "i_syn",
            Variable::IInj => "i_inj",
            Variable::IGaba => "i_gaba",
            Variable::SGaba => "s_gaba",
            Variable::IAhp => "i_ahp",
            Variable::INmda => "i_nmda",
            Variable::IAmpa => "i_ampa",
            Variable::SNmda => "s_nmda",
            Variable::SAmpa => "s_ampa",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Variable::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Variable::ALL.iter().map(Variable::as_str).collect();
                format!("unknown variable '{s}' (known: {})", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Compartment {
    Root(SomaModel),
    Branch(DendriteModel),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Compartment::Root($inner) => $body,
            Compartment::Branch($inner) => $body,
        }
    };
}

impl Compartment {
    pub fn as_root(&self) -> Option<&SomaModel> {
        match self {
            Compartment::Root(soma) => Some(soma),
            Compartment::Branch(_) => None,
        }
    }

    pub fn as_root_mut(&mut self) -> Option<&mut SomaModel> {
        match self {
            Compartment::Root(soma) => Some(soma),
            Compartment::Branch(_) => None,
        }
    }

    pub fn leak_current(&self) -> f64 {
        dispatch!(self, c => c.passive.leak_current(c.v_mv))
    }

    pub fn synaptic_current(&self) -> f64 {
        dispatch!(self, c => c.synaptic_current())
    }

    pub fn e_leak_mv(&self) -> f64 {
        dispatch!(self, c => c.passive.e_leak_mv)
    }

    pub fn supports(&self, variable: Variable) -> bool {
        match (self, variable) {
            (Compartment::Root(_), Variable::INmda | Variable::IAmpa)
            | (Compartment::Root(_), Variable::SNmda | Variable::SAmpa) => false,
            (Compartment::Branch(_), Variable::IAhp) => false,
            _ => true,
        }
    }

    /// Current value of `variable`, `None` when this kind does not carry it
    pub fn value(&self, variable: Variable) -> Option<f64> {
        let value = match (self, variable) {
            (_, Variable::V) => self.voltage(),
            (_, Variable::ILeak) => self.leak_current(),
            (_, Variable::ISyn) => self.synaptic_current(),
            (_, Variable::IInj) => self.injected_current(),
            (Compartment::Root(s), Variable::IGaba) => s.gaba_current(),
            (Compartment::Root(s), Variable::SGaba) => s.gaba_gate.s,
            (Compartment::Root(s), Variable::IAhp) => s.i_ahp_pa,
            (Compartment::Branch(d), Variable::IGaba) => d.gaba_current(),
            (Compartment::Branch(d), Variable::SGaba) => d.gaba_gate.s,
            (Compartment::Branch(d), Variable::INmda) => d.nmda_current(),
            (Compartment::Branch(d), Variable::IAmpa) => d.ampa_current(),
            (Compartment::Branch(d), Variable::SNmda) => d.nmda_gate.s,
            (Compartment::Branch(d), Variable::SAmpa) => d.ampa_gate.s,
            (Compartment::Root(_), _) | (Compartment::Branch(_), Variable::IAhp) => return None,
        };
        Some(value)
    }

    /// Deliver a presynaptic event of `weight` to `receptor`.
    ///
    /// The root only carries the GABA pathway.
    pub fn deliver_event(&mut self, name: &str, receptor: Receptor, weight: f64) -> Result<()> {
        match self {
            Compartment::Root(soma) => match receptor {
                Receptor::Gaba => {
                    soma.gaba_gate.on_event(&soma.gaba.kinetics, weight);
                    Ok(())
                }
                other => Err(unsupported_receptor(name, other)),
            },
            Compartment::Branch(dendrite) => {
                let (gate, params) = dendrite.gate_mut(receptor);
                gate.on_event(&params.kinetics, weight);
                Ok(())
            }
        }
    }

    /// Overwrite the bound fraction of `receptor`
    pub fn set_gating(&mut self, name: &str, receptor: Receptor, s: f64) -> Result<()> {
        if !s.is_finite() {
            return Err(NeuralError::invalid(
                format!("{name}.s_{receptor}"),
                "gating value must be finite",
            ));
        }
        match self {
            Compartment::Root(soma) => match receptor {
                Receptor::Gaba => {
                    soma.gaba_gate.s = s;
                    Ok(())
                }
                other => Err(unsupported_receptor(name, other)),
            },
            Compartment::Branch(dendrite) => {
                dendrite.gate_mut(receptor).0.s = s;
                Ok(())
            }
        }
    }
}

fn unsupported_receptor(name: &str, receptor: Receptor) -> NeuralError {
    NeuralError::UnsupportedVariable {
        compartment: name.to_string(),
        kind: "root",
        variable: format!("{receptor} receptor"),
    }
}

impl CurrentContribution for Compartment {
    fn kind_name(&self) -> &'static str {
        dispatch!(self, c => c.kind_name())
    }

    fn capacitance_pf(&self) -> f64 {
        dispatch!(self, c => c.capacitance_pf())
    }

    fn voltage(&self) -> f64 {
        dispatch!(self, c => c.v_mv)
    }

    fn set_voltage(&mut self, v_mv: f64) {
        dispatch!(self, c => c.v_mv = v_mv)
    }

    #[inline]
    fn membrane_terms(&self) -> MembraneTerms {
        dispatch!(self, c => c.membrane_terms())
    }

    fn steady_state_terms(&self) -> MembraneTerms {
        dispatch!(self, c => c.steady_state_terms())
    }

    fn advance_gating(&mut self, dt_ms: f64) {
        dispatch!(self, c => c.advance_gating(dt_ms))
    }

    fn injected_current(&self) -> f64 {
        dispatch!(self, c => c.i_inj_pa)
    }

    fn set_injected_current(&mut self, i_pa: f64) {
        dispatch!(self, c => c.i_inj_pa = i_pa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdaptationParams, PassiveParams};
    use crate::synapse::SynapticParams;

    fn root() -> Compartment {
        Compartment::Root(SomaModel::at_rest(
            PassiveParams::SOMA.for_area(100.0),
            SynapticParams::default().gaba_soma,
            AdaptationParams::default(),
        ))
    }

    fn branch() -> Compartment {
        let syn = SynapticParams::default();
        Compartment::Branch(DendriteModel::at_rest(
            PassiveParams::DENDRITE.for_area(100.0),
            syn.nmda,
            syn.ampa,
            syn.gaba_dendrite,
            syn.mg_block,
        ))
    }

    #[test]
    fn test_variable_availability_per_kind() {
        let r = root();
        let b = branch();
        assert!(r.value(Variable::IAhp).is_some());
        assert!(r.value(Variable::INmda).is_none());
        assert!(b.value(Variable::IAhp).is_none());
        assert!(b.value(Variable::SAmpa).is_some());
        for v in Variable::ALL {
            assert_eq!(r.supports(v), r.value(v).is_some(), "{v}");
            assert_eq!(b.supports(v), b.value(v).is_some(), "{v}");
        }
    }

    #[test]
    fn test_variable_parse() {
        assert_eq!("i_ahp".parse::<Variable>().unwrap(), Variable::IAhp);
        let err = "vm".parse::<Variable>().unwrap_err();
        assert!(err.contains("unknown variable 'vm'"));
    }

    #[test]
    fn test_root_rejects_excitatory_receptors() {
        let mut r = root();
        assert!(r.deliver_event("soma", Receptor::Gaba, 1.0).is_ok());
        assert!(matches!(
            r.deliver_event("soma", Receptor::Nmda, 1.0),
            Err(NeuralError::UnsupportedVariable { .. })
        ));
        assert!(r.set_gating("soma", Receptor::Ampa, 0.5).is_err());
    }

    #[test]
    fn test_set_gating_on_branch() {
        let mut b = branch();
        b.set_gating("dend0", Receptor::Nmda, 0.25).unwrap();
        assert_eq!(b.value(Variable::SNmda), Some(0.25));
        assert!(b.set_gating("dend0", Receptor::Nmda, f64::NAN).is_err());
    }

    #[test]
    fn test_kinds_start_at_their_leak_reversal() {
        assert_eq!(root().voltage(), -87.0);
        assert_eq!(branch().voltage(), -82.0);
        assert_eq!(root().kind_name(), "root");
        assert_eq!(branch().kind_name(), "branch");
    }
}
