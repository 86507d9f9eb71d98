// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Compartment Model Traits
//!
//! Every compartment kind reports its transmembrane current in a linearised
//! form so that explicit and implicit solvers can share one contract:
//!
//! ```text
//! I_m(V) = G · V - S          (outward positive)
//! ```
//!
//! `G` collects every conductance at the current state (ligand conductances,
//! including the Mg-block factor, are evaluated at the present voltage) and
//! `S` collects the conductance-weighted reversal potentials plus any
//! voltage-independent currents (injection, adaptation).

use crate::types::Result;

/// Linearised membrane current of one compartment
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MembraneTerms {
    /// Total membrane conductance (nS)
    pub conductance_ns: f64,
    /// Current source (pA)
    pub source_pa: f64,
}

impl MembraneTerms {
    /// Outward membrane current (pA) at `v_mv`
    #[inline]
    pub fn current(&self, v_mv: f64) -> f64 {
        self.conductance_ns * v_mv - self.source_pa
    }
}

/// Shared current-contribution contract of all compartment kinds
pub trait CurrentContribution {
    /// Human-readable kind name
    fn kind_name(&self) -> &'static str;

    fn capacitance_pf(&self) -> f64;

    fn voltage(&self) -> f64;

    fn set_voltage(&mut self, v_mv: f64);

    /// Linearised membrane current at the present state
    fn membrane_terms(&self) -> MembraneTerms;

    /// Linearised membrane current with slow state variables at their steady
    /// state for the present voltage. Kinds without such variables return
    /// [`membrane_terms`](Self::membrane_terms).
    fn steady_state_terms(&self) -> MembraneTerms {
        self.membrane_terms()
    }

    /// Advance ligand gating variables by `dt_ms`
    fn advance_gating(&mut self, dt_ms: f64);

    fn injected_current(&self) -> f64;

    fn set_injected_current(&mut self, i_pa: f64);
}

/// Parameter validation, implemented by every parameter set
pub trait ModelParameters {
    fn validate(&self) -> Result<()>;
}
