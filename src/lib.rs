// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Dendra - Multi-Compartment Neuron Simulation
//!
//! Dendra simulates the electrical behaviour of one branched neuron: a tree
//! of compartments coupled through axial resistance, each with passive leak,
//! ligand-gated synaptic currents (NMDA with Mg block, AMPA, GABA) and, at the
//! soma, a spike-triggered adaptation current.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dendra::prelude::*;
//!
//! // Reference granule cell, -100 pA into the soma for one second
//! let mut sim = Simulation::builder()
//!     .record("soma.v")
//!     .stimulus("soma", -100.0, 300.0, 1300.0)
//!     .build()?;
//! sim.run_for(1500.0)?;
//!
//! let soma = sim.recorder().trace("soma.v")?;
//! let v_min = soma.values().iter().cloned().fold(f64::INFINITY, f64::min);
//! println!("minimum {v_min:.2} mV, {} spikes", sim.recorder().spike_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: dendra-config, dendra-observability        │
//! │  (TOML configuration, logging)                          │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Cell model: dendra-cell-neural                         │
//! │  (Topology, compartment equations, kinetics, firing)    │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Engine: dendra-cell-engine                             │
//! │  (Coupled integrator, stimulus, recorder, simulation)   │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Analysis + tools/current_sweep                         │
//! │  (Step-response measures, amplitude sweeps)             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use dendra_cell_engine as engine;
pub use dendra_cell_neural as neural;
pub use dendra_config as config;
pub use dendra_observability as observability;

pub mod analysis;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::analysis::{RestingProbe, StepProtocol, StepResponse};
    pub use crate::config::{load_config, DendraConfig};
    pub use crate::engine::{
        IntegrationScheme, Probe, RunSummary, Simulation, SimulationBuilder, SimulationError,
        SimulationResult, SimulationResults, Trace,
    };
    pub use crate::neural::{
        BranchedTree, CellParameters, Compartment, CompartmentId, CurrentContribution, Receptor,
        SpikeEvent, Tree, Variable,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let tree = Tree::build(&BranchedTree::default().to_spec()).unwrap();
        assert_eq!(tree.len(), 22);
        assert_eq!(IntegrationScheme::default(), IntegrationScheme::BackwardEuler);
    }
}
