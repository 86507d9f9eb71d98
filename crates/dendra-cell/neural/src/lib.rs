// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Dendra Cell Model
//!
//! Everything that describes one multi-compartment neuron, independent of how
//! it is integrated in time:
//! - **Topology**: rooted compartment tree and axial links
//! - **Models**: root and branch compartment kinds and their current equations
//! - **Synapse**: ligand-gated kinetics, Mg block
//! - **Firing**: threshold / reset / refractory controller
//!
//! Time integration, stimulus and recording live in `dendra-cell-engine`.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cell;
pub mod firing;
pub mod models;
pub mod synapse;
pub mod topology;
pub mod types;

pub use cell::{build_compartments, CellParameters};
pub use firing::{SpikeDetector, SpikeEvent, SpikeParams, SpikeState};
pub use models::{
    AdaptationParams, Compartment, CurrentContribution, DendriteModel, MembraneTerms,
    ModelParameters, PassiveMembrane, PassiveParams, SomaModel, Variable,
};
pub use synapse::{GatingState, Kinetics, MgBlock, Receptor, ReceptorParams, SynapticParams};
pub use topology::{
    AxialLink, BranchedTree, CompartmentRole, CompartmentSpec, Geometry, MorphologySpec, Tree,
};
pub use types::{units, CompartmentId, NeuralError, Result};
