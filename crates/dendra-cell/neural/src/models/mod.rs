// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Compartment Model Architecture
//!
//! A cell is a tree of compartments of two kinds:
//! - **root** ([`SomaModel`]): leak, somatic GABA, injection, adaptation current
//! - **branch** ([`DendriteModel`]): leak, NMDA (Mg-blocked), AMPA, dendritic GABA, injection
//!
//! Both implement [`CurrentContribution`], the contract the coupled
//! integrator is written against. [`Compartment`] is the tagged variant the
//! cell stores per node.

pub mod compartment;
pub mod dendrite;
pub mod passive;
pub mod soma;
pub mod traits;

pub use compartment::{Compartment, Variable};
pub use dendrite::DendriteModel;
pub use passive::{PassiveMembrane, PassiveParams};
pub use soma::{AdaptationParams, SomaModel};
pub use traits::{CurrentContribution, MembraneTerms, ModelParameters};
