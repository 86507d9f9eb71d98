// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synaptic Kinetics
//!
//! Ligand-gated conductances driven by per-compartment gating variables:
//! - **kinetics**: autonomous decay (single exponential or dual rise/decay)
//! - **receptor**: receptor classes, conductance/current evaluation, Mg block

pub mod kinetics;
pub mod receptor;

pub use kinetics::{GatingState, Kinetics};
pub use receptor::{MgBlock, Receptor, ReceptorParams, SynapticParams};
