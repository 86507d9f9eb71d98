// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Dendra Cell Engine
//!
//! Time integration of one multi-compartment cell built by
//! `dendra-cell-neural`.
//!
//! ## Architecture
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Simulation                           │
//! ├──────────────────────────────────────┤
//! │ - Tree + Vec<Compartment>            │
//! │ - Integrator (tree solve, O(N))      │
//! │ - SpikeDetector                      │
//! │ - StimulusInjector                   │
//! │ - Recorder (traces + spike record)   │
//! │ - SimulationClock                    │
//! └──────────────────────────────────────┘
//!          ↓
//!       step()
//!          ↓
//! Stimulus → Gating → Voltage solve → Spike check → Record
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dendra_cell_engine::Simulation;
//!
//! let mut sim = Simulation::builder()
//!     .record("soma.v")
//!     .stimulus("soma", 200.0, 300.0, 1300.0)
//!     .build()?;
//! sim.run_for(1500.0)?;
//! println!("{} spikes", sim.recorder().spike_count());
//! # Ok::<(), dendra_cell_engine::SimulationError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod builder;
pub mod clock;
pub mod error;
pub mod integrator;
pub mod recorder;
pub mod simulation;
pub mod stimulus;

pub use builder::SimulationBuilder;
pub use clock::SimulationClock;
pub use error::{SimulationError, SimulationResult};
pub use integrator::{Divergence, IntegrationScheme, Integrator, DIVERGENCE_BOUND_MV};
pub use recorder::{Probe, Recorder, Trace};
pub use simulation::{RunSummary, Simulation, SimulationResults};
pub use stimulus::{StimulusInjector, StimulusWindow};
