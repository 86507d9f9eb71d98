// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulation error types

use dendra_cell_neural::NeuralError;
use dendra_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    /// Topology, parameter or addressing error from the cell model
    #[error(transparent)]
    Neural(#[from] NeuralError),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fatal to the run; the simulation refuses further steps afterwards
    #[error("numerical divergence at step {step}: compartment '{compartment}' reached {voltage_mv} mV")]
    NumericalDivergence {
        step: u64,
        compartment: String,
        voltage_mv: f64,
    },

    #[error("unknown variable '{probe}': {reason}")]
    UnknownVariable { probe: String, reason: String },

    #[error("invalid stimulus: {0}")]
    InvalidStimulus(String),

    #[error("simulation halted by numerical divergence at step {step}")]
    Halted { step: u64 },
}

impl From<ConfigError> for SimulationError {
    fn from(err: ConfigError) -> Self {
        SimulationError::InvalidConfiguration(err.to_string())
    }
}

pub type SimulationResult<T> = Result<T, SimulationError>;
