// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for cell construction and state access

use thiserror::Error;

/// Errors raised while building or addressing a compartment tree
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NeuralError {
    /// Structural misconfiguration of the morphology (cycle, orphan, several roots, ...)
    #[error("malformed topology: {0}")]
    MalformedTopology(String),

    /// Out-of-range or missing parameter
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("unknown compartment: {0}")]
    UnknownCompartment(String),

    /// The variable or receptor exists, but not on this kind of compartment
    #[error("{variable} is not available on {kind} compartment '{compartment}'")]
    UnsupportedVariable {
        compartment: String,
        kind: &'static str,
        variable: String,
    },
}

impl NeuralError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        NeuralError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, NeuralError>;
