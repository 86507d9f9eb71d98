// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core type definitions

pub mod error;
pub mod ids;
pub mod units;

pub use error::{NeuralError, Result};
pub use ids::CompartmentId;
