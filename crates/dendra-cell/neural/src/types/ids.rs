// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Compartment identifiers

use core::fmt;

/// Index of a compartment inside its [`Tree`](crate::topology::Tree).
///
/// Indices are assigned in topological order: the root is always `0` and
/// every parent has a smaller index than its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompartmentId(pub u32);

impl CompartmentId {
    /// The root (somatic) compartment
    pub const ROOT: CompartmentId = CompartmentId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl From<usize> for CompartmentId {
    fn from(index: usize) -> Self {
        CompartmentId(index as u32)
    }
}

impl fmt::Display for CompartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
