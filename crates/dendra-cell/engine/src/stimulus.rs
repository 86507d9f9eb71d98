// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Stimulus Injector
//!
//! Piecewise-constant current injection over half-open time windows.
//! Overlapping windows on the same compartment add up; outside every window
//! the injected current is zero.

use dendra_cell_neural::{Compartment, CompartmentId, CurrentContribution};
use serde::Serialize;
use tracing::debug;

use crate::error::{SimulationError, SimulationResult};

/// Window edges are compared with this tolerance so that grid times computed
/// as `step · Δt` land on the intended side of a boundary.
const EDGE_EPSILON_MS: f64 = 1e-9;

/// Constant current into one compartment over `[start_ms, end_ms)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StimulusWindow {
    pub target: CompartmentId,
    pub amplitude_pa: f64,
    pub start_ms: f64,
    pub end_ms: f64,
}

impl StimulusWindow {
    #[inline]
    pub fn contains(&self, t_ms: f64) -> bool {
        t_ms >= self.start_ms - EDGE_EPSILON_MS && t_ms < self.end_ms - EDGE_EPSILON_MS
    }
}

#[derive(Debug, Clone)]
pub struct StimulusInjector {
    windows: Vec<StimulusWindow>,
    totals: Vec<f64>,
}

impl StimulusInjector {
    pub fn new(compartment_count: usize) -> Self {
        Self {
            windows: Vec::new(),
            totals: vec![0.0; compartment_count],
        }
    }

    /// Inject `amplitude_pa` into `target` while `start_ms <= t < end_ms`
    pub fn set_injected_current(
        &mut self,
        target: CompartmentId,
        amplitude_pa: f64,
        start_ms: f64,
        end_ms: f64,
    ) -> SimulationResult<()> {
        if target.index() >= self.totals.len() {
            return Err(SimulationError::InvalidStimulus(format!(
                "target {target} is outside a tree of {} compartments",
                self.totals.len()
            )));
        }
        if !amplitude_pa.is_finite() {
            return Err(SimulationError::InvalidStimulus(format!(
                "amplitude must be finite, got {amplitude_pa}"
            )));
        }
        if !(start_ms.is_finite() && end_ms.is_finite() && start_ms < end_ms) {
            return Err(SimulationError::InvalidStimulus(format!(
                "window [{start_ms}, {end_ms}) must have finite bounds with start < end"
            )));
        }
        self.windows.push(StimulusWindow {
            target,
            amplitude_pa,
            start_ms,
            end_ms,
        });
        Ok(())
    }

    /// The canonical protocol: 0 before `onset_ms`, `amplitude_pa` over
    /// `[onset_ms, offset_ms)`, 0 afterwards
    pub fn three_phase(
        &mut self,
        target: CompartmentId,
        amplitude_pa: f64,
        onset_ms: f64,
        offset_ms: f64,
    ) -> SimulationResult<()> {
        self.set_injected_current(target, amplitude_pa, onset_ms, offset_ms)
    }

    pub fn windows(&self) -> &[StimulusWindow] {
        &self.windows
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }

    /// Total injected current into `target` at `t_ms`
    pub fn current_at(&self, target: CompartmentId, t_ms: f64) -> f64 {
        self.windows
            .iter()
            .filter(|w| w.target == target && w.contains(t_ms))
            .map(|w| w.amplitude_pa)
            .sum()
    }

    /// Write the injected current for `t_ms` into every compartment.
    /// Returns how many compartments changed.
    pub fn apply(&mut self, t_ms: f64, compartments: &mut [Compartment]) -> usize {
        self.totals.iter_mut().for_each(|total| *total = 0.0);
        for window in self.windows.iter().filter(|w| w.contains(t_ms)) {
            self.totals[window.target.index()] += window.amplitude_pa;
        }

        let mut changed = 0;
        for (index, (compartment, &total)) in compartments.iter_mut().zip(&self.totals).enumerate() {
            if compartment.injected_current() != total {
                debug!(
                    compartment = index,
                    t_ms,
                    from_pa = compartment.injected_current(),
                    to_pa = total,
                    "[STIMULUS] injected current changed"
                );
                compartment.set_injected_current(total);
                changed += 1;
            }
        }
        changed
    }
}
