// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-step simulation clock

use crate::error::{SimulationError, SimulationResult};

/// Tolerance used when converting durations to whole steps
const STEP_EPSILON: f64 = 1e-9;

/// Step counter with a fixed Δt.
///
/// Time is always `step · Δt`, never accumulated, so the grid does not drift
/// over long runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    dt_ms: f64,
    step: u64,
}

impl SimulationClock {
    pub fn new(dt_ms: f64) -> SimulationResult<Self> {
        if !(dt_ms.is_finite() && dt_ms > 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "simulation.dt_ms must be positive, got {dt_ms}"
            )));
        }
        Ok(Self { dt_ms, step: 0 })
    }

    #[inline]
    pub fn dt_ms(&self) -> f64 {
        self.dt_ms
    }

    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }

    #[inline]
    pub fn time_ms(&self) -> f64 {
        self.time_at(self.step)
    }

    #[inline]
    pub fn time_at(&self, step: u64) -> f64 {
        step as f64 * self.dt_ms
    }

    /// Number of steps needed to cover `duration_ms` (rounded up)
    pub fn steps_for(&self, duration_ms: f64) -> u64 {
        if !(duration_ms > 0.0) {
            return 0;
        }
        (duration_ms / self.dt_ms - STEP_EPSILON).ceil().max(0.0) as u64
    }

    #[inline]
    pub fn advance(&mut self) {
        self.step += 1;
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_run_length() {
        let clock = SimulationClock::new(0.1).unwrap();
        assert_eq!(clock.steps_for(1500.0), 15_000);
        assert_eq!(clock.steps_for(300.0), 3_000);
        assert_eq!(clock.steps_for(0.05), 1);
        assert_eq!(clock.steps_for(0.0), 0);
        assert_eq!(clock.steps_for(-5.0), 0);
    }

    #[test]
    fn test_time_is_step_times_dt() {
        let mut clock = SimulationClock::new(0.025).unwrap();
        for _ in 0..40_000 {
            clock.advance();
        }
        assert_eq!(clock.step(), 40_000);
        assert_eq!(clock.time_ms(), 40_000.0 * 0.025);
        clock.reset();
        assert_eq!(clock.time_ms(), 0.0);
    }

    #[test]
    fn test_rejects_bad_dt() {
        assert!(SimulationClock::new(0.0).is_err());
        assert!(SimulationClock::new(f64::NAN).is_err());
    }
}
