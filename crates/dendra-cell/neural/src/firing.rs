// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Spike Detector / Reset Controller
//!
//! ```text
//!            V_root > V_th (strict)
//!   Resting ─────────────────────────▶ Refractory
//!      ▲     reset V, kick I_ahp,          │
//!      │     record timestamp              │
//!      └───────────────────────────────────┘
//!          step ≥ spike_step + refractory_steps
//! ```
//!
//! The threshold is checked once per step, after integration. While
//! refractory no threshold check happens; crossings are ignored and neither
//! restart the timer nor repeat the kick.

use crate::models::{ModelParameters, SomaModel};
use crate::types::{NeuralError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpikeParams {
    pub threshold_mv: f64,
    pub reset_mv: f64,
    pub refractory_ms: f64,
    /// Hold the root voltage at reset for the whole refractory window
    pub clamp_during_refractory: bool,
}

impl Default for SpikeParams {
    fn default() -> Self {
        Self {
            threshold_mv: -56.0,
            reset_mv: -74.0,
            refractory_ms: 20.0,
            clamp_during_refractory: true,
        }
    }
}

impl ModelParameters for SpikeParams {
    fn validate(&self) -> Result<()> {
        if !self.threshold_mv.is_finite() || !self.reset_mv.is_finite() {
            return Err(NeuralError::invalid(
                "spike.threshold_mv/reset_mv",
                "must be finite",
            ));
        }
        if self.reset_mv >= self.threshold_mv {
            return Err(NeuralError::invalid(
                "spike.reset_mv",
                format!(
                    "must be below threshold ({} >= {})",
                    self.reset_mv, self.threshold_mv
                ),
            ));
        }
        if !(self.refractory_ms.is_finite() && self.refractory_ms >= 0.0) {
            return Err(NeuralError::invalid(
                "spike.refractory_ms",
                format!("must be non-negative, got {}", self.refractory_ms),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpikeState {
    Resting,
    Refractory { since_step: u64, until_step: u64 },
}

/// One threshold crossing of the root compartment
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpikeEvent {
    pub step: u64,
    pub time_ms: f64,
    pub adaptation_before_pa: f64,
    pub adaptation_after_pa: f64,
}

#[derive(Debug, Clone)]
pub struct SpikeDetector {
    params: SpikeParams,
    refractory_steps: u64,
    state: SpikeState,
}

impl SpikeDetector {
    /// Build a detector for a clock of step `dt_ms`.
    ///
    /// The refractory window is the smallest whole number of steps that
    /// covers `refractory_ms`.
    pub fn new(params: SpikeParams, dt_ms: f64) -> Result<Self> {
        params.validate()?;
        if !(dt_ms.is_finite() && dt_ms > 0.0) {
            return Err(NeuralError::invalid(
                "simulation.dt_ms",
                format!("must be positive, got {dt_ms}"),
            ));
        }
        let refractory_steps = (params.refractory_ms / dt_ms - 1e-9).ceil().max(0.0) as u64;
        Ok(Self {
            params,
            refractory_steps,
            state: SpikeState::Resting,
        })
    }

    pub fn params(&self) -> &SpikeParams {
        &self.params
    }

    pub fn state(&self) -> SpikeState {
        self.state
    }

    pub fn refractory_steps(&self) -> u64 {
        self.refractory_steps
    }

    /// Back to `Resting`, as at the start of a run
    pub fn reset(&mut self) {
        self.state = SpikeState::Resting;
    }

    /// Inspect the root after step `step` has been integrated.
    pub fn observe(&mut self, step: u64, time_ms: f64, soma: &mut SomaModel) -> Option<SpikeEvent> {
        if let SpikeState::Refractory { until_step, .. } = self.state {
            if step < until_step {
                if self.params.clamp_during_refractory {
                    soma.v_mv = self.params.reset_mv;
                }
                return None;
            }
            self.state = SpikeState::Resting;
        }

        if soma.v_mv > self.params.threshold_mv {
            let (adaptation_before_pa, adaptation_after_pa) = soma.fire(self.params.reset_mv);
            self.state = SpikeState::Refractory {
                since_step: step,
                until_step: step + self.refractory_steps,
            };
            return Some(SpikeEvent {
                step,
                time_ms,
                adaptation_before_pa,
                adaptation_after_pa,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdaptationParams, PassiveParams};
    use crate::synapse::SynapticParams;

    fn soma() -> SomaModel {
        SomaModel::at_rest(
            PassiveParams::SOMA.for_area(678.0),
            SynapticParams::default().gaba_soma,
            AdaptationParams::default(),
        )
    }

    #[test]
    fn test_refractory_steps_cover_window() {
        let d = SpikeDetector::new(SpikeParams::default(), 0.1).unwrap();
        assert_eq!(d.refractory_steps(), 200);
        let d = SpikeDetector::new(SpikeParams::default(), 0.6).unwrap();
        // 33.3 steps -> 34 so spikes are never closer than 20 ms
        assert_eq!(d.refractory_steps(), 34);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut d = SpikeDetector::new(SpikeParams::default(), 0.1).unwrap();
        let mut s = soma();
        s.v_mv = -56.0;
        assert!(d.observe(1, 0.1, &mut s).is_none());
        s.v_mv = -55.999;
        let ev = d.observe(2, 0.2, &mut s).unwrap();
        assert_eq!(ev.step, 2);
        assert_eq!(s.v_mv, -74.0);
        assert_eq!(ev.adaptation_after_pa - ev.adaptation_before_pa, 45.0);
    }

    #[test]
    fn test_refractory_ignores_crossings_and_clamps() {
        let mut d = SpikeDetector::new(SpikeParams::default(), 0.1).unwrap();
        let mut s = soma();
        s.v_mv = -40.0;
        assert!(d.observe(10, 1.0, &mut s).is_some());
        let ahp_after_spike = s.i_ahp_pa;

        for step in 11..210 {
            s.v_mv = -30.0;
            assert!(d.observe(step, step as f64 * 0.1, &mut s).is_none());
            assert_eq!(s.v_mv, -74.0);
        }
        assert_eq!(s.i_ahp_pa, ahp_after_spike);
        assert_eq!(
            d.state(),
            SpikeState::Refractory {
                since_step: 10,
                until_step: 210
            }
        );

        s.v_mv = -30.0;
        assert!(d.observe(210, 21.0, &mut s).is_some());
    }

    #[test]
    fn test_unclamped_refractory_leaves_voltage() {
        let params = SpikeParams {
            clamp_during_refractory: false,
            ..SpikeParams::default()
        };
        let mut d = SpikeDetector::new(params, 0.1).unwrap();
        let mut s = soma();
        s.v_mv = -40.0;
        d.observe(0, 0.0, &mut s);
        s.v_mv = -30.0;
        assert!(d.observe(1, 0.1, &mut s).is_none());
        assert_eq!(s.v_mv, -30.0);
    }

    #[test]
    fn test_invalid_params() {
        let bad = SpikeParams {
            reset_mv: -50.0,
            ..SpikeParams::default()
        };
        assert!(SpikeDetector::new(bad, 0.1).is_err());
        assert!(SpikeDetector::new(SpikeParams::default(), 0.0).is_err());
    }
}
