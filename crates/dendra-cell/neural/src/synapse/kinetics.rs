// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Gating-variable kinetics
//!
//! ```text
//! Single exponential:
//!     ds/dt = -s / τ_decay
//!
//! Dual rise/decay:
//!     dx/dt = -x / τ_rise
//!     ds/dt = -s / τ_decay + α · x · (1 - s)
//! ```
//!
//! Between externally delivered events the variables only decay; no event is
//! generated inside the cell.

use crate::models::traits::ModelParameters;
use crate::types::{NeuralError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Kinetics {
    SingleExponential {
        tau_decay_ms: f64,
    },
    DualExponential {
        tau_rise_ms: f64,
        tau_decay_ms: f64,
        alpha_per_ms: f64,
    },
}

impl Kinetics {
    pub fn tau_decay_ms(&self) -> f64 {
        match *self {
            Kinetics::SingleExponential { tau_decay_ms }
            | Kinetics::DualExponential { tau_decay_ms, .. } => tau_decay_ms,
        }
    }
}

impl ModelParameters for Kinetics {
    fn validate(&self) -> Result<()> {
        let positive = |field: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(NeuralError::invalid(
                    field,
                    format!("must be positive, got {value}"),
                ))
            }
        };
        match *self {
            Kinetics::SingleExponential { tau_decay_ms } => positive("tau_decay_ms", tau_decay_ms),
            Kinetics::DualExponential {
                tau_rise_ms,
                tau_decay_ms,
                alpha_per_ms,
            } => {
                positive("tau_rise_ms", tau_rise_ms)?;
                positive("tau_decay_ms", tau_decay_ms)?;
                if alpha_per_ms.is_finite() && alpha_per_ms >= 0.0 {
                    Ok(())
                } else {
                    Err(NeuralError::invalid(
                        "alpha_per_ms",
                        format!("must be non-negative, got {alpha_per_ms}"),
                    ))
                }
            }
        }
    }
}

/// Bound fraction `s` plus the rise variable `x` used by dual kinetics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GatingState {
    pub s: f64,
    pub x: f64,
}

impl GatingState {
    pub fn new(s: f64) -> Self {
        Self { s, x: 0.0 }
    }

    /// Advance by `dt_ms` under `kinetics`.
    ///
    /// The decay terms are integrated exactly; the coupling term of the dual
    /// scheme is taken implicitly in `s`, which keeps `s` inside [0, 1]
    /// whenever it starts there.
    #[inline]
    pub fn advance(&mut self, kinetics: &Kinetics, dt_ms: f64) {
        match *kinetics {
            Kinetics::SingleExponential { tau_decay_ms } => {
                self.s *= (-dt_ms / tau_decay_ms).exp();
            }
            Kinetics::DualExponential {
                tau_rise_ms,
                tau_decay_ms,
                alpha_per_ms,
            } => {
                self.x *= (-dt_ms / tau_rise_ms).exp();
                let drive = dt_ms * alpha_per_ms * self.x;
                self.s = (self.s + drive) / (1.0 + dt_ms / tau_decay_ms + drive);
            }
        }
    }

    /// Presynaptic event of the given weight
    pub fn on_event(&mut self, kinetics: &Kinetics, weight: f64) {
        match kinetics {
            Kinetics::SingleExponential { .. } => self.s += weight,
            Kinetics::DualExponential { .. } => self.x += weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_exponential_is_exact() {
        let k = Kinetics::SingleExponential { tau_decay_ms: 2.0 };
        let mut g = GatingState::new(1.0);
        for _ in 0..20 {
            g.advance(&k, 0.1);
        }
        assert!((g.s - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_stays_zero() {
        let k = Kinetics::DualExponential {
            tau_rise_ms: 0.1,
            tau_decay_ms: 2.5,
            alpha_per_ms: 1.0,
        };
        let mut g = GatingState::default();
        for _ in 0..1000 {
            g.advance(&k, 0.1);
        }
        assert_eq!(g, GatingState::default());
    }

    #[test]
    fn test_dual_event_rises_then_decays_within_unit_interval() {
        let k = Kinetics::DualExponential {
            tau_rise_ms: 0.33,
            tau_decay_ms: 50.0,
            alpha_per_ms: 1.0,
        };
        let mut g = GatingState::default();
        g.on_event(&k, 5.0);
        assert_eq!(g.s, 0.0);

        let mut peak = 0.0f64;
        for _ in 0..5000 {
            g.advance(&k, 0.1);
            assert!((0.0..=1.0).contains(&g.s));
            peak = peak.max(g.s);
        }
        assert!(peak > 0.1);
        assert!(g.s < peak);
    }

    #[test]
    fn test_single_event_increments_s() {
        let k = Kinetics::SingleExponential { tau_decay_ms: 5.0 };
        let mut g = GatingState::default();
        g.on_event(&k, 0.4);
        assert_eq!(g.s, 0.4);
    }

    #[test]
    fn test_validation() {
        assert!(Kinetics::SingleExponential { tau_decay_ms: 1.0 }
            .validate()
            .is_ok());
        assert!(Kinetics::SingleExponential { tau_decay_ms: 0.0 }
            .validate()
            .is_err());
        assert!(Kinetics::DualExponential {
            tau_rise_ms: 1.0,
            tau_decay_ms: 2.0,
            alpha_per_ms: -1.0
        }
        .validate()
        .is_err());
    }
}
