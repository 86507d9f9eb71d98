// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Step-Response Analysis
//!
//! Post-hoc measures of a current-step run, computed from recorded traces
//! only:
//!
//! | Measure | Definition |
//! |---------|------------|
//! | peak deflection | extreme of V after `peak_from_ms` minus V just before onset |
//! | sag ratio | `(E_rest - V(t_ss)) / (E_rest - V_min)` |
//! | input resistance | `(E_rest - V(t_ss)) / -I` |
//!
//! Sag ratio and input resistance are only reported for hyperpolarising
//! steps.

use dendra_cell_engine::{Recorder, Simulation, SimulationBuilder, SimulationResult, Trace};
use dendra_config::DendraConfig;
use serde::Serialize;

const EDGE_EPSILON_MS: f64 = 1e-9;

/// Timing of a three-phase current step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepProtocol {
    pub amplitude_pa: f64,
    pub onset_ms: f64,
    pub offset_ms: f64,
    /// Start of the window searched for the peak deflection
    pub peak_from_ms: f64,
    /// Time at which the voltage is taken as steady state
    pub steady_state_ms: f64,
}

impl Default for StepProtocol {
    fn default() -> Self {
        Self {
            amplitude_pa: -100.0,
            onset_ms: 300.0,
            offset_ms: 1300.0,
            peak_from_ms: 1000.0,
            steady_state_ms: 1200.0,
        }
    }
}

/// A voltage trace label and the resting potential it is measured against
#[derive(Debug, Clone, Copy)]
pub struct RestingProbe<'a> {
    pub label: &'a str,
    pub rest_mv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResponse {
    pub amplitude_pa: f64,
    pub spike_count: usize,
    pub spike_times_ms: Vec<f64>,
    pub peak_deflection_mv: Option<f64>,
    pub sag_ratio: Option<f64>,
    pub input_resistance_mohm: Option<f64>,
    pub dendritic_input_resistance_mohm: Option<f64>,
}

impl StepResponse {
    pub fn from_recorder(
        recorder: &Recorder,
        protocol: &StepProtocol,
        soma: RestingProbe<'_>,
        dendrite: Option<RestingProbe<'_>>,
    ) -> SimulationResult<Self> {
        let soma_trace = recorder.trace(soma.label)?;
        let hyperpolarising = protocol.amplitude_pa < 0.0;

        let dendritic_input_resistance_mohm = match dendrite {
            Some(probe) if hyperpolarising => input_resistance_mohm(
                recorder.trace(probe.label)?,
                probe.rest_mv,
                protocol.steady_state_ms,
                protocol.amplitude_pa,
            ),
            _ => None,
        };

        Ok(Self {
            amplitude_pa: protocol.amplitude_pa,
            spike_count: recorder.spike_count(),
            spike_times_ms: recorder.spike_times().collect(),
            peak_deflection_mv: peak_deflection_mv(soma_trace, protocol, !hyperpolarising),
            sag_ratio: if hyperpolarising {
                sag_ratio(soma_trace, soma.rest_mv, protocol.steady_state_ms)
            } else {
                None
            },
            input_resistance_mohm: if hyperpolarising {
                input_resistance_mohm(
                    soma_trace,
                    soma.rest_mv,
                    protocol.steady_state_ms,
                    protocol.amplitude_pa,
                )
            } else {
                None
            },
            dendritic_input_resistance_mohm,
        })
    }
}

/// One sweep point built from `config`: its cell, clock and probes, with
/// the configured stimulus protocol replaced by the single step of
/// `protocol` into the soma. Also records `soma.v` and `<dendrite>.v`.
pub fn step_simulation(
    config: &DendraConfig,
    protocol: &StepProtocol,
    dendrite: &str,
) -> SimulationResult<Simulation> {
    SimulationBuilder::from_config(config)?
        .clear_stimuli()
        .record("soma.v")
        .record(format!("{dendrite}.v"))
        .stimulus("soma", protocol.amplitude_pa, protocol.onset_ms, protocol.offset_ms)
        .build()
}

/// Run [`step_simulation`] for the configured duration and measure it
/// against the leak reversals of `config`
pub fn run_step_protocol(
    config: &DendraConfig,
    protocol: &StepProtocol,
    dendrite: &str,
) -> SimulationResult<StepResponse> {
    let mut sim = step_simulation(config, protocol, dendrite)?;
    sim.run()?;

    let dendrite_label = format!("{dendrite}.v");
    StepResponse::from_recorder(
        sim.recorder(),
        protocol,
        RestingProbe {
            label: "soma.v",
            rest_mv: config.passive.soma.e_leak_mv,
        },
        Some(RestingProbe {
            label: &dendrite_label,
            rest_mv: config.passive.dendrite.e_leak_mv,
        }),
    )
}

/// Last sample strictly before `t_ms`
pub fn value_before(trace: &Trace, t_ms: f64) -> Option<f64> {
    trace
        .iter()
        .take_while(|&(t, _)| t < t_ms - EDGE_EPSILON_MS)
        .last()
        .map(|(_, v)| v)
}

/// Largest (`depolarising`) or smallest excursion after `peak_from_ms`,
/// relative to the sample just before onset
pub fn peak_deflection_mv(trace: &Trace, protocol: &StepProtocol, depolarising: bool) -> Option<f64> {
    let baseline = value_before(trace, protocol.onset_ms)?;
    let window = trace
        .iter()
        .filter(|&(t, _)| t >= protocol.peak_from_ms - EDGE_EPSILON_MS)
        .map(|(_, v)| v);
    let extreme = if depolarising {
        window.fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    } else {
        window.fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
    }?;
    Some(extreme - baseline)
}

/// `(E_rest - V(t_ss)) / (E_rest - V_min)`; `None` when the trace never
/// dips below rest
pub fn sag_ratio(trace: &Trace, rest_mv: f64, steady_state_ms: f64) -> Option<f64> {
    let (_, v_ss) = trace.at_or_before(steady_state_ms + EDGE_EPSILON_MS)?;
    let v_min = trace.values().iter().cloned().fold(f64::INFINITY, f64::min);
    let depth = rest_mv - v_min;
    (depth > 0.0).then(|| (rest_mv - v_ss) / depth)
}

/// `(E_rest - V(t_ss)) / -I` in MΩ
pub fn input_resistance_mohm(
    trace: &Trace,
    rest_mv: f64,
    steady_state_ms: f64,
    amplitude_pa: f64,
) -> Option<f64> {
    if amplitude_pa == 0.0 {
        return None;
    }
    let (_, v_ss) = trace.at_or_before(steady_state_ms + EDGE_EPSILON_MS)?;
    // mV / pA = GΩ
    Some((rest_mv - v_ss) / -amplitude_pa * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendra_config::StimulusConfig;

    fn short_protocol() -> StepProtocol {
        StepProtocol {
            amplitude_pa: -20.0,
            onset_ms: 20.0,
            offset_ms: 220.0,
            peak_from_ms: 20.0,
            steady_state_ms: 200.0,
        }
    }

    fn short_step(amplitude_pa: f64) -> (Simulation, StepProtocol) {
        let protocol = StepProtocol {
            amplitude_pa,
            ..short_protocol()
        };
        let mut sim = Simulation::builder()
            .record("soma.v")
            .record("dend00.v")
            .stimulus("soma", amplitude_pa, protocol.onset_ms, protocol.offset_ms)
            .build()
            .unwrap();
        sim.equilibrium().unwrap();
        sim.run_for(240.0).unwrap();
        (sim, protocol)
    }

    #[test]
    fn test_hyperpolarising_step_measures() {
        let (sim, protocol) = short_step(-20.0);
        let rest = sim.recorder().trace("soma.v").unwrap().values()[0];
        let dend_rest = sim.recorder().trace("dend00.v").unwrap().values()[0];
        let response = StepResponse::from_recorder(
            sim.recorder(),
            &protocol,
            RestingProbe { label: "soma.v", rest_mv: rest },
            Some(RestingProbe { label: "dend00.v", rest_mv: dend_rest }),
        )
        .unwrap();

        assert_eq!(response.spike_count, 0);
        assert!(response.peak_deflection_mv.unwrap() < 0.0);
        let sag = response.sag_ratio.unwrap();
        assert!(sag > 0.0 && sag <= 1.0, "sag = {sag}");
        let r_in = response.input_resistance_mohm.unwrap();
        assert!(r_in > 100.0 && r_in < 5000.0, "R_in = {r_in}");
        // the step enters at the soma, so the dendrite sees less of it
        let r_dend = response.dendritic_input_resistance_mohm.unwrap();
        assert!(r_dend > 0.0 && r_dend < r_in, "{r_dend} vs {r_in}");
    }

    #[test]
    fn test_depolarising_step_skips_hyperpolarising_measures() {
        let (sim, protocol) = short_step(5.0);
        let response = StepResponse::from_recorder(
            sim.recorder(),
            &protocol,
            RestingProbe { label: "soma.v", rest_mv: -87.0 },
            Some(RestingProbe { label: "dend00.v", rest_mv: -82.0 }),
        )
        .unwrap();
        assert!(response.peak_deflection_mv.unwrap() > 0.0);
        assert_eq!(response.sag_ratio, None);
        assert_eq!(response.input_resistance_mohm, None);
        assert_eq!(response.dendritic_input_resistance_mohm, None);
    }

    #[test]
    fn test_missing_trace_is_an_error() {
        let (sim, protocol) = short_step(-5.0);
        assert!(StepResponse::from_recorder(
            sim.recorder(),
            &protocol,
            RestingProbe { label: "dend0.v", rest_mv: -82.0 },
            None,
        )
        .is_err());
    }

    fn config_with_own_step() -> DendraConfig {
        let mut config = DendraConfig::default();
        config.simulation.duration_ms = 300.0;
        config.stimulus.push(StimulusConfig {
            compartment: "soma".to_string(),
            amplitude_pa: -100.0,
            start_ms: 20.0,
            end_ms: 220.0,
        });
        config
    }

    #[test]
    fn test_sweep_point_replaces_configured_stimulus() {
        let config = config_with_own_step();
        let protocol = StepProtocol {
            amplitude_pa: 200.0,
            ..short_protocol()
        };
        let sim = step_simulation(&config, &protocol, "dend00").unwrap();
        let windows = sim.stimulus().windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].amplitude_pa, 200.0);
        assert_eq!(sim.stimulus().current_at(sim.root(), 100.0), 200.0);
        assert!(sim.recorder().trace("dend00.v").is_ok());
    }

    #[test]
    fn test_sweep_point_matches_standalone_run() {
        let config = config_with_own_step();
        let protocol = StepProtocol {
            amplitude_pa: 200.0,
            ..short_protocol()
        };
        let response = run_step_protocol(&config, &protocol, "dend00").unwrap();

        let mut alone = Simulation::builder()
            .duration_ms(300.0)
            .stimulus("soma", 200.0, protocol.onset_ms, protocol.offset_ms)
            .build()
            .unwrap();
        alone.run().unwrap();
        assert!(response.spike_count > 0);
        assert_eq!(response.spike_count, alone.recorder().spike_count());
        assert_eq!(
            response.spike_times_ms,
            alone.recorder().spike_times().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_sweep_point_unknown_dendrite() {
        let config = DendraConfig::default();
        assert!(step_simulation(&config, &short_protocol(), "axon").is_err());
    }
}
