// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Integration Tests: Spike Reset and Refractoriness
//!
//! Drives the reference cell well above threshold and checks every recorded
//! spike against the reset/refractory contract.

use dendra_cell_engine::{IntegrationScheme, Simulation};
use dendra_cell_neural::{CellParameters, SpikeState};

const REFRACTORY_MS: f64 = 20.0;
const RESET_MV: f64 = -74.0;
const KICK_PA: f64 = 45.0;

fn driven(scheme: IntegrationScheme, dt_ms: f64) -> Simulation {
    Simulation::builder()
        .scheme(scheme)
        .dt_ms(dt_ms)
        .record("soma.v")
        .record("soma.i_ahp")
        .stimulus("soma", 200.0, 0.0, 500.0)
        .build()
        .unwrap()
}

#[test]
fn test_reset_and_kick_on_every_spike() {
    let mut sim = driven(IntegrationScheme::BackwardEuler, 0.1);
    let summary = sim.run_for(500.0).unwrap();
    assert!(summary.spikes >= 3, "only {} spikes", summary.spikes);

    let v = sim.recorder().trace("soma.v").unwrap();
    let ahp = sim.recorder().trace("soma.i_ahp").unwrap();
    for event in sim.recorder().spikes() {
        let idx = event.step as usize;
        assert_eq!(v.times()[idx], event.time_ms);
        assert_eq!(v.values()[idx], RESET_MV);
        assert!((event.adaptation_after_pa - event.adaptation_before_pa - KICK_PA).abs() < 1e-9);
        assert_eq!(ahp.values()[idx], event.adaptation_after_pa);
    }
}

#[test]
fn test_refractory_exclusivity() {
    for (scheme, dt) in [
        (IntegrationScheme::BackwardEuler, 0.1),
        (IntegrationScheme::BackwardEuler, 0.3),
        (IntegrationScheme::ForwardEuler, 0.02),
    ] {
        let mut sim = driven(scheme, dt);
        sim.run_for(500.0).unwrap();
        let times: Vec<f64> = sim.recorder().spike_times().collect();
        assert!(times.len() >= 2, "{scheme} dt={dt}: {times:?}");
        for pair in times.windows(2) {
            assert!(
                pair[1] - pair[0] >= REFRACTORY_MS - 1e-9,
                "{scheme} dt={dt}: spikes at {} and {}",
                pair[0],
                pair[1]
            );
        }
    }
}

#[test]
fn test_voltage_held_at_reset_while_refractory() {
    let mut sim = driven(IntegrationScheme::BackwardEuler, 0.1);
    sim.run_for(500.0).unwrap();

    let v = sim.recorder().trace("soma.v").unwrap();
    let first = sim.recorder().spikes()[0];
    let refractory_steps = (REFRACTORY_MS / 0.1).round() as usize;
    let start = first.step as usize;
    assert!(v.values()[start..start + refractory_steps]
        .iter()
        .all(|&value| value == RESET_MV));
}

#[test]
fn test_detector_state_transitions() {
    let mut sim = driven(IntegrationScheme::BackwardEuler, 0.1);
    assert_eq!(sim.spike_state(), SpikeState::Resting);

    let mut spike = None;
    while spike.is_none() {
        spike = sim.step().unwrap();
    }
    let step = spike.unwrap().step;
    assert_eq!(
        sim.spike_state(),
        SpikeState::Refractory {
            since_step: step,
            until_step: step + 200,
        }
    );

    sim.run_for(REFRACTORY_MS).unwrap();
    assert_eq!(sim.step_index(), step + 200);
    assert_eq!(sim.spike_state(), SpikeState::Resting);
}

#[test]
fn test_unclamped_refractory_still_spaces_spikes() {
    let mut params = CellParameters::default();
    params.spike.clamp_during_refractory = false;
    let mut sim = Simulation::builder()
        .parameters(params)
        .record("soma.v")
        .stimulus("soma", 200.0, 0.0, 500.0)
        .build()
        .unwrap();
    sim.run_for(500.0).unwrap();

    let times: Vec<f64> = sim.recorder().spike_times().collect();
    assert!(!times.is_empty());
    assert!(times
        .windows(2)
        .all(|pair| pair[1] - pair[0] >= REFRACTORY_MS - 1e-9));
}
