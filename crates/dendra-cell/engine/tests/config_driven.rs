// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Integration Tests: Configuration-Driven Runs
//!
//! TOML file → `load_config` → `Simulation::from_config` → run.

use std::fs;

use dendra_cell_engine::{IntegrationScheme, Simulation, SimulationError};
use dendra_config::{load_config, DendraConfig, StimulusConfig};
use tempfile::tempdir;

#[test]
fn test_run_described_by_toml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dendra_configuration.toml");
    fs::write(
        &path,
        r#"
        [simulation]
        dt_ms = 0.05
        duration_ms = 40.0
        decimation = 4
        record = ["soma.v", "dend0.v", "soma.i_ahp"]

        [[stimulus]]
        compartment = "soma"
        amplitude_pa = -100.0
        start_ms = 10.0
        end_ms = 30.0
        "#,
    )
    .unwrap();

    let config = load_config(Some(&path), None).unwrap();
    let mut sim = Simulation::from_config(&config).unwrap();
    assert_eq!(sim.dt_ms(), 0.05);
    assert_eq!(sim.stimulus().windows().len(), 1);

    let summary = sim.run().unwrap();
    assert_eq!(summary.steps, 800);
    assert_eq!(summary.spikes, 0);

    let soma = sim.recorder().trace("soma.v").unwrap();
    assert_eq!(soma.len(), 201);
    let (_, at_rest) = soma.at_or_before(10.0).unwrap();
    let (_, during) = soma.at_or_before(29.9).unwrap();
    assert!(during < at_rest - 1.0, "{during} vs {at_rest}");
}

#[test]
fn test_forward_euler_from_config() {
    let mut config = DendraConfig::default();
    config.simulation.scheme = "forward_euler".to_string();
    config.simulation.dt_ms = 0.01;
    config.simulation.duration_ms = 5.0;
    let mut sim = Simulation::from_config(&config).unwrap();
    assert_eq!(sim.scheme(), IntegrationScheme::ForwardEuler);
    assert!(sim.dt_ms() < sim.explicit_stability_bound_ms());
    sim.run().unwrap();
}

#[test]
fn test_unknown_stimulus_target_fails_at_build() {
    let mut config = DendraConfig::default();
    config.stimulus.push(StimulusConfig {
        compartment: "axon".to_string(),
        amplitude_pa: 10.0,
        start_ms: 0.0,
        end_ms: 1.0,
    });
    assert!(matches!(
        Simulation::from_config(&config),
        Err(SimulationError::Neural(_))
    ));
}

#[test]
fn test_unsupported_probe_fails_at_build() {
    let mut config = DendraConfig::default();
    config.simulation.record = vec!["soma.s_nmda".to_string()];
    assert!(matches!(
        Simulation::from_config(&config),
        Err(SimulationError::Neural(_))
    ));

    config.simulation.record = vec!["soma.voltage".to_string()];
    assert!(matches!(
        Simulation::from_config(&config),
        Err(SimulationError::UnknownVariable { .. })
    ));
}
