// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Simulation Context
//!
//! One independent run of one cell. Owns the tree, compartment states,
//! integrator, spike detector, stimulus injector, recorder and clock; nothing
//! is shared between two `Simulation` values, so independent runs can be
//! driven from separate threads.
//!
//! ## Step order
//! ```text
//! stimulus(t) → gating → voltage solve → adaptation → divergence check
//!            → clock t+Δt → spike detector → recorder
//! ```

use dendra_cell_neural::{
    build_compartments, CellParameters, Compartment, CompartmentId, CurrentContribution, Receptor,
    SpikeDetector, SpikeEvent, SpikeState, Tree,
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::builder::SimulationBuilder;
use crate::clock::SimulationClock;
use crate::error::{SimulationError, SimulationResult};
use crate::integrator::{Divergence, IntegrationScheme, Integrator};
use crate::recorder::{Probe, Recorder, Trace};
use crate::stimulus::StimulusInjector;
use dendra_config::DendraConfig;

/// Outcome of one call to a `run_*` method
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    /// Steps actually integrated
    pub steps: u64,
    /// Spikes detected during those steps
    pub spikes: usize,
    /// Stopped early by the caller's predicate
    pub cancelled: bool,
    pub end_time_ms: f64,
}

/// Everything a finished run recorded
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResults {
    pub dt_ms: f64,
    pub scheme: IntegrationScheme,
    pub steps: u64,
    pub end_time_ms: f64,
    pub traces: Vec<Trace>,
    pub spikes: Vec<SpikeEvent>,
}

impl SimulationResults {
    pub fn trace(&self, label: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.label() == label)
    }

    pub fn spike_times(&self) -> Vec<f64> {
        self.spikes.iter().map(|s| s.time_ms).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    tree: Tree,
    params: CellParameters,
    compartments: Vec<Compartment>,
    integrator: Integrator,
    detector: SpikeDetector,
    stimulus: StimulusInjector,
    recorder: Recorder,
    clock: SimulationClock,
    duration_ms: f64,
    halted_at: Option<u64>,
    initial_sampled: bool,
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    /// Validate `config` and build the run it describes
    pub fn from_config(config: &DendraConfig) -> SimulationResult<Self> {
        SimulationBuilder::from_config(config)?.build()
    }

    pub(crate) fn assemble(
        tree: Tree,
        params: CellParameters,
        scheme: IntegrationScheme,
        dt_ms: f64,
        duration_ms: f64,
        decimation: u32,
    ) -> SimulationResult<Self> {
        let clock = SimulationClock::new(dt_ms)?;
        if !(duration_ms.is_finite() && duration_ms >= 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "simulation.duration_ms must be non-negative, got {duration_ms}"
            )));
        }
        let compartments = build_compartments(&tree, &params)?;
        let detector = SpikeDetector::new(params.spike, dt_ms)?;

        debug!(
            compartments = tree.len(),
            dt_ms,
            scheme = %scheme,
            refractory_steps = detector.refractory_steps(),
            "[SIMULATION] assembled"
        );

        Ok(Self {
            integrator: Integrator::new(&tree, scheme, dt_ms),
            stimulus: StimulusInjector::new(tree.len()),
            recorder: Recorder::new(decimation)?,
            tree,
            params,
            compartments,
            detector,
            clock,
            duration_ms,
            halted_at: None,
            initial_sampled: false,
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn parameters(&self) -> &CellParameters {
        &self.params
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn compartment(&self, name: &str) -> SimulationResult<&Compartment> {
        let id = self.tree.id(name)?;
        Ok(&self.compartments[id.index()])
    }

    pub fn voltage(&self, name: &str) -> SimulationResult<f64> {
        Ok(self.compartment(name)?.voltage())
    }

    /// The root compartment's voltage
    pub fn soma_voltage(&self) -> f64 {
        self.compartments[self.tree.root().index()].voltage()
    }

    pub fn time_ms(&self) -> f64 {
        self.clock.time_ms()
    }

    pub fn step_index(&self) -> u64 {
        self.clock.step()
    }

    pub fn dt_ms(&self) -> f64 {
        self.clock.dt_ms()
    }

    /// Configured length of [`run`](Self::run)
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn scheme(&self) -> IntegrationScheme {
        self.integrator.scheme()
    }

    pub fn spike_state(&self) -> SpikeState {
        self.detector.state()
    }

    pub fn is_halted(&self) -> bool {
        self.halted_at.is_some()
    }

    pub fn explicit_stability_bound_ms(&self) -> f64 {
        self.integrator.explicit_stability_bound_ms(&self.compartments)
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Register a probe such as `"soma.v"` or `"dend01.s_nmda"`.
    ///
    /// Probes must be registered before the first step so that every trace
    /// starts at the same sample.
    pub fn record(&mut self, probe: &str) -> SimulationResult<usize> {
        let probe: Probe = probe.parse()?;
        self.register(probe)
    }

    /// Record `v` of every compartment
    pub fn record_all_voltages(&mut self) -> SimulationResult<()> {
        let names: Vec<String> = self
            .tree
            .ids()
            .map(|id| self.tree.name(id).to_string())
            .collect();
        for name in names {
            self.register(Probe::voltage(name))?;
        }
        Ok(())
    }

    fn register(&mut self, probe: Probe) -> SimulationResult<usize> {
        if self.initial_sampled {
            return Err(SimulationError::InvalidConfiguration(format!(
                "probe '{probe}' registered after recording started"
            )));
        }
        self.recorder.register(&self.tree, &self.compartments, probe)
    }

    /// Inject `amplitude_pa` into `compartment` while `start_ms <= t < end_ms`.
    /// Overlapping windows add.
    pub fn set_injected_current(
        &mut self,
        compartment: &str,
        amplitude_pa: f64,
        start_ms: f64,
        end_ms: f64,
    ) -> SimulationResult<()> {
        let id = self.tree.id(compartment)?;
        self.stimulus
            .set_injected_current(id, amplitude_pa, start_ms, end_ms)
    }

    pub fn stimulus(&self) -> &StimulusInjector {
        &self.stimulus
    }

    /// Presynaptic event of `weight` onto `receptor` of `compartment`.
    ///
    /// Never called by the engine itself; the gating variables otherwise only
    /// decay.
    pub fn deliver_synaptic_event(
        &mut self,
        compartment: &str,
        receptor: Receptor,
        weight: f64,
    ) -> SimulationResult<()> {
        let id = self.tree.id(compartment)?;
        self.compartments[id.index()].deliver_event(compartment, receptor, weight)?;
        Ok(())
    }

    /// Overwrite the bound fraction of `receptor` on `compartment`
    pub fn set_gating(
        &mut self,
        compartment: &str,
        receptor: Receptor,
        value: f64,
    ) -> SimulationResult<()> {
        let id = self.tree.id(compartment)?;
        self.compartments[id.index()].set_gating(compartment, receptor, value)?;
        Ok(())
    }

    fn sample_initial(&mut self) {
        if !self.initial_sampled {
            self.recorder
                .sample(self.clock.step(), self.clock.time_ms(), &self.compartments);
            self.initial_sampled = true;
        }
    }

    fn divergence_error(&mut self, step: u64, divergence: Divergence) -> SimulationError {
        self.halted_at = Some(step);
        let compartment = self.tree.name(divergence.compartment).to_string();
        error!(
            step,
            compartment = %compartment,
            voltage_mv = divergence.voltage_mv,
            "[SIMULATION] numerical divergence, run halted"
        );
        SimulationError::NumericalDivergence {
            step,
            compartment,
            voltage_mv: divergence.voltage_mv,
        }
    }

    /// Advance by one Δt. Returns the spike detected at the new time, if any.
    ///
    /// # Errors
    ///
    /// `NumericalDivergence` when a voltage leaves the sane range; every call
    /// after that fails with `Halted`.
    pub fn step(&mut self) -> SimulationResult<Option<SpikeEvent>> {
        if let Some(step) = self.halted_at {
            return Err(SimulationError::Halted { step });
        }
        self.sample_initial();

        self.stimulus
            .apply(self.clock.time_ms(), &mut self.compartments);
        if let Err(divergence) = self.integrator.step(&mut self.compartments) {
            return Err(self.divergence_error(self.clock.step() + 1, divergence));
        }
        self.clock.advance();

        let (step, time_ms) = (self.clock.step(), self.clock.time_ms());
        let root = self.tree.root().index();
        let spike = self.compartments[root]
            .as_root_mut()
            .and_then(|soma| self.detector.observe(step, time_ms, soma));
        if let Some(event) = spike {
            debug!(
                step,
                time_ms,
                i_ahp_pa = event.adaptation_after_pa,
                "[SIMULATION] spike"
            );
            self.recorder.record_spike(event);
        }

        self.recorder.sample(step, time_ms, &self.compartments);
        Ok(spike)
    }

    /// Integrate the configured duration from the present time
    pub fn run(&mut self) -> SimulationResult<RunSummary> {
        self.run_for(self.duration_ms)
    }

    /// Integrate `duration_ms` more (rounded up to whole steps)
    pub fn run_for(&mut self, duration_ms: f64) -> SimulationResult<RunSummary> {
        self.run_with(duration_ms, |_| true)
    }

    /// Integrate until the clock reaches `t_ms`; a no-op when already past it
    pub fn run_until(&mut self, t_ms: f64) -> SimulationResult<RunSummary> {
        let target = self.clock.steps_for(t_ms);
        let remaining = target.saturating_sub(self.clock.step());
        self.run_steps(remaining, |_| true)
    }

    /// Integrate `duration_ms` more, asking `should_continue` before every
    /// step. Returning `false` stops at that step boundary; everything
    /// recorded so far stays valid.
    pub fn run_with<F>(&mut self, duration_ms: f64, should_continue: F) -> SimulationResult<RunSummary>
    where
        F: FnMut(&Simulation) -> bool,
    {
        let steps = self.clock.steps_for(duration_ms);
        self.run_steps(steps, should_continue)
    }

    fn run_steps<F>(&mut self, steps: u64, mut should_continue: F) -> SimulationResult<RunSummary>
    where
        F: FnMut(&Simulation) -> bool,
    {
        if let Some(step) = self.halted_at {
            return Err(SimulationError::Halted { step });
        }
        self.sample_initial();

        info!(
            from_ms = self.clock.time_ms(),
            steps,
            dt_ms = self.clock.dt_ms(),
            scheme = %self.integrator.scheme(),
            "[SIMULATION] run started"
        );

        let mut summary = RunSummary {
            steps: 0,
            spikes: 0,
            cancelled: false,
            end_time_ms: self.clock.time_ms(),
        };
        for _ in 0..steps {
            if !should_continue(self) {
                summary.cancelled = true;
                break;
            }
            if self.step()?.is_some() {
                summary.spikes += 1;
            }
            summary.steps += 1;
        }
        summary.end_time_ms = self.clock.time_ms();

        info!(
            steps = summary.steps,
            spikes = summary.spikes,
            cancelled = summary.cancelled,
            end_ms = summary.end_time_ms,
            total_spikes = self.recorder.spike_count(),
            "[SIMULATION] run finished"
        );
        Ok(summary)
    }

    /// Jump to the equilibrium of the inputs active at the present time:
    /// gating frozen, adaptation at its steady state.
    pub fn equilibrium(&mut self) -> SimulationResult<()> {
        if let Some(step) = self.halted_at {
            return Err(SimulationError::Halted { step });
        }
        self.stimulus
            .apply(self.clock.time_ms(), &mut self.compartments);
        if let Err(divergence) = self
            .integrator
            .relax_to_steady_state(&mut self.compartments)
        {
            return Err(self.divergence_error(self.clock.step(), divergence));
        }
        debug!(
            soma_mv = self.soma_voltage(),
            "[SIMULATION] moved to equilibrium"
        );
        Ok(())
    }

    /// Fresh start on the same tree: resting state, clock at zero, empty
    /// traces and spike record. Probes and the stimulus protocol are kept.
    pub fn reset_to_rest(&mut self) -> SimulationResult<()> {
        self.compartments = build_compartments(&self.tree, &self.params)?;
        self.detector.reset();
        self.clock.reset();
        self.recorder.clear();
        self.halted_at = None;
        self.initial_sampled = false;
        Ok(())
    }

    pub fn into_results(self) -> SimulationResults {
        let (dt_ms, steps, end_time_ms) =
            (self.clock.dt_ms(), self.clock.step(), self.clock.time_ms());
        let scheme = self.integrator.scheme();
        let (traces, spikes) = self.recorder.into_parts();
        SimulationResults {
            dt_ms,
            scheme,
            steps,
            end_time_ms,
            traces,
            spikes,
        }
    }

    /// Root compartment id, for callers addressing by id
    pub fn root(&self) -> CompartmentId {
        self.tree.root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendra_cell_neural::{NeuralError, Variable};

    fn reference() -> Simulation {
        Simulation::builder()
            .record("soma.v")
            .build()
            .unwrap()
    }

    #[test]
    fn test_step_samples_initial_state_then_every_step() {
        let mut sim = reference();
        sim.step().unwrap();
        sim.step().unwrap();
        let trace = sim.recorder().trace("soma.v").unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.times()[0], 0.0);
        assert_eq!(trace.values()[0], -87.0);
        assert!((trace.times()[2] - 0.2).abs() < 1e-12);
        assert_eq!(sim.step_index(), 2);
    }

    #[test]
    fn test_probe_registration_closes_at_first_step() {
        let mut sim = reference();
        sim.step().unwrap();
        assert!(matches!(
            sim.record("dend0.v"),
            Err(SimulationError::InvalidConfiguration(_))
        ));
        sim.reset_to_rest().unwrap();
        assert!(sim.record("dend0.v").is_ok());
    }

    #[test]
    fn test_run_until_lands_on_grid() {
        let mut sim = reference();
        let summary = sim.run_until(5.0).unwrap();
        assert_eq!(summary.steps, 50);
        assert_eq!(sim.step_index(), 50);
        assert_eq!(sim.run_until(2.0).unwrap().steps, 0);
    }

    #[test]
    fn test_cancellation_keeps_partial_results() {
        let mut sim = reference();
        let summary = sim
            .run_with(100.0, |s| s.time_ms() < 10.0 - 1e-9)
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.steps, 100);
        assert_eq!(sim.recorder().trace("soma.v").unwrap().len(), 101);

        // the run can resume afterwards
        let rest = sim.run_for(1.0).unwrap();
        assert_eq!(rest.steps, 10);
        assert!(!rest.cancelled);
    }

    #[test]
    fn test_synaptic_event_depolarises_dendrite() {
        let build = || {
            Simulation::builder()
                .record("dend0.v")
                .record("dend0.s_ampa")
                .build()
                .unwrap()
        };
        let mut quiet = build();
        let mut driven = build();
        driven
            .deliver_synaptic_event("dend0", Receptor::Ampa, 1.0)
            .unwrap();
        quiet.run_for(2.0).unwrap();
        driven.run_for(2.0).unwrap();

        let s_ampa = driven.recorder().trace("dend0.s_ampa").unwrap();
        assert!(s_ampa.values().iter().any(|&s| s > 0.0));
        assert!(quiet
            .recorder()
            .trace("dend0.s_ampa")
            .unwrap()
            .values()
            .iter()
            .all(|&s| s == 0.0));
        assert!(driven.voltage("dend0").unwrap() > quiet.voltage("dend0").unwrap());
    }

    #[test]
    fn test_receptor_absent_on_root() {
        let mut sim = reference();
        assert!(matches!(
            sim.deliver_synaptic_event("soma", Receptor::Nmda, 1.0),
            Err(SimulationError::Neural(NeuralError::UnsupportedVariable { .. }))
        ));
        assert!(matches!(
            sim.set_gating("axon", Receptor::Gaba, 0.5),
            Err(SimulationError::Neural(NeuralError::UnknownCompartment(_)))
        ));
        sim.set_gating("soma", Receptor::Gaba, 0.5).unwrap();
        assert_eq!(
            sim.compartment("soma").unwrap().value(Variable::SGaba),
            Some(0.5)
        );
    }

    #[test]
    fn test_divergence_halts_run() {
        let mut sim = Simulation::builder()
            .scheme(IntegrationScheme::ForwardEuler)
            .dt_ms(5.0)
            .stimulus("soma", 100.0, 0.0, 1e6)
            .build()
            .unwrap();

        let err = sim.run_for(100_000.0).unwrap_err();
        let step = match err {
            SimulationError::NumericalDivergence { step, .. } => step,
            other => panic!("unexpected {other:?}"),
        };
        assert!(sim.is_halted());
        assert!(matches!(sim.step(), Err(SimulationError::Halted { step: s }) if s == step));
        assert!(matches!(sim.run_for(1.0), Err(SimulationError::Halted { .. })));

        sim.reset_to_rest().unwrap();
        assert!(!sim.is_halted());
    }

    #[test]
    fn test_into_results_serializes() {
        let mut sim = reference();
        sim.run_for(1.0).unwrap();
        let results = sim.into_results();
        assert_eq!(results.steps, 10);
        assert!(results.trace("soma.v").is_some());
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["scheme"], "backward_euler");
        assert_eq!(json["traces"][0]["label"], "soma.v");
        assert_eq!(json["traces"][0]["values"].as_array().unwrap().len(), 11);
    }
}
