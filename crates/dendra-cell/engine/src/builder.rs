// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Simulation Builder
//!
//! Collects morphology, parameters, clock settings, probes and the stimulus
//! protocol, then assembles one independent [`Simulation`]. Probe strings and
//! stimulus targets are resolved against the tree only in [`build`], so every
//! addressing error surfaces in one place.
//!
//! [`build`]: SimulationBuilder::build

use dendra_cell_neural::{
    AdaptationParams, BranchedTree, CellParameters, Geometry, Kinetics, MgBlock, MorphologySpec,
    PassiveParams, ReceptorParams, SpikeParams, SynapticParams, Tree,
};
use dendra_config::{validate_config, DendraConfig, MembraneConfig, ReceptorConfig, SegmentConfig};
use tracing::warn;

use crate::error::SimulationResult;
use crate::integrator::IntegrationScheme;
use crate::simulation::Simulation;

#[derive(Debug, Clone, PartialEq)]
struct PendingStimulus {
    compartment: String,
    amplitude_pa: f64,
    start_ms: f64,
    end_ms: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    morphology: MorphologySpec,
    parameters: CellParameters,
    dt_ms: f64,
    duration_ms: f64,
    scheme: IntegrationScheme,
    decimation: u32,
    probes: Vec<String>,
    all_voltages: bool,
    stimuli: Vec<PendingStimulus>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self {
            morphology: BranchedTree::default().to_spec(),
            parameters: CellParameters::default(),
            dt_ms: 0.1,
            duration_ms: 1500.0,
            scheme: IntegrationScheme::default(),
            decimation: 1,
            probes: Vec::new(),
            all_voltages: false,
            stimuli: Vec::new(),
        }
    }
}

impl SimulationBuilder {
    /// Reference cell, Δt 0.1 ms, backward Euler, nothing recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder equivalent of a validated [`DendraConfig`]
    pub fn from_config(config: &DendraConfig) -> SimulationResult<Self> {
        validate_config(config)?;

        let m = &config.morphology;
        let morphology = BranchedTree {
            soma: geometry(&m.soma),
            proximal: geometry(&m.proximal),
            medial: geometry(&m.medial),
            distal: geometry(&m.distal),
            branches: m.branches,
            medial_per_branch: m.medial_per_branch,
            tips_per_medial: m.tips_per_medial,
            bulk_resistivity_ohm_cm: m.bulk_resistivity_ohm_cm,
        };

        let s = &config.synapses;
        let parameters = CellParameters {
            soma_passive: passive(&config.passive.soma),
            dendrite_passive: passive(&config.passive.dendrite),
            synapses: SynapticParams {
                nmda: receptor(&s.nmda),
                ampa: receptor(&s.ampa),
                gaba_soma: receptor(&s.gaba_soma),
                gaba_dendrite: receptor(&s.gaba_dendrite),
                mg_block: MgBlock {
                    eta_per_mm: s.mg_block.eta_per_mm,
                    mg_mm: s.mg_block.mg_mm,
                    gamma_per_mv: s.mg_block.gamma_per_mv,
                },
            },
            adaptation: AdaptationParams {
                tau_ms: config.adaptation.tau_ms,
                g_ns: config.adaptation.g_ns,
                kick_pa: config.adaptation.kick_pa,
            },
            spike: SpikeParams {
                threshold_mv: config.spike.threshold_mv,
                reset_mv: config.spike.reset_mv,
                refractory_ms: config.spike.refractory_ms,
                clamp_during_refractory: config.spike.clamp_during_refractory,
            },
        };

        let sim = &config.simulation;
        let mut builder = Self::new()
            .branched(&morphology)
            .parameters(parameters)
            .dt_ms(sim.dt_ms)
            .duration_ms(sim.duration_ms)
            .scheme(sim.scheme.parse()?)
            .decimation(sim.decimation);
        for probe in &sim.record {
            builder = builder.record(probe.as_str());
        }
        for stimulus in &config.stimulus {
            builder = builder.stimulus(
                stimulus.compartment.as_str(),
                stimulus.amplitude_pa,
                stimulus.start_ms,
                stimulus.end_ms,
            );
        }
        Ok(builder)
    }

    pub fn morphology(mut self, spec: MorphologySpec) -> Self {
        self.morphology = spec;
        self
    }

    pub fn branched(self, pattern: &BranchedTree) -> Self {
        self.morphology(pattern.to_spec())
    }

    pub fn parameters(mut self, parameters: CellParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn dt_ms(mut self, dt_ms: f64) -> Self {
        self.dt_ms = dt_ms;
        self
    }

    /// Length of [`Simulation::run`]
    pub fn duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn scheme(mut self, scheme: IntegrationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn decimation(mut self, decimation: u32) -> Self {
        self.decimation = decimation;
        self
    }

    /// Record `"<compartment>.<variable>"`
    pub fn record(mut self, probe: impl Into<String>) -> Self {
        self.probes.push(probe.into());
        self
    }

    pub fn record_all_voltages(mut self) -> Self {
        self.all_voltages = true;
        self
    }

    /// Inject `amplitude_pa` into `compartment` over `[start_ms, end_ms)`
    pub fn stimulus(
        mut self,
        compartment: impl Into<String>,
        amplitude_pa: f64,
        start_ms: f64,
        end_ms: f64,
    ) -> Self {
        self.stimuli.push(PendingStimulus {
            compartment: compartment.into(),
            amplitude_pa,
            start_ms,
            end_ms,
        });
        self
    }

    /// Drop every stimulus added so far, including those from a config
    pub fn clear_stimuli(mut self) -> Self {
        self.stimuli.clear();
        self
    }

    pub fn build(self) -> SimulationResult<Simulation> {
        let tree = Tree::build(&self.morphology)?;
        let mut simulation = Simulation::assemble(
            tree,
            self.parameters,
            self.scheme,
            self.dt_ms,
            self.duration_ms,
            self.decimation,
        )?;

        if self.all_voltages {
            simulation.record_all_voltages()?;
        }
        for probe in &self.probes {
            simulation.record(probe)?;
        }
        for s in &self.stimuli {
            simulation.set_injected_current(&s.compartment, s.amplitude_pa, s.start_ms, s.end_ms)?;
        }

        if self.scheme == IntegrationScheme::ForwardEuler {
            let bound = simulation.explicit_stability_bound_ms();
            if self.dt_ms > bound {
                warn!(
                    dt_ms = self.dt_ms,
                    bound_ms = bound,
                    "[SIMULATION] forward Euler step exceeds the explicit stability bound"
                );
            }
        }
        Ok(simulation)
    }
}

fn geometry(segment: &SegmentConfig) -> Geometry {
    Geometry::new(segment.length_um, segment.diameter_um)
}

fn passive(membrane: &MembraneConfig) -> PassiveParams {
    PassiveParams {
        cm_uf_per_cm2: membrane.cm_uf_per_cm2,
        g_leak_s_per_cm2: membrane.g_leak_s_per_cm2,
        e_leak_mv: membrane.e_leak_mv,
    }
}

fn receptor(config: &ReceptorConfig) -> ReceptorParams {
    let kinetics = match config.tau_rise_ms {
        Some(tau_rise_ms) => Kinetics::DualExponential {
            tau_rise_ms,
            tau_decay_ms: config.tau_decay_ms,
            alpha_per_ms: config.alpha_per_ms,
        },
        None => Kinetics::SingleExponential {
            tau_decay_ms: config.tau_decay_ms,
        },
    };
    ReceptorParams {
        g_max_ns: config.g_max_ns,
        e_rev_mv: config.e_rev_mv,
        kinetics,
    }
}
