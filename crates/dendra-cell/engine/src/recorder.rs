// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Recorder
//!
//! Append-only time series of selected state variables plus the spike record.
//! Variables are addressed as `"<compartment>.<variable>"`, e.g. `soma.v`,
//! `dend01.s_nmda`. Sampling only reads compartment state.

use core::fmt;
use core::str::FromStr;

use ahash::AHashMap;
use dendra_cell_neural::{
    Compartment, CompartmentId, CurrentContribution, NeuralError, SpikeEvent, Tree, Variable,
};
use serde::Serialize;

use crate::error::{SimulationError, SimulationResult};

/// Address of one recorded variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Probe {
    pub compartment: String,
    pub variable: Variable,
}

impl Probe {
    pub fn new(compartment: impl Into<String>, variable: Variable) -> Self {
        Self {
            compartment: compartment.into(),
            variable,
        }
    }

    pub fn voltage(compartment: impl Into<String>) -> Self {
        Self::new(compartment, Variable::V)
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.compartment, self.variable)
    }
}

impl FromStr for Probe {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (compartment, variable) = s
            .rsplit_once('.')
            .filter(|(c, v)| !c.is_empty() && !v.is_empty())
            .ok_or_else(|| SimulationError::UnknownVariable {
                probe: s.to_string(),
                reason: "expected <compartment>.<variable>".to_string(),
            })?;
        let variable = variable
            .parse::<Variable>()
            .map_err(|reason| SimulationError::UnknownVariable {
                probe: s.to_string(),
                reason,
            })?;
        Ok(Probe::new(compartment, variable))
    }
}

/// Samples of one probe, aligned to the clock grid
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    label: String,
    #[serde(skip)]
    probe: Probe,
    #[serde(skip)]
    compartment: CompartmentId,
    times_ms: Vec<f64>,
    values: Vec<f64>,
}

impl Trace {
    fn new(probe: Probe, compartment: CompartmentId) -> Self {
        Self {
            label: probe.to_string(),
            probe,
            compartment,
            times_ms: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    pub fn compartment(&self) -> CompartmentId {
        self.compartment
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times_ms
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Lazy `(time_ms, value)` pairs in recording order
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times_ms.iter().copied().zip(self.values.iter().copied())
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.times_ms.last()?, *self.values.last()?))
    }

    /// Latest sample taken at or before `t_ms`
    pub fn at_or_before(&self, t_ms: f64) -> Option<(f64, f64)> {
        let idx = self.times_ms.partition_point(|&t| t <= t_ms);
        idx.checked_sub(1)
            .map(|i| (self.times_ms[i], self.values[i]))
    }

    fn clear(&mut self) {
        self.times_ms.clear();
        self.values.clear();
    }
}

#[derive(Debug, Clone)]
pub struct Recorder {
    decimation: u32,
    traces: Vec<Trace>,
    by_label: AHashMap<String, usize>,
    spikes: Vec<SpikeEvent>,
}

impl Recorder {
    pub fn new(decimation: u32) -> SimulationResult<Self> {
        if decimation == 0 {
            return Err(SimulationError::InvalidConfiguration(
                "simulation.decimation must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            decimation,
            traces: Vec::new(),
            by_label: AHashMap::new(),
            spikes: Vec::new(),
        })
    }

    pub fn decimation(&self) -> u32 {
        self.decimation
    }

    /// Register `probe`, checking that it exists on `tree`.
    /// Registering the same probe twice returns the existing trace index.
    pub fn register(
        &mut self,
        tree: &Tree,
        compartments: &[Compartment],
        probe: Probe,
    ) -> SimulationResult<usize> {
        let label = probe.to_string();
        if let Some(&index) = self.by_label.get(&label) {
            return Ok(index);
        }

        let id = tree.id(&probe.compartment)?;
        let compartment = &compartments[id.index()];
        if !compartment.supports(probe.variable) {
            return Err(NeuralError::UnsupportedVariable {
                compartment: probe.compartment.clone(),
                kind: compartment.kind_name(),
                variable: probe.variable.to_string(),
            }
            .into());
        }

        let index = self.traces.len();
        self.traces.push(Trace::new(probe, id));
        self.by_label.insert(label, index);
        Ok(index)
    }

    /// Take one sample of every trace if `step` is on the decimation grid
    pub fn sample(&mut self, step: u64, time_ms: f64, compartments: &[Compartment]) {
        if step % u64::from(self.decimation) != 0 {
            return;
        }
        for trace in &mut self.traces {
            let value = compartments[trace.compartment.index()]
                .value(trace.probe.variable)
                .unwrap_or(f64::NAN);
            trace.times_ms.push(time_ms);
            trace.values.push(value);
        }
    }

    pub fn record_spike(&mut self, event: SpikeEvent) {
        self.spikes.push(event);
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    /// Trace registered under `"<compartment>.<variable>"`
    pub fn trace(&self, label: &str) -> SimulationResult<&Trace> {
        self.by_label
            .get(label)
            .map(|&index| &self.traces[index])
            .ok_or_else(|| SimulationError::UnknownVariable {
                probe: label.to_string(),
                reason: "not registered for recording".to_string(),
            })
    }

    pub fn spikes(&self) -> &[SpikeEvent] {
        &self.spikes
    }

    pub fn spike_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.spikes.iter().map(|event| event.time_ms)
    }

    pub fn spike_count(&self) -> usize {
        self.spikes.len()
    }

    /// Drop every sample and spike; registered probes stay
    pub fn clear(&mut self) {
        self.traces.iter_mut().for_each(Trace::clear);
        self.spikes.clear();
    }

    pub(crate) fn into_parts(self) -> (Vec<Trace>, Vec<SpikeEvent>) {
        (self.traces, self.spikes)
    }
}
