// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cell-wide parameter set and per-compartment state construction

use crate::firing::SpikeParams;
use crate::models::{
    AdaptationParams, Compartment, DendriteModel, ModelParameters, PassiveParams, SomaModel,
};
use crate::synapse::SynapticParams;
use crate::topology::Tree;
use crate::types::{NeuralError, Result};

/// Every electrical parameter of the cell; geometry lives in the [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellParameters {
    pub soma_passive: PassiveParams,
    pub dendrite_passive: PassiveParams,
    pub synapses: SynapticParams,
    pub adaptation: AdaptationParams,
    pub spike: SpikeParams,
}

impl Default for CellParameters {
    fn default() -> Self {
        Self {
            soma_passive: PassiveParams::SOMA,
            dendrite_passive: PassiveParams::DENDRITE,
            synapses: SynapticParams::default(),
            adaptation: AdaptationParams::default(),
            spike: SpikeParams::default(),
        }
    }
}

fn prefixed(prefix: &str, err: NeuralError) -> NeuralError {
    match err {
        NeuralError::InvalidConfiguration { field, reason } => NeuralError::InvalidConfiguration {
            field: format!("{prefix}.{field}"),
            reason,
        },
        other => other,
    }
}

impl ModelParameters for CellParameters {
    fn validate(&self) -> Result<()> {
        self.soma_passive
            .validate()
            .map_err(|e| prefixed("passive.soma", e))?;
        self.dendrite_passive
            .validate()
            .map_err(|e| prefixed("passive.dendrite", e))?;
        self.synapses.validate()?;
        self.adaptation.validate()?;
        self.spike.validate()
    }
}

/// Instantiate the resting state of every compartment of `tree`.
///
/// The root becomes a [`Compartment::Root`], every other node a
/// [`Compartment::Branch`]; each starts at its own leak reversal with all
/// gating variables and the adaptation current at zero.
pub fn build_compartments(tree: &Tree, params: &CellParameters) -> Result<Vec<Compartment>> {
    params.validate()?;
    let syn = &params.synapses;
    Ok(tree
        .ids()
        .map(|id| {
            let area = tree.area_um2(id);
            if id == tree.root() {
                Compartment::Root(SomaModel::at_rest(
                    params.soma_passive.for_area(area),
                    syn.gaba_soma,
                    params.adaptation,
                ))
            } else {
                Compartment::Branch(DendriteModel::at_rest(
                    params.dendrite_passive.for_area(area),
                    syn.nmda,
                    syn.ampa,
                    syn.gaba_dendrite,
                    syn.mg_block,
                ))
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CurrentContribution;
    use crate::topology::BranchedTree;

    #[test]
    fn test_reference_cell_kinds() {
        let tree = Tree::build(&BranchedTree::default().to_spec()).unwrap();
        let cell = build_compartments(&tree, &CellParameters::default()).unwrap();
        assert_eq!(cell.len(), 22);
        assert!(cell[0].as_root().is_some());
        assert!(cell[1..].iter().all(|c| c.as_root().is_none()));
        assert_eq!(cell[0].voltage(), -87.0);
        assert!(cell[1..].iter().all(|c| c.voltage() == -82.0));

        // ~117 pF of dendritic membrane against ~6.8 pF of soma
        let dendritic_pf: f64 = cell[1..].iter().map(|c| c.capacitance_pf()).sum();
        assert!((dendritic_pf - 117.3).abs() < 0.5, "{dendritic_pf}");
    }

    #[test]
    fn test_invalid_passive_is_prefixed() {
        let tree = Tree::build(&BranchedTree::default().to_spec()).unwrap();
        let mut params = CellParameters::default();
        params.dendrite_passive.cm_uf_per_cm2 = 0.0;
        match build_compartments(&tree, &params) {
            Err(NeuralError::InvalidConfiguration { field, .. }) => {
                assert_eq!(field, "passive.dendrite.cm_uf_per_cm2")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
