// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Topology Model
//!
//! A rooted tree of named compartments. Every non-root compartment is joined
//! to its parent by an axial link whose resistance is derived from the
//! child's geometry and the bulk intracellular resistivity:
//!
//! ```text
//! R_axial = ρ · 4 · L / (π · d²)
//! ```
//!
//! The built [`Tree`] stores compartments in topological order (root first,
//! every parent before its children) so that solvers can sweep it as a flat
//! array.

use std::collections::VecDeque;

use ahash::AHashMap;

use crate::types::units::{axial_resistance_mohm, cylinder_area_um2};
use crate::types::{CompartmentId, NeuralError, Result};

/// Structural role of a compartment in the morphology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CompartmentRole {
    /// The soma; exactly one per tree
    Root,
    /// Dendritic segment with children
    Internal,
    /// Terminal dendritic segment
    DistalTip,
}

/// Cylinder dimensions in µm
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    pub length_um: f64,
    pub diameter_um: f64,
}

impl Geometry {
    pub const fn new(length_um: f64, diameter_um: f64) -> Self {
        Self {
            length_um,
            diameter_um,
        }
    }

    pub fn area_um2(&self) -> f64 {
        cylinder_area_um2(self.length_um, self.diameter_um)
    }
}

/// One compartment of a morphology description
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompartmentSpec {
    pub name: String,
    pub geometry: Geometry,
    pub role: CompartmentRole,
    /// Name of the parent compartment; `None` only for the root
    pub parent: Option<String>,
}

impl CompartmentSpec {
    pub fn root(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            role: CompartmentRole::Root,
            parent: None,
        }
    }

    pub fn child(
        name: impl Into<String>,
        geometry: Geometry,
        role: CompartmentRole,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            geometry,
            role,
            parent: Some(parent.into()),
        }
    }
}

/// Morphology description consumed by [`Tree::build`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MorphologySpec {
    pub compartments: Vec<CompartmentSpec>,
    /// Bulk intracellular resistivity (Ω·cm)
    pub bulk_resistivity_ohm_cm: f64,
}

/// Regular branching pattern: soma → proximal → medial → distal tips.
///
/// The default is the reference granule-cell layout: 3 main branches, each
/// splitting into 2 medial segments that each carry 2 distal tips
/// (3 × (1 + 2 + 4) = 21 dendritic compartments plus the soma).
#[derive(Debug, Clone, PartialEq)]
pub struct BranchedTree {
    pub soma: Geometry,
    pub proximal: Geometry,
    pub medial: Geometry,
    pub distal: Geometry,
    pub branches: usize,
    pub medial_per_branch: usize,
    pub tips_per_medial: usize,
    pub bulk_resistivity_ohm_cm: f64,
}

impl Default for BranchedTree {
    fn default() -> Self {
        Self {
            soma: Geometry::new(18.0, 12.0),
            proximal: Geometry::new(83.0, 1.0),
            medial: Geometry::new(83.0, 0.9),
            distal: Geometry::new(83.0, 0.8),
            branches: 3,
            medial_per_branch: 2,
            tips_per_medial: 2,
            bulk_resistivity_ohm_cm: 210.0,
        }
    }
}

impl BranchedTree {
    /// Expand the pattern into an explicit morphology.
    ///
    /// Names follow `dend{b}` for proximal segments, `dend{b}{m}` for medial
    /// segments and `dend{b}{m}{t}` (t starting at 1) for distal tips.
    pub fn to_spec(&self) -> MorphologySpec {
        let mut compartments = Vec::with_capacity(
            1 + self.branches * (1 + self.medial_per_branch * (1 + self.tips_per_medial)),
        );
        compartments.push(CompartmentSpec::root("soma", self.soma));

        for b in 0..self.branches {
            let proximal = format!("dend{b}");
            let proximal_role = if self.medial_per_branch == 0 {
                CompartmentRole::DistalTip
            } else {
                CompartmentRole::Internal
            };
            compartments.push(CompartmentSpec::child(
                proximal.clone(),
                self.proximal,
                proximal_role,
                "soma",
            ));

            for m in 0..self.medial_per_branch {
                let medial = format!("dend{b}{m}");
                let medial_role = if self.tips_per_medial == 0 {
                    CompartmentRole::DistalTip
                } else {
                    CompartmentRole::Internal
                };
                compartments.push(CompartmentSpec::child(
                    medial.clone(),
                    self.medial,
                    medial_role,
                    proximal.clone(),
                ));

                for t in 1..=self.tips_per_medial {
                    compartments.push(CompartmentSpec::child(
                        format!("dend{b}{m}{t}"),
                        self.distal,
                        CompartmentRole::DistalTip,
                        medial.clone(),
                    ));
                }
            }
        }

        MorphologySpec {
            compartments,
            bulk_resistivity_ohm_cm: self.bulk_resistivity_ohm_cm,
        }
    }
}

/// Directed edge child → parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxialLink {
    pub child: CompartmentId,
    pub parent: CompartmentId,
    pub resistance_mohm: f64,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    role: CompartmentRole,
    geometry: Geometry,
    area_um2: f64,
    parent: Option<CompartmentId>,
    /// Resistance of the link to the parent (MΩ)
    axial_resistance_mohm: Option<f64>,
    children: Vec<CompartmentId>,
}

/// Validated compartment tree in topological order
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    by_name: AHashMap<String, CompartmentId>,
}

impl Tree {
    /// Build a tree from a morphology description.
    ///
    /// # Errors
    ///
    /// - `MalformedTopology` on duplicate names, zero or several roots, a root
    ///   with a parent, a non-root without one, unknown parents, cycles, or a
    ///   distal tip that has children.
    /// - `InvalidConfiguration` on non-positive geometry or resistivity.
    pub fn build(spec: &MorphologySpec) -> Result<Tree> {
        let rho = spec.bulk_resistivity_ohm_cm;
        if !(rho.is_finite() && rho > 0.0) {
            return Err(NeuralError::invalid(
                "morphology.bulk_resistivity_ohm_cm",
                format!("must be positive, got {rho}"),
            ));
        }
        if spec.compartments.is_empty() {
            return Err(NeuralError::MalformedTopology(
                "morphology declares no compartments".to_string(),
            ));
        }

        let mut declared: AHashMap<&str, usize> = AHashMap::with_capacity(spec.compartments.len());
        for (i, c) in spec.compartments.iter().enumerate() {
            if declared.insert(c.name.as_str(), i).is_some() {
                return Err(NeuralError::MalformedTopology(format!(
                    "duplicate compartment name '{}'",
                    c.name
                )));
            }
            for (what, value) in [
                ("length_um", c.geometry.length_um),
                ("diameter_um", c.geometry.diameter_um),
            ] {
                if !(value.is_finite() && value > 0.0) {
                    return Err(NeuralError::invalid(
                        format!("compartment '{}' {}", c.name, what),
                        format!("must be positive, got {value}"),
                    ));
                }
            }
        }

        let roots: Vec<&CompartmentSpec> = spec
            .compartments
            .iter()
            .filter(|c| c.role == CompartmentRole::Root)
            .collect();
        let root = match roots.as_slice() {
            [] => {
                return Err(NeuralError::MalformedTopology(
                    "no root compartment declared".to_string(),
                ))
            }
            [root] => *root,
            many => {
                let names: Vec<&str> = many.iter().map(|c| c.name.as_str()).collect();
                return Err(NeuralError::MalformedTopology(format!(
                    "more than one root declared: {}",
                    names.join(", ")
                )));
            }
        };
        if let Some(parent) = &root.parent {
            return Err(NeuralError::MalformedTopology(format!(
                "root '{}' must not have a parent (got '{}')",
                root.name, parent
            )));
        }

        // Declaration-order child lists
        let mut declared_children: Vec<Vec<usize>> = vec![Vec::new(); spec.compartments.len()];
        for (i, c) in spec.compartments.iter().enumerate() {
            if c.role == CompartmentRole::Root {
                continue;
            }
            let parent_name = c.parent.as_deref().ok_or_else(|| {
                NeuralError::MalformedTopology(format!(
                    "compartment '{}' lacks a parent and is not the root",
                    c.name
                ))
            })?;
            let parent = *declared.get(parent_name).ok_or_else(|| {
                NeuralError::MalformedTopology(format!(
                    "compartment '{}' refers to unknown parent '{}'",
                    c.name, parent_name
                ))
            })?;
            declared_children[parent].push(i);
        }

        let root_decl = declared[root.name.as_str()];

        // Breadth-first from the root yields parents before children
        let mut order = Vec::with_capacity(spec.compartments.len());
        let mut new_index = vec![usize::MAX; spec.compartments.len()];
        let mut queue = VecDeque::from([root_decl]);
        while let Some(i) = queue.pop_front() {
            new_index[i] = order.len();
            order.push(i);
            queue.extend(declared_children[i].iter().copied());
        }

        if order.len() != spec.compartments.len() {
            let stray = new_index
                .iter()
                .position(|&idx| idx == usize::MAX)
                .unwrap_or_default();
            return Err(NeuralError::MalformedTopology(describe_cycle(
                spec, &declared, stray,
            )));
        }

        let mut nodes = Vec::with_capacity(order.len());
        for &decl in &order {
            let c = &spec.compartments[decl];
            if c.role == CompartmentRole::DistalTip && !declared_children[decl].is_empty() {
                return Err(NeuralError::MalformedTopology(format!(
                    "distal tip '{}' has children",
                    c.name
                )));
            }
            let parent = c
                .parent
                .as_deref()
                .map(|p| CompartmentId::from(new_index[declared[p]]));
            let axial_resistance_mohm = parent.map(|_| {
                axial_resistance_mohm(rho, c.geometry.length_um, c.geometry.diameter_um)
            });
            nodes.push(Node {
                name: c.name.clone(),
                role: c.role,
                geometry: c.geometry,
                area_um2: c.geometry.area_um2(),
                parent,
                axial_resistance_mohm,
                children: declared_children[decl]
                    .iter()
                    .map(|&child| CompartmentId::from(new_index[child]))
                    .collect(),
            });
        }

        let by_name = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), CompartmentId::from(i)))
            .collect();

        Ok(Tree { nodes, by_name })
    }

    /// Number of compartments, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> CompartmentId {
        CompartmentId::ROOT
    }

    pub fn ids(&self) -> impl Iterator<Item = CompartmentId> + '_ {
        (0..self.nodes.len()).map(CompartmentId::from)
    }

    /// Look a compartment up by name
    pub fn id(&self, name: &str) -> Result<CompartmentId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| NeuralError::UnknownCompartment(name.to_string()))
    }

    pub fn contains(&self, id: CompartmentId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn name(&self, id: CompartmentId) -> &str {
        &self.nodes[id.index()].name
    }

    pub fn role(&self, id: CompartmentId) -> CompartmentRole {
        self.nodes[id.index()].role
    }

    pub fn geometry(&self, id: CompartmentId) -> Geometry {
        self.nodes[id.index()].geometry
    }

    pub fn area_um2(&self, id: CompartmentId) -> f64 {
        self.nodes[id.index()].area_um2
    }

    pub fn parent(&self, id: CompartmentId) -> Option<CompartmentId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: CompartmentId) -> &[CompartmentId] {
        &self.nodes[id.index()].children
    }

    /// Resistance of the link from `id` to its parent; `None` at the root
    pub fn axial_resistance_mohm(&self, id: CompartmentId) -> Option<f64> {
        self.nodes[id.index()].axial_resistance_mohm
    }

    /// All child → parent links, in topological order of the child
    pub fn links(&self) -> impl Iterator<Item = AxialLink> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| {
            Some(AxialLink {
                child: CompartmentId::from(i),
                parent: n.parent?,
                resistance_mohm: n.axial_resistance_mohm?,
            })
        })
    }

    pub fn link_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.parent.is_some()).count()
    }
}

/// Walk parent pointers from a compartment the root never reached until a
/// name repeats, and render the loop.
fn describe_cycle(spec: &MorphologySpec, declared: &AHashMap<&str, usize>, start: usize) -> String {
    let mut seen = vec![false; spec.compartments.len()];
    let mut path = Vec::new();
    let mut current = start;
    while !seen[current] {
        seen[current] = true;
        path.push(current);
        match spec.compartments[current]
            .parent
            .as_deref()
            .and_then(|p| declared.get(p))
        {
            Some(&next) => current = next,
            None => break,
        }
    }
    let loop_start = path.iter().position(|&i| i == current).unwrap_or(0);
    let mut names: Vec<&str> = path[loop_start..]
        .iter()
        .map(|&i| spec.compartments[i].name.as_str())
        .collect();
    names.push(spec.compartments[current].name.as_str());
    format!("cycle detected: {}", names.join(" -> "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom() -> Geometry {
        Geometry::new(10.0, 1.0)
    }

    fn spec(compartments: Vec<CompartmentSpec>) -> MorphologySpec {
        MorphologySpec {
            compartments,
            bulk_resistivity_ohm_cm: 100.0,
        }
    }

    #[test]
    fn test_reference_tree_shape() {
        let tree = Tree::build(&BranchedTree::default().to_spec()).unwrap();
        assert_eq!(tree.len(), 22);
        assert_eq!(tree.link_count(), 21);
        assert_eq!(tree.name(tree.root()), "soma");
        assert_eq!(tree.children(tree.root()).len(), 3);

        let tips = tree
            .ids()
            .filter(|&id| tree.role(id) == CompartmentRole::DistalTip)
            .count();
        assert_eq!(tips, 12);
    }

    #[test]
    fn test_parents_precede_children() {
        let tree = Tree::build(&BranchedTree::default().to_spec()).unwrap();
        for link in tree.links() {
            assert!(link.parent < link.child);
            assert!(link.resistance_mohm > 0.0);
        }
        assert!(tree.parent(tree.root()).is_none());
        assert!(tree.axial_resistance_mohm(tree.root()).is_none());
    }

    #[test]
    fn test_axial_resistance_uses_child_geometry() {
        let tree = Tree::build(&BranchedTree::default().to_spec()).unwrap();
        let tip = tree.id("dend001").unwrap();
        let proximal = tree.id("dend0").unwrap();
        let r_tip = tree.axial_resistance_mohm(tip).unwrap();
        let r_prox = tree.axial_resistance_mohm(proximal).unwrap();
        assert!((r_tip - 346.8).abs() < 0.1);
        assert!((r_prox - 221.9).abs() < 0.1);
    }

    #[test]
    fn test_out_of_order_declaration_is_sorted() {
        let tree = Tree::build(&spec(vec![
            CompartmentSpec::child("tip", geom(), CompartmentRole::DistalTip, "mid"),
            CompartmentSpec::child("mid", geom(), CompartmentRole::Internal, "soma"),
            CompartmentSpec::root("soma", geom()),
        ]))
        .unwrap();
        assert_eq!(tree.name(CompartmentId(0)), "soma");
        assert_eq!(tree.name(CompartmentId(1)), "mid");
        assert_eq!(tree.name(CompartmentId(2)), "tip");
        assert_eq!(tree.parent(CompartmentId(2)), Some(CompartmentId(1)));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = Tree::build(&spec(vec![
            CompartmentSpec::root("soma", geom()),
            CompartmentSpec::child("a", geom(), CompartmentRole::Internal, "b"),
            CompartmentSpec::child("b", geom(), CompartmentRole::Internal, "a"),
        ]))
        .unwrap_err();
        match err {
            NeuralError::MalformedTopology(msg) => assert!(msg.contains("cycle"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let err = Tree::build(&spec(vec![
            CompartmentSpec::root("soma", geom()),
            CompartmentSpec::child("a", geom(), CompartmentRole::Internal, "a"),
        ]))
        .unwrap_err();
        assert!(matches!(err, NeuralError::MalformedTopology(msg) if msg.contains("a -> a")));
    }

    #[test]
    fn test_orphan_is_rejected() {
        let mut orphan = CompartmentSpec::child("a", geom(), CompartmentRole::DistalTip, "soma");
        orphan.parent = None;
        let err = Tree::build(&spec(vec![CompartmentSpec::root("soma", geom()), orphan]))
            .unwrap_err();
        assert!(matches!(err, NeuralError::MalformedTopology(msg) if msg.contains("lacks a parent")));
    }

    #[test]
    fn test_two_roots_rejected() {
        let err = Tree::build(&spec(vec![
            CompartmentSpec::root("soma", geom()),
            CompartmentSpec::root("soma2", geom()),
        ]))
        .unwrap_err();
        assert!(matches!(err, NeuralError::MalformedTopology(msg) if msg.contains("more than one root")));
    }

    #[test]
    fn test_missing_root_rejected() {
        let err = Tree::build(&spec(vec![CompartmentSpec::child(
            "a",
            geom(),
            CompartmentRole::DistalTip,
            "a",
        )]))
        .unwrap_err();
        assert!(matches!(err, NeuralError::MalformedTopology(_)));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let err = Tree::build(&spec(vec![
            CompartmentSpec::root("soma", geom()),
            CompartmentSpec::child("a", geom(), CompartmentRole::DistalTip, "ghost"),
        ]))
        .unwrap_err();
        assert!(matches!(err, NeuralError::MalformedTopology(msg) if msg.contains("ghost")));
    }

    #[test]
    fn test_tip_with_children_rejected() {
        let err = Tree::build(&spec(vec![
            CompartmentSpec::root("soma", geom()),
            CompartmentSpec::child("a", geom(), CompartmentRole::DistalTip, "soma"),
            CompartmentSpec::child("b", geom(), CompartmentRole::DistalTip, "a"),
        ]))
        .unwrap_err();
        assert!(matches!(err, NeuralError::MalformedTopology(msg) if msg.contains("distal tip")));
    }

    #[test]
    fn test_non_positive_geometry_is_invalid_configuration() {
        let err = Tree::build(&spec(vec![
            CompartmentSpec::root("soma", geom()),
            CompartmentSpec::child(
                "a",
                Geometry::new(0.0, 1.0),
                CompartmentRole::DistalTip,
                "soma",
            ),
        ]))
        .unwrap_err();
        assert!(matches!(err, NeuralError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_non_positive_resistivity_is_invalid_configuration() {
        let mut s = spec(vec![CompartmentSpec::root("soma", geom())]);
        s.bulk_resistivity_ohm_cm = -1.0;
        assert!(matches!(
            Tree::build(&s),
            Err(NeuralError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_lookup_unknown_name() {
        let tree = Tree::build(&spec(vec![CompartmentSpec::root("soma", geom())])).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.link_count(), 0);
        assert!(matches!(
            tree.id("dend0"),
            Err(NeuralError::UnknownCompartment(_))
        ));
    }
}
