// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Skeleton (tree) representation of a neuron.

A skeleton is a forest of nodes, each pointing at an optional parent.
Construction validates that node ids are unique, that every parent exists,
and that following parents always terminates at a root.
*/

use ahash::AHashMap;
use neuromorph_spatial::Point3;
use serde::{Deserialize, Serialize};

use crate::geometry::{is_finite, norm, sub, BoundingBox};
use crate::{StructureError, StructureResult};

/// One node of a skeleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonNode {
    pub node_id: u64,
    pub parent_id: Option<u64>,
    pub position: Point3,
    #[serde(default)]
    pub radius: Option<f64>,
}

impl SkeletonNode {
    pub fn new(node_id: u64, parent_id: Option<u64>, position: Point3) -> Self {
        Self {
            node_id,
            parent_id,
            position,
            radius: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TreeNeuronRecord {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    nodes: Vec<SkeletonNode>,
}

/// Skeleton neuron
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TreeNeuronRecord", into = "TreeNeuronRecord")]
pub struct TreeNeuron {
    id: u64,
    name: Option<String>,
    nodes: Vec<SkeletonNode>,
    /// node id -> position in `nodes`
    index_of: AHashMap<u64, usize>,
    /// position in `nodes` of each node's parent
    parent_idx: Vec<Option<usize>>,
}

impl TryFrom<TreeNeuronRecord> for TreeNeuron {
    type Error = StructureError;

    fn try_from(record: TreeNeuronRecord) -> Result<Self, Self::Error> {
        let mut neuron = TreeNeuron::new(record.id, record.nodes)?;
        neuron.name = record.name;
        Ok(neuron)
    }
}

impl From<TreeNeuron> for TreeNeuronRecord {
    fn from(neuron: TreeNeuron) -> Self {
        TreeNeuronRecord {
            id: neuron.id,
            name: neuron.name,
            nodes: neuron.nodes,
        }
    }
}

impl TreeNeuron {
    /// Build and validate a skeleton from its node table
    pub fn new(id: u64, nodes: Vec<SkeletonNode>) -> StructureResult<Self> {
        let mut index_of = AHashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if !is_finite(&node.position) {
                return Err(StructureError::NonFinite {
                    what: "skeleton node position",
                    index: idx,
                });
            }
            if index_of.insert(node.node_id, idx).is_some() {
                return Err(StructureError::DuplicateNodeId(node.node_id));
            }
        }

        let mut parent_idx = Vec::with_capacity(nodes.len());
        for node in &nodes {
            match node.parent_id {
                None => parent_idx.push(None),
                Some(parent) => match index_of.get(&parent) {
                    Some(&p) => parent_idx.push(Some(p)),
                    None => {
                        return Err(StructureError::MissingParent {
                            node: node.node_id,
                            parent,
                        })
                    }
                },
            }
        }

        check_acyclic(&nodes, &parent_idx)?;

        Ok(Self {
            id,
            name: None,
            nodes,
            index_of,
            parent_idx,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn nodes(&self) -> &[SkeletonNode] {
        &self.nodes
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node_id: u64) -> Option<&SkeletonNode> {
        self.index_of.get(&node_id).map(|&idx| &self.nodes[idx])
    }

    pub fn positions(&self) -> Vec<Point3> {
        self.nodes.iter().map(|n| n.position).collect()
    }

    /// Node ids without a parent
    pub fn roots(&self) -> Vec<u64> {
        self.nodes
            .iter()
            .filter(|n| n.parent_id.is_none())
            .map(|n| n.node_id)
            .collect()
    }

    fn child_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.nodes.len()];
        for p in self.parent_idx.iter().flatten() {
            counts[*p] += 1;
        }
        counts
    }

    /// Node ids without children
    pub fn leafs(&self) -> Vec<u64> {
        self.child_counts()
            .iter()
            .zip(&self.nodes)
            .filter(|(count, _)| **count == 0)
            .map(|(_, n)| n.node_id)
            .collect()
    }

    /// Node ids with more than one child
    pub fn branch_points(&self) -> Vec<u64> {
        self.child_counts()
            .iter()
            .zip(&self.nodes)
            .filter(|(count, _)| **count > 1)
            .map(|(_, n)| n.node_id)
            .collect()
    }

    /// `(child, parent)` pairs as indices into [`TreeNeuron::nodes`]
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.parent_idx
            .iter()
            .enumerate()
            .filter_map(|(child, parent)| parent.map(|p| (child, p)))
            .collect()
    }

    /// Sum of all child-parent segment lengths
    pub fn cable_length(&self) -> f64 {
        self.edges()
            .iter()
            .map(|&(c, p)| norm(&sub(&self.nodes[c].position, &self.nodes[p].position)))
            .sum()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.nodes.iter().map(|n| &n.position))
    }

    /// Same topology with new node positions (in node order)
    pub fn with_positions(&self, positions: Vec<Point3>) -> StructureResult<Self> {
        if positions.len() != self.nodes.len() {
            return Err(StructureError::LengthMismatch {
                what: "skeleton positions",
                expected: self.nodes.len(),
                actual: positions.len(),
            });
        }
        if let Some(index) = positions.iter().position(|p| !is_finite(p)) {
            return Err(StructureError::NonFinite {
                what: "skeleton node position",
                index,
            });
        }
        let mut out = self.clone();
        for (node, position) in out.nodes.iter_mut().zip(positions) {
            node.position = position;
        }
        Ok(out)
    }
}

/// Walk parent chains, colouring nodes as they are resolved.
fn check_acyclic(nodes: &[SkeletonNode], parent_idx: &[Option<usize>]) -> StructureResult<()> {
    const UNSEEN: u8 = 0;
    const IN_PROGRESS: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; nodes.len()];
    let mut chain = Vec::new();
    for start in 0..nodes.len() {
        let mut current = Some(start);
        while let Some(idx) = current {
            match state[idx] {
                DONE => break,
                IN_PROGRESS => return Err(StructureError::Cycle(nodes[idx].node_id)),
                _ => {
                    state[idx] = IN_PROGRESS;
                    chain.push(idx);
                    current = parent_idx[idx];
                }
            }
        }
        for idx in chain.drain(..) {
            state[idx] = DONE;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Y-shaped skeleton: root 1 at the origin, branch at node 2
    fn y_shape() -> TreeNeuron {
        TreeNeuron::new(
            7,
            vec![
                SkeletonNode::new(1, None, [0.0, 0.0, 0.0]),
                SkeletonNode::new(2, Some(1), [0.0, 0.0, 10.0]),
                SkeletonNode::new(3, Some(2), [3.0, 0.0, 14.0]),
                SkeletonNode::new(4, Some(2), [-3.0, 0.0, 14.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_topology_queries() {
        let n = y_shape();
        assert_eq!(n.roots(), vec![1]);
        let mut leafs = n.leafs();
        leafs.sort();
        assert_eq!(leafs, vec![3, 4]);
        assert_eq!(n.branch_points(), vec![2]);
        assert_eq!(n.edges().len(), 3);
        assert_relative_eq!(n.cable_length(), 20.0);
    }

    #[test]
    fn test_rejects_missing_parent() {
        let err = TreeNeuron::new(
            1,
            vec![
                SkeletonNode::new(1, None, [0.0; 3]),
                SkeletonNode::new(2, Some(9), [1.0, 0.0, 0.0]),
            ],
        )
        .unwrap_err();
        assert_eq!(err, StructureError::MissingParent { node: 2, parent: 9 });
    }

    #[test]
    fn test_rejects_duplicates_and_cycles() {
        let dup = TreeNeuron::new(
            1,
            vec![
                SkeletonNode::new(1, None, [0.0; 3]),
                SkeletonNode::new(1, None, [1.0, 0.0, 0.0]),
            ],
        );
        assert_eq!(dup.unwrap_err(), StructureError::DuplicateNodeId(1));

        let cycle = TreeNeuron::new(
            1,
            vec![
                SkeletonNode::new(1, Some(3), [0.0; 3]),
                SkeletonNode::new(2, Some(1), [1.0, 0.0, 0.0]),
                SkeletonNode::new(3, Some(2), [2.0, 0.0, 0.0]),
            ],
        );
        assert!(matches!(cycle, Err(StructureError::Cycle(_))));
    }

    #[test]
    fn test_with_positions_keeps_topology() {
        let n = y_shape();
        let shifted: Vec<Point3> = n.positions().iter().map(|p| [p[0] + 1.0, p[1], p[2]]).collect();
        let moved = n.with_positions(shifted).unwrap();
        assert_eq!(moved.roots(), n.roots());
        assert_relative_eq!(moved.cable_length(), n.cable_length());
        assert_eq!(moved.node(1).unwrap().position, [1.0, 0.0, 0.0]);
        assert!(n.with_positions(vec![[0.0; 3]]).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let json = r#"{"id": 3, "nodes": [
            {"node_id": 1, "parent_id": null, "position": [0, 0, 0]},
            {"node_id": 2, "parent_id": 5, "position": [1, 0, 0]}
        ]}"#;
        assert!(serde_json::from_str::<TreeNeuron>(json).is_err());

        let n = y_shape().with_name("DA1");
        let round: TreeNeuron = serde_json::from_str(&serde_json::to_string(&n).unwrap()).unwrap();
        assert_eq!(round.name(), Some("DA1"));
        assert_eq!(round.n_nodes(), 4);
    }
}
