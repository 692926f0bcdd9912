// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the neuron collection and representation conversions

use neuromorph_structures::*;

fn straight_skeleton(id: u64, n: usize, offset: f64) -> TreeNeuron {
    let nodes = (0..n)
        .map(|i| {
            let parent = if i == 0 { None } else { Some(i as u64 - 1) };
            SkeletonNode::new(i as u64, parent, [offset, i as f64, 0.0])
        })
        .collect();
    TreeNeuron::new(id, nodes).unwrap()
}

fn mixed_list() -> NeuronList {
    let mut list = NeuronList::new();
    list.push(straight_skeleton(1, 10, 0.0));
    list.push(
        MeshNeuron::new(
            2,
            vec![[0.0, 0.0, 5.0], [1.0, 0.0, 5.0], [0.0, 1.0, 5.0]],
            vec![[0, 1, 2]],
        )
        .unwrap(),
    );
    list.push(straight_skeleton(3, 5, 20.0).with_name("short"));
    list
}

#[test]
fn test_par_map_preserves_order() {
    let list = mixed_list();
    let ids = list.par_map(|n| n.id());
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(ids, list.ids());
    assert_eq!(list.map(|n| n.kind()), vec![NeuronKind::Skeleton, NeuronKind::Mesh, NeuronKind::Skeleton]);
}

#[test]
fn test_try_par_map_failures_are_independent() {
    let list = mixed_list();
    // The mesh is rejected by the closure; the skeletons still convert
    let results = list.try_par_map(|n| match n {
        Neuron::Mesh(_) => Err("mesh not supported".to_string()),
        other => other.to_dotprops(None).map_err(|e| e.to_string()),
    });
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().len(), 9);
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().len(), 4);
}

#[test]
fn test_to_dotprops_and_lookup() {
    let list = mixed_list();
    let skeletons = list.filter(|n| n.kind() == NeuronKind::Skeleton);
    assert_eq!(skeletons.len(), 2);
    let dots = skeletons.to_dotprops(None).unwrap();
    assert_eq!(dots.iter().map(|d| d.id()).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(list.find(3).and_then(|n| n.name()), Some("short"));
    assert!(list.find(42).is_none());
    assert_eq!(list.count_kind(NeuronKind::Mesh), 1);
}

#[test]
fn test_aggregate_metrics() {
    let list = mixed_list();
    let bbox = list.bounding_box().unwrap();
    assert_eq!(bbox.min, [0.0, 0.0, 0.0]);
    assert_eq!(bbox.max, [20.0, 9.0, 5.0]);
    // cable 9 + 4, mesh area 0.5
    assert!((list.total_size() - 13.5).abs() < 1e-12);
}

#[test]
fn test_serde_round_trip() {
    let list = mixed_list();
    let json = serde_json::to_string(&list).unwrap();
    let back: NeuronList = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ids(), list.ids());
    assert_eq!(back[1].kind(), NeuronKind::Mesh);
}
