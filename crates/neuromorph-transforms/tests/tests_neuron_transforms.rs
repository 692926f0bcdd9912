// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use approx::assert_relative_eq;
use neuromorph_structures::{MeshNeuron, Morphology, Neuron};
use neuromorph_transforms::*;
use proptest::prelude::*;

fn cube_landmarks() -> Vec<Point3> {
    let mut out = Vec::new();
    for x in [0.0, 10.0] {
        for y in [0.0, 10.0] {
            for z in [0.0, 10.0] {
                out.push([x, y, z]);
            }
        }
    }
    out
}

proptest! {
    #[test]
    fn prop_affine_inverse_round_trips(
        diag in prop::array::uniform3(0.5f64..4.0),
        shear in -1.0f64..1.0,
        shift in prop::array::uniform3(-100.0f64..100.0),
        p in prop::array::uniform3(-50.0f64..50.0),
    ) {
        let t = AffineTransform::from_parts(
            [[diag[0], shear, 0.0], [0.0, diag[1], 0.0], [shear, 0.0, diag[2]]],
            shift,
        ).unwrap();
        prop_assume!(t.inverse().is_ok());
        let back = t.inverse().unwrap().xform_point(&t.xform_point(&p).unwrap()).unwrap();
        for axis in 0..3 {
            prop_assert!((back[axis] - p[axis]).abs() < 1e-8);
        }
    }
}

#[test]
fn test_tps_on_mesh_moves_landmark_vertices() {
    let src = cube_landmarks();
    let trg: Vec<Point3> = src
        .iter()
        .enumerate()
        .map(|(i, p)| [p[0] * 1.5, p[1] + (i % 2) as f64, p[2] - 2.0])
        .collect();
    let tps = ThinPlateSpline::new(src.clone(), trg.clone()).unwrap();

    let mesh = MeshNeuron::new(5, src[..3].to_vec(), vec![[0, 1, 2]]).unwrap();
    let out = xform_neuron(&Neuron::from(mesh), &tps).unwrap();
    let moved = out.as_mesh().unwrap().vertices();
    for (m, t) in moved.iter().zip(&trg[..3]) {
        for axis in 0..3 {
            assert_relative_eq!(m[axis], t[axis], epsilon = 1e-8);
        }
    }
    assert_eq!(out.id(), 5);
}

#[test]
fn test_sequence_of_warps_inverts() {
    let src = cube_landmarks();
    let trg: Vec<Point3> = src.iter().map(|p| [p[0] + 0.1 * p[1], p[1], p[2] * 1.1]).collect();

    let mut seq = TransformSequence::new();
    seq.push(MovingLeastSquares::new(src.clone(), trg.clone()).unwrap());
    seq.push(AffineTransform::translation([5.0, 5.0, 5.0]));
    let inv = seq.inverse().unwrap();

    // landmarks survive the round trip exactly through MLS
    let there = seq.xform(&src).unwrap();
    let back = inv.xform(&there).unwrap();
    for (b, s) in back.iter().zip(&src) {
        for axis in 0..3 {
            assert_relative_eq!(b[axis], s[axis], epsilon = 1e-9);
        }
    }
}
