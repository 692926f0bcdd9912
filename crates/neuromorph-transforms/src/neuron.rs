// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Applying transforms to whole neurons

use neuromorph_structures::geometry::{normalize, sub};
use neuromorph_structures::{Dotprops, Neuron};

use crate::{Point3, Transform, TransformError, TransformResult};

/// Probe step for tangents, as a fraction of the cloud's bounding-box diagonal
const TANGENT_PROBE_FRACTION: f64 = 1e-3;
const MIN_TANGENT_PROBE: f64 = 1e-6;

/// Transform a neuron's geometry, keeping its id, name and topology
pub fn xform_neuron(neuron: &Neuron, transform: &dyn Transform) -> TransformResult<Neuron> {
    let out = match neuron {
        Neuron::Skeleton(s) => {
            let positions = transform.xform(&s.positions())?;
            Neuron::Skeleton(s.with_positions(positions)?)
        }
        Neuron::Mesh(m) => {
            let vertices = transform.xform(m.vertices())?;
            Neuron::Mesh(m.with_vertices(vertices)?)
        }
        Neuron::Dotprops(d) => Neuron::Dotprops(xform_dotprops(d, transform)?),
    };
    Ok(out)
}

/// Transform dot positions and carry tangents through the transform.
///
/// Each tangent is recomputed from the transformed displacement of a probe
/// point `p + v·δ` and renormalised. Alpha is kept unchanged.
pub fn xform_dotprops(dots: &Dotprops, transform: &dyn Transform) -> TransformResult<Dotprops> {
    if dots.is_empty() {
        return Ok(dots.clone());
    }

    let delta = dots
        .bounding_box()
        .map_or(0.0, |b| b.diagonal() * TANGENT_PROBE_FRACTION)
        .max(MIN_TANGENT_PROBE);

    let probes: Vec<Point3> = dots
        .points()
        .iter()
        .zip(dots.vectors())
        .map(|(p, v)| [p[0] + v[0] * delta, p[1] + v[1] * delta, p[2] + v[2] * delta])
        .collect();

    let moved = transform.xform(dots.points())?;
    let moved_probes = transform.xform(&probes)?;

    let vectors = moved
        .iter()
        .zip(&moved_probes)
        .enumerate()
        .map(|(index, (p, q))| {
            normalize(&sub(q, p)).ok_or(TransformError::NonFinite {
                what: "transformed tangent",
                index,
            })
        })
        .collect::<TransformResult<Vec<Point3>>>()?;

    Ok(dots.with_geometry(moved, vectors)?)
}
