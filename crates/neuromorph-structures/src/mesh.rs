// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Triangle-mesh representation of a neuron

use neuromorph_spatial::Point3;
use serde::{Deserialize, Serialize};

use crate::geometry::{cross, is_finite, norm, sub, BoundingBox};
use crate::{StructureError, StructureResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MeshNeuronRecord {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    vertices: Vec<Point3>,
    faces: Vec<[u32; 3]>,
}

/// Mesh neuron: vertices plus triangular faces indexing into them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MeshNeuronRecord", into = "MeshNeuronRecord")]
pub struct MeshNeuron {
    id: u64,
    name: Option<String>,
    vertices: Vec<Point3>,
    faces: Vec<[u32; 3]>,
}

impl TryFrom<MeshNeuronRecord> for MeshNeuron {
    type Error = StructureError;

    fn try_from(record: MeshNeuronRecord) -> Result<Self, Self::Error> {
        let mut mesh = MeshNeuron::new(record.id, record.vertices, record.faces)?;
        mesh.name = record.name;
        Ok(mesh)
    }
}

impl From<MeshNeuron> for MeshNeuronRecord {
    fn from(mesh: MeshNeuron) -> Self {
        MeshNeuronRecord {
            id: mesh.id,
            name: mesh.name,
            vertices: mesh.vertices,
            faces: mesh.faces,
        }
    }
}

impl MeshNeuron {
    pub fn new(id: u64, vertices: Vec<Point3>, faces: Vec<[u32; 3]>) -> StructureResult<Self> {
        if let Some(index) = vertices.iter().position(|v| !is_finite(v)) {
            return Err(StructureError::NonFinite {
                what: "mesh vertex",
                index,
            });
        }
        for (face_idx, face) in faces.iter().enumerate() {
            if let Some(&vertex) = face.iter().find(|&&v| v as usize >= vertices.len()) {
                return Err(StructureError::FaceIndexOutOfRange {
                    face: face_idx,
                    vertex,
                    n_vertices: vertices.len(),
                });
            }
        }
        Ok(Self {
            id,
            name: None,
            vertices,
            faces,
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

    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn surface_area(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let a = &self.vertices[f[0] as usize];
                let b = &self.vertices[f[1] as usize];
                let c = &self.vertices[f[2] as usize];
                0.5 * norm(&cross(&sub(b, a), &sub(c, a)))
            })
            .sum()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    /// Same faces with new vertex positions
    pub fn with_vertices(&self, vertices: Vec<Point3>) -> StructureResult<Self> {
        if vertices.len() != self.vertices.len() {
            return Err(StructureError::LengthMismatch {
                what: "mesh vertices",
                expected: self.vertices.len(),
                actual: vertices.len(),
            });
        }
        let mut out = MeshNeuron::new(self.id, vertices, self.faces.clone())?;
        out.name = self.name.clone();
        Ok(out)
    }
}
