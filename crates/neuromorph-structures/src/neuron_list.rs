// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ordered collection of neurons with explicit batch-apply operations

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dotprops::Dotprops;
use crate::geometry::BoundingBox;
use crate::neuron::{Morphology, Neuron, NeuronKind};
use crate::StructureResult;

/// Thin, ordered container of [`Neuron`]s.
///
/// Operations on the members go through `map`/`par_map`/`try_par_map`,
/// which take a function and return one result per neuron in list order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeuronList {
    neurons: Vec<Neuron>,
}

impl NeuronList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, neuron: impl Into<Neuron>) {
        self.neurons.push(neuron.into());
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Neuron> {
        self.neurons.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Neuron> {
        self.neurons.iter()
    }

    pub fn as_slice(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn ids(&self) -> Vec<u64> {
        self.neurons.iter().map(|n| n.id()).collect()
    }

    /// First neuron with the given id
    pub fn find(&self, id: u64) -> Option<&Neuron> {
        self.neurons.iter().find(|n| n.id() == id)
    }

    /// New list with the neurons matching `predicate`, order preserved
    pub fn filter<P>(&self, predicate: P) -> NeuronList
    where
        P: Fn(&Neuron) -> bool,
    {
        self.neurons.iter().filter(|n| predicate(n)).cloned().collect()
    }

    pub fn count_kind(&self, kind: NeuronKind) -> usize {
        self.neurons.iter().filter(|n| n.kind() == kind).count()
    }

    /// Apply `f` to every neuron sequentially
    pub fn map<F, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(&Neuron) -> R,
    {
        self.neurons.iter().map(f).collect()
    }

    /// Apply `f` to every neuron on the rayon pool; results keep list order
    pub fn par_map<F, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(&Neuron) -> R + Sync + Send,
        R: Send,
    {
        self.neurons.par_iter().map(f).collect()
    }

    /// Fallible batch-apply. Every neuron is processed; a failure for one
    /// neuron does not stop the others.
    pub fn try_par_map<F, R, E>(&self, f: F) -> Vec<Result<R, E>>
    where
        F: Fn(&Neuron) -> Result<R, E> + Sync + Send,
        R: Send,
        E: Send + std::fmt::Display,
    {
        let results: Vec<Result<R, E>> = self.neurons.par_iter().map(f).collect();
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!(
                target: "neuromorph-structures",
                "{} of {} neurons failed during batch operation",
                failed,
                results.len()
            );
        }
        results
    }

    /// Convert every member to a dot cloud (in parallel); fails on the first error
    pub fn to_dotprops(&self, k: Option<usize>) -> StructureResult<Vec<Dotprops>> {
        self.neurons
            .par_iter()
            .map(|n| n.to_dotprops(k))
            .collect()
    }

    /// Union of all member bounding boxes
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.neurons
            .iter()
            .filter_map(|n| n.bounding_box())
            .reduce(|a, b| a.union(&b))
    }

    /// Sum of member size metrics
    pub fn total_size(&self) -> f64 {
        self.neurons.iter().map(|n| n.size_metric()).sum()
    }
}

impl FromIterator<Neuron> for NeuronList {
    fn from_iter<I: IntoIterator<Item = Neuron>>(iter: I) -> Self {
        Self {
            neurons: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Neuron>> for NeuronList {
    fn from(neurons: Vec<Neuron>) -> Self {
        Self { neurons }
    }
}

impl IntoIterator for NeuronList {
    type Item = Neuron;
    type IntoIter = std::vec::IntoIter<Neuron>;

    fn into_iter(self) -> Self::IntoIter {
        self.neurons.into_iter()
    }
}

impl<'a> IntoIterator for &'a NeuronList {
    type Item = &'a Neuron;
    type IntoIter = std::slice::Iter<'a, Neuron>;

    fn into_iter(self) -> Self::IntoIter {
        self.neurons.iter()
    }
}

impl std::ops::Index<usize> for NeuronList {
    type Output = Neuron;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.neurons[idx]
    }
}
