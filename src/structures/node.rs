// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Contains the structure describing a single node of the coordinate-space partition.

use getset::{CopyGetters, Getters};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::errors::NodeError;

use super::samples::WeightedSamples;

/// A node is a center of a smooth membership (phi) function in the sampled coordinate space.
/// It owns the samples collected by its (biased) simulation.
#[derive(Debug, Clone, Getters, CopyGetters, Serialize, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    /// Name of the node.
    #[getset(get = "pub")]
    name: String,
    /// Position of the node (center of its phi-function).
    #[getset(get = "pub")]
    position: DVector<f64>,
    /// Does the node participate in the partition of the coordinate space?
    #[getset(get_copy = "pub")]
    is_partition: bool,
    /// Did the simulation of this node fail?
    #[getset(get_copy = "pub")]
    failed: bool,
    /// Weight of the node estimated directly from the sampling.
    #[getset(get_copy = "pub")]
    weight_direct: f64,
    /// Weight of the node after correction by the symmetrization of the overlap matrix.
    /// `None` until the analysis has been performed.
    #[getset(get_copy = "pub")]
    weight_corrected: Option<f64>,
    /// Samples collected for the node.
    #[getset(get = "pub")]
    samples: WeightedSamples,
}

/// Unvalidated form of `Node` as read from a file.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNode {
    name: String,
    position: DVector<f64>,
    #[serde(default = "default_true")]
    is_partition: bool,
    #[serde(default)]
    failed: bool,
    weight_direct: f64,
    #[serde(default)]
    weight_corrected: Option<f64>,
    samples: WeightedSamples,
}

fn default_true() -> bool {
    true
}

impl TryFrom<RawNode> for Node {
    type Error = NodeError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let mut node = Node::new(&raw.name, raw.position, raw.weight_direct, raw.samples)?
            .with_partition(raw.is_partition)
            .with_failed(raw.failed);

        if let Some(weight) = raw.weight_corrected {
            if !weight.is_finite() || weight < 0.0 {
                return Err(NodeError::InvalidCorrectedWeight(raw.name, weight));
            }
            node.set_weight_corrected(weight);
        }

        Ok(node)
    }
}

impl Node {
    /// Construct a new node participating in the partition.
    ///
    /// ## Returns
    /// - `Node` if the direct weight is finite and non-negative and the dimension
    ///   of the node position matches the dimension of the samples.
    /// - `NodeError` otherwise.
    pub fn new(
        name: &str,
        position: DVector<f64>,
        weight_direct: f64,
        samples: WeightedSamples,
    ) -> Result<Self, NodeError> {
        if !weight_direct.is_finite() || weight_direct < 0.0 {
            return Err(NodeError::InvalidWeight(name.to_owned(), weight_direct));
        }

        if !samples.is_empty() && samples.n_dims() != position.len() {
            return Err(NodeError::InconsistentDimension {
                name: name.to_owned(),
                position: position.len(),
                samples: samples.n_dims(),
            });
        }

        Ok(Self {
            name: name.to_owned(),
            position,
            is_partition: true,
            failed: false,
            weight_direct,
            weight_corrected: None,
            samples,
        })
    }

    /// Set whether the node participates in the partition of the coordinate space.
    pub fn with_partition(mut self, is_partition: bool) -> Self {
        self.is_partition = is_partition;
        self
    }

    /// Mark the simulation of the node as failed (or not).
    pub fn with_failed(mut self, failed: bool) -> Self {
        self.failed = failed;
        self
    }

    /// Set the corrected weight of the node.
    pub(crate) fn set_weight_corrected(&mut self, weight: f64) {
        self.weight_corrected = Some(weight);
    }
}
