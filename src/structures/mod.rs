// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Data model shared by all parts of the analysis: distance metrics, weighted samples and nodes.

pub mod metric;
pub mod node;
pub mod samples;

pub use metric::{Euclidean, Metric, Periodic};
pub use node::Node;
pub use samples::WeightedSamples;
