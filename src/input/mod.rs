// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! This module contains structures and methods for specifying parameters of the analysis.

pub mod analysis;
pub mod clusters;
pub mod kmeans;
pub mod optimization;
pub mod symmetrization;

pub use analysis::Analysis;
pub use clusters::ClusterCount;
pub use kmeans::KMeans;
pub use optimization::ChiOptimization;
pub use symmetrization::Symmetrization;
