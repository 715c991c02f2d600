// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! # pccaplus: Markov state models from phi-function sampling
//!
//! A crate for constructing coarse-grained Markov state models from sampling data
//! using the Robust Perron Cluster Cluster Analysis (PCCA+).
//!
//! The sampled configuration space is partitioned into soft "nodes" using smooth membership
//! functions (phi-functions). Each node owns a weighted collection of samples (its trajectory).
//! From these, `pccaplus`
//!
//! 1. builds the node overlap matrix `S`,
//! 2. symmetrizes it and corrects the stationary weights of the nodes,
//! 3. calculates and sorts the eigenspectrum of the symmetrized matrix,
//! 4. deals with the degeneracies of the Perron cluster and weight-orthonormalizes the eigenvectors,
//! 5. identifies metastable clusters using the Inner Simplex Algorithm (ISA),
//! 6. optionally optimizes the membership (chi) matrix,
//! 7. and constructs the reduced generator matrix `Qc` describing the transitions between the clusters.
//!
//! ## Usage
//!
//! Run:
//!
//! ```bash
//! $ cargo add pccaplus
//! ```
//!
//! Import the crate in your Rust code:
//!
//! ```rust
//! use pccaplus::prelude::*;
//! ```
//!
//! ## Quick example
//!
//! ```no_run
//! use pccaplus::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Nodes are normally loaded from your own storage layer.
//!     let mut nodes: Vec<Node> = Vec::new();
//!
//!     // Construct the analysis
//!     let analysis = Analysis::builder()
//!         .alpha(2.5)                                // Width of the phi-functions
//!         .beta(0.4)                                 // Inverse temperature (1/kT)
//!         .clusters(ClusterCount::fixed(3)?)         // Number of metastable clusters
//!         .symmetrization(Symmetrization::new(Some(1e-6), None, true)?)
//!         .optimize_chi(ChiOptimization::default())  // Refine the membership matrix
//!         .n_threads(4)                              // Threads for the overlap matrix
//!         .output("msm.yaml")                        // Output YAML file
//!         .build()?;
//!
//!     // Activate colog for logging (requires the `colog` crate)
//!     colog::init();
//!
//!     // Run the analysis on the nodes; corrected weights are written back to the nodes
//!     let results = analysis.run(&mut nodes, &Euclidean)?;
//!     println!("{}", results.qc_matrix());
//!
//!     Ok(())
//! }
//! ```
//!
//! The individual stages of the analysis are also available as standalone functions
//! in the [`analysis`] module, together with auxiliary tools working on the same data:
//! weighted k-means clustering for seeding new nodes ([`analysis::kmeans::kmeans`])
//! and the Gelman-Rubin convergence diagnostic ([`analysis::convergence::gelman_rubin`]).

/// Version of the `pccaplus` crate.
pub const PCCAPLUS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Message that should be added to every panic.
pub(crate) const PANIC_MESSAGE: &str =
    "\n\n\n            >>> THIS SHOULD NOT HAVE HAPPENED! PLEASE REPORT THIS ERROR <<<\n\n";

/// Log colored info message.
#[macro_export]
macro_rules! colog_info {
    ($msg:expr) => {
        log::info!($msg)
    };
    ($msg:expr, $($arg:expr),+ $(,)?) => {{
        use colored::Colorize;
        log::info!($msg, $( $arg.to_string().cyan() ),+)
    }};
}

/// Log colored warning message.
#[macro_export]
macro_rules! colog_warn {
    ($msg:expr) => {
        log::warn!($msg)
    };
    ($msg:expr, $($arg:expr),+ $(,)?) => {{
        use colored::Colorize;
        log::warn!($msg, $( $arg.to_string().yellow() ),+)
    }};
}

pub mod analysis;
pub mod errors;
pub mod input;
pub mod presentation;
pub mod structures;

/// This module contains re-exported public structures of the `pccaplus` crate.
pub mod prelude {
    pub use super::input::{
        analysis::AnalysisBuilder, Analysis, ChiOptimization, ClusterCount, KMeans,
        Symmetrization,
    };

    pub use super::structures::{Euclidean, Metric, Node, Periodic, WeightedSamples};

    pub use super::analysis::{
        convergence::{gelman_rubin, GelmanRubin},
        generator::{MarkovGenerator, NumericsCheck},
        isa::{cluster_by_isa, IsaClustering},
        kmeans::{kmeans, KMeansResult},
        optimize::{optimize_chi, OptimizedChi},
        orthogonalize::{orthogonalize, perron_cluster_size},
        overlap::{overlap_matrix, OverlapMode},
        phi::{
            phi, phi_contrib, phi_contrib_log_potential, phi_denominator, phi_log_potential,
            phi_numerator, PhiContext,
        },
        spectral::Spectrum,
        symmetrize::{symmetrize, SymmetrizedMatrix},
    };

    pub use super::presentation::{AnalysisResults, ConvergenceSummary, NodeWeights};

    pub use nalgebra::{DMatrix, DVector};
}
