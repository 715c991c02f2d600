// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! This module contains the implementation of the analysis logic.
//!
//! The individual stages of the PCCA+ analysis are available as standalone functions.
//! [`Analysis::run`] chains them together.

use indexmap::IndexMap;
use nalgebra::DVector;

use crate::errors::AnalysisError;
use crate::input::Analysis;
use crate::presentation::{AnalysisResults, ConvergenceSummary, NodeWeights};
use crate::structures::{Metric, Node};

pub mod convergence;
pub mod generator;
pub mod isa;
pub mod kmeans;
pub mod optimize;
pub mod orthogonalize;
pub mod overlap;
pub mod phi;
pub mod spectral;
pub mod symmetrize;

use generator::{MarkovGenerator, NumericsCheck};
use spectral::Spectrum;

/// Normalize the vector so that its elements sum to one.
/// Returns `None` if the sum is not positive.
#[inline]
fn normalized(vector: &DVector<f64>) -> Option<DVector<f64>> {
    let sum = vector.sum();
    if sum.is_finite() && sum > 0.0 {
        Some(vector / sum)
    } else {
        None
    }
}

impl Analysis {
    /// Perform the PCCA+ analysis of the `nodes`.
    ///
    /// Only nodes participating in the partition are analyzed. If `ignore_failed` is set,
    /// failed nodes are skipped as well (they still partition the coordinate space).
    /// The corrected weights of the analyzed nodes are written back to the nodes.
    ///
    /// ## Returns
    /// - `AnalysisResults` if the analysis succeeds. If an output file was requested,
    ///   the results are also written into it.
    /// - `AnalysisError` if any stage of the analysis fails.
    pub fn run<M: Metric>(
        &self,
        nodes: &mut [Node],
        metric: &M,
    ) -> Result<AnalysisResults, AnalysisError> {
        self.validate().map_err(AnalysisError::Config)?;
        self.info();

        let ctx = self.phi_context().map_err(AnalysisError::Config)?;

        let active_indices: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_partition() && !(self.ignore_failed() && node.failed()))
            .map(|(i, _)| i)
            .collect();

        if active_indices.is_empty() {
            return Err(AnalysisError::NoActiveNodes);
        }

        let skipped = nodes.iter().filter(|n| n.is_partition()).count() - active_indices.len();
        if skipped > 0 {
            colog_info!("Ignoring {} failed node(s).", skipped);
        }

        colog_info!("Analyzing {} node(s).", active_indices.len());

        // overlap matrix
        let overlap = {
            let participants: Vec<&DVector<f64>> = nodes
                .iter()
                .filter(|node| node.is_partition())
                .map(|node| node.position())
                .collect();
            let active: Vec<&Node> = active_indices.iter().map(|&i| &nodes[i]).collect();

            overlap::overlap_matrix(
                &ctx,
                metric,
                &active,
                &participants,
                self.overlap_mode(),
                self.lag(),
                self.n_threads(),
            )
            .map_err(AnalysisError::Overlap)?
        };

        // direct weights
        let direct = DVector::from_iterator(
            active_indices.len(),
            active_indices.iter().map(|&i| nodes[i].weight_direct()),
        );
        let direct = normalized(&direct).ok_or(AnalysisError::InvalidWeights(direct.sum()))?;

        // symmetrization and weight correction
        let symmetrized = symmetrize::symmetrize(&overlap, &direct, self.symmetrization())
            .map_err(AnalysisError::Symmetrize)?;

        let corrected = normalized(symmetrized.weights()).ok_or(AnalysisError::InvalidWeights(
            symmetrized.weights().sum(),
        ))?;

        for (&i, &weight) in active_indices.iter().zip(corrected.iter()) {
            let node = &mut nodes[i];
            log::info!(
                "Node '{}': direct weight {:.6}, corrected weight {:.6}.",
                node.name(),
                node.weight_direct(),
                weight
            );
            node.set_weight_corrected(weight);
        }

        // spectrum
        let spectrum = Spectrum::new(&symmetrized).map_err(AnalysisError::Spectral)?;
        spectrum.log_info();

        let n_clusters = self.clusters().resolve(spectrum.suggested_clusters());
        let perron = orthogonalize::perron_cluster_size(spectrum.eigenvalues());

        // clustering
        let eigenvectors =
            orthogonalize::orthogonalize(spectrum.eigenvalues(), spectrum.eigenvectors(), &corrected)
                .map_err(AnalysisError::Cluster)?;

        let isa = isa::cluster_by_isa(&eigenvectors, n_clusters).map_err(AnalysisError::Cluster)?;

        let (chi, rotation, chi_optimization_converged) = match self.optimize_chi() {
            Some(params) => {
                let optimized = optimize::optimize_chi(&eigenvectors, &isa, &corrected, params)
                    .map_err(AnalysisError::Cluster)?;
                (
                    optimized.chi().clone(),
                    optimized.rotation().clone(),
                    Some(optimized.converged()),
                )
            }
            None => (isa.chi().clone(), isa.rotation().clone(), None),
        };

        // generator of the clusters
        let generator =
            MarkovGenerator::new(&rotation, spectrum.eigenvalues()).map_err(AnalysisError::Cluster)?;
        let numerics = NumericsCheck::new(&generator, &chi, &corrected);
        numerics.log();

        colog_info!(
            "Constructed a Markov state model of {} metastable cluster(s).",
            generator.n_clusters()
        );

        let node_names: Vec<String> = active_indices
            .iter()
            .map(|&i| nodes[i].name().clone())
            .collect();

        let weights: IndexMap<String, NodeWeights> = node_names
            .iter()
            .cloned()
            .zip(
                direct
                    .iter()
                    .zip(corrected.iter())
                    .map(|(&d, &c)| NodeWeights::new(d, c)),
            )
            .collect();

        let results = AnalysisResults {
            node_names,
            n_clusters: generator.n_clusters(),
            suggested_clusters: spectrum.suggested_clusters(),
            perron_cluster: perron,
            weights,
            overlap_matrix: overlap,
            symmetrized_matrix: symmetrized.stochastic().clone(),
            eigenvalues: spectrum.eigenvalues().iter().copied().collect(),
            gaps: spectrum.gaps().iter().copied().collect(),
            weighted_gaps: spectrum.weighted_gaps().iter().copied().collect(),
            c_f: chi.max(),
            indicator: chi.min(),
            chi_matrix: chi,
            rotation_matrix: rotation,
            qc_matrix: generator.qc().clone(),
            cluster_weights: generator.cluster_weights().iter().copied().collect(),
            numerics,
            convergence: ConvergenceSummary {
                weights_converged: symmetrized.weights_converged(),
                weight_iterations: symmetrized.weight_iterations(),
                matrix_converged: symmetrized.matrix_converged(),
                matrix_iterations: symmetrized.matrix_iterations(),
                chi_optimization_converged,
            },
        };

        if !results.convergence.all_converged() {
            colog_warn!("Some iterative parts of the analysis did not converge. Check the results carefully.");
        }

        if let Some(output) = self.output() {
            results.write(output).map_err(AnalysisError::Write)?;
        }

        Ok(results)
    }
}
