// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Reduced generator matrix describing the transitions between the metastable clusters.

use getset::Getters;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::errors::ClusterError;

/// Row sums of the generator matrix larger than this (in absolute value) are reported.
const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Coarse-grained Markov generator of the clusters.
#[derive(Debug, Clone, Getters)]
pub struct MarkovGenerator {
    /// Generator matrix `Qc = R⁻¹·diag(λ)·R − I`.
    #[getset(get = "pub")]
    qc: DMatrix<f64>,
    /// Statistical weights of the clusters (first row of the rotation matrix).
    #[getset(get = "pub")]
    cluster_weights: DVector<f64>,
}

impl MarkovGenerator {
    /// Construct the generator of the clusters from the rotation matrix
    /// and the leading eigenvalues of the row-stochastic matrix.
    ///
    /// ## Returns
    /// - `MarkovGenerator` if successful.
    /// - `ClusterError::NotEnoughEigenvalues` if there are fewer eigenvalues than clusters.
    /// - `ClusterError::SingularRotation` if the rotation matrix can not be inverted.
    pub fn new(rotation: &DMatrix<f64>, eigenvalues: &DVector<f64>) -> Result<Self, ClusterError> {
        let k = rotation.nrows();
        if k == 0 || rotation.ncols() != k {
            return Err(ClusterError::SingularRotation);
        }

        if eigenvalues.len() < k {
            return Err(ClusterError::NotEnoughEigenvalues(k, eigenvalues.len()));
        }

        let inverse = rotation
            .clone()
            .try_inverse()
            .ok_or(ClusterError::SingularRotation)?;

        let lambda = DMatrix::from_diagonal(&eigenvalues.rows(0, k).clone_owned());
        let qc = inverse * lambda * rotation - DMatrix::identity(k, k);
        let cluster_weights = rotation.row(0).transpose();

        Ok(Self {
            qc,
            cluster_weights,
        })
    }

    /// Number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.qc.nrows()
    }
}

/// Numerical sanity check of the results of the analysis.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct NumericsCheck {
    /// Row sums of the generator matrix. Should be zero.
    #[getset(get = "pub")]
    qc_row_sums: Vec<f64>,
    /// Weights of the clusters from the rotation matrix.
    #[getset(get = "pub")]
    cluster_weights: Vec<f64>,
    /// Weights of the clusters calculated as `wᵀ·chi`.
    #[getset(get = "pub")]
    cluster_weights_from_chi: Vec<f64>,
    /// Largest membership in every cluster.
    #[getset(get = "pub")]
    chi_column_max: Vec<f64>,
    /// Row sums of the membership matrix. Should be one.
    #[getset(get = "pub")]
    chi_row_sums: Vec<f64>,
}

impl NumericsCheck {
    /// Collect the numerical properties of the generator and the membership matrix.
    /// `weights` are the (corrected) weights of the nodes.
    pub fn new(generator: &MarkovGenerator, chi: &DMatrix<f64>, weights: &DVector<f64>) -> Self {
        let qc = generator.qc();

        Self {
            qc_row_sums: qc.row_iter().map(|row| row.sum()).collect(),
            cluster_weights: generator.cluster_weights().iter().copied().collect(),
            cluster_weights_from_chi: chi.tr_mul(weights).iter().copied().collect(),
            chi_column_max: chi.column_iter().map(|column| column.max()).collect(),
            chi_row_sums: chi.row_iter().map(|row| row.sum()).collect(),
        }
    }

    /// Are the row sums of the generator zero and the row sums of the membership matrix one
    /// (within `tolerance`)?
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        self.qc_row_sums.iter().all(|s| s.abs() <= tolerance)
            && self.chi_row_sums.iter().all(|s| (s - 1.0).abs() <= tolerance)
    }

    /// Log the results of the check.
    pub(crate) fn log(&self) {
        let join = |values: &[f64]| {
            values
                .iter()
                .map(|v| format!("{:.6}", v))
                .collect::<Vec<String>>()
                .join(" ")
        };

        log::info!("Qc row sums: {}", join(&self.qc_row_sums));
        log::info!("Cluster weights (rotation): {}", join(&self.cluster_weights));
        log::info!("Cluster weights (chi): {}", join(&self.cluster_weights_from_chi));
        log::info!("Maximal memberships: {}", join(&self.chi_column_max));

        if let Some(max) = self
            .qc_row_sums
            .iter()
            .map(|s| s.abs())
            .reduce(f64::max)
            .filter(|&max| max > ROW_SUM_TOLERANCE)
        {
            colog_warn!(
                "Rows of the generator matrix do not sum to zero (largest deviation: {}).",
                format!("{:.3e}", max)
            );
        }
    }
}
