// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! This module contains structures and methods for presenting the results of the analysis.

use std::fs::{read_to_string, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use getset::{CopyGetters, Getters};
use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::analysis::generator::NumericsCheck;
use crate::errors::{ReadError, WriteError};

macro_rules! write_result {
    ($dst:expr, $($arg:tt)*) => {
        write!($dst, $($arg)*).map_err(WriteError::CouldNotWriteResults)?
    };
}

/// Weights of a single node.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters, Serialize, Deserialize)]
pub struct NodeWeights {
    /// Weight estimated directly from the sampling (normalized over the active nodes).
    #[getset(get_copy = "pub")]
    direct: f64,
    /// Weight corrected by the symmetrization of the overlap matrix (normalized over the active nodes).
    #[getset(get_copy = "pub")]
    corrected: f64,
}

impl NodeWeights {
    pub(crate) fn new(direct: f64, corrected: f64) -> Self {
        Self { direct, corrected }
    }
}

/// Convergence flags of the iterative parts of the analysis.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters, Serialize, Deserialize)]
pub struct ConvergenceSummary {
    /// Has the weight correction converged?
    #[getset(get_copy = "pub")]
    pub(crate) weights_converged: bool,
    /// Number of iterations of the weight correction.
    #[getset(get_copy = "pub")]
    pub(crate) weight_iterations: usize,
    /// Has the symmetrization of the overlap matrix converged?
    #[getset(get_copy = "pub")]
    pub(crate) matrix_converged: bool,
    /// Number of iterations of the symmetrization.
    #[getset(get_copy = "pub")]
    pub(crate) matrix_iterations: usize,
    /// Has the optimization of the membership matrix converged?
    /// `None` if the optimization was not requested.
    #[getset(get_copy = "pub")]
    pub(crate) chi_optimization_converged: Option<bool>,
}

impl ConvergenceSummary {
    /// Did every iterative part of the analysis converge?
    pub fn all_converged(&self) -> bool {
        self.weights_converged
            && self.matrix_converged
            && self.chi_optimization_converged.unwrap_or(true)
    }
}

/// Results of the PCCA+ analysis.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisResults {
    /// Names of the nodes included in the analysis (in the order of the matrix rows).
    #[getset(get = "pub")]
    pub(crate) node_names: Vec<String>,
    /// Number of identified metastable clusters.
    #[getset(get_copy = "pub")]
    pub(crate) n_clusters: usize,
    /// Number of clusters suggested by the largest eigenvalue-weighted gap.
    #[getset(get_copy = "pub")]
    pub(crate) suggested_clusters: usize,
    /// Number of eigenvalues in the Perron cluster.
    #[getset(get_copy = "pub")]
    pub(crate) perron_cluster: usize,
    /// Direct and corrected weights of the individual nodes.
    #[getset(get = "pub")]
    pub(crate) weights: IndexMap<String, NodeWeights>,
    /// Overlap matrix of the nodes.
    #[getset(get = "pub")]
    #[serde(with = "matrix_rows")]
    pub(crate) overlap_matrix: DMatrix<f64>,
    /// Symmetrized row-stochastic overlap matrix.
    #[getset(get = "pub")]
    #[serde(with = "matrix_rows")]
    pub(crate) symmetrized_matrix: DMatrix<f64>,
    /// Eigenvalues of the symmetrized matrix in descending order.
    #[getset(get = "pub")]
    pub(crate) eigenvalues: Vec<f64>,
    /// Differences between consecutive eigenvalues.
    #[getset(get = "pub")]
    pub(crate) gaps: Vec<f64>,
    /// Gaps multiplied by the corresponding eigenvalues.
    #[getset(get = "pub")]
    pub(crate) weighted_gaps: Vec<f64>,
    /// Membership matrix (nodes × clusters).
    #[getset(get = "pub")]
    #[serde(with = "matrix_rows")]
    pub(crate) chi_matrix: DMatrix<f64>,
    /// Rotation matrix transforming the eigenvectors into the membership matrix.
    #[getset(get = "pub")]
    #[serde(with = "matrix_rows")]
    pub(crate) rotation_matrix: DMatrix<f64>,
    /// Generator matrix of the clusters.
    #[getset(get = "pub")]
    #[serde(with = "matrix_rows")]
    pub(crate) qc_matrix: DMatrix<f64>,
    /// Statistical weights of the clusters.
    #[getset(get = "pub")]
    pub(crate) cluster_weights: Vec<f64>,
    /// Largest element of the membership matrix.
    #[getset(get_copy = "pub")]
    pub(crate) c_f: f64,
    /// Smallest element of the membership matrix.
    #[getset(get_copy = "pub")]
    pub(crate) indicator: f64,
    /// Numerical sanity check of the results.
    #[getset(get = "pub")]
    pub(crate) numerics: NumericsCheck,
    /// Convergence of the iterative parts of the analysis.
    #[getset(get_copy = "pub")]
    pub(crate) convergence: ConvergenceSummary,
}

impl AnalysisResults {
    /// Get the number of nodes included in the analysis.
    pub fn n_nodes(&self) -> usize {
        self.node_names.len()
    }

    /// Get the index of the node with the specified name.
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.node_names.iter().position(|n| n == name)
    }

    /// Get the memberships of the node with the specified name in the individual clusters.
    pub fn membership(&self, name: &str) -> Option<DVector<f64>> {
        self.node_index(name)
            .map(|i| self.chi_matrix.row(i).transpose())
    }

    /// Get the index of the cluster in which the node with the specified name has the highest membership.
    pub fn dominant_cluster(&self, name: &str) -> Option<usize> {
        self.node_index(name)
            .map(|i| self.chi_matrix.row(i).transpose().argmax().0)
    }

    /// Write the results of the analysis into a YAML file.
    pub fn write(&self, filename: impl AsRef<Path>) -> Result<(), WriteError> {
        let file = File::create(filename.as_ref())
            .map_err(|_| WriteError::CouldNotCreateFile(Box::from(filename.as_ref())))?;
        let mut writer = BufWriter::new(file);

        write_result!(
            writer,
            "# Markov state model of {} nodes and {} clusters constructed with 'pccaplus v{}'.\n",
            self.n_nodes(),
            self.n_clusters,
            crate::PCCAPLUS_VERSION
        );

        serde_yaml::to_writer(&mut writer, self).map_err(WriteError::CouldNotWriteYaml)?;
        writer.flush().map_err(WriteError::CouldNotWriteResults)?;

        colog_info!(
            "Written the results into '{}'.",
            filename.as_ref().display()
        );
        Ok(())
    }

    /// Read the results of a previous analysis from a YAML file.
    pub fn from_file(filename: impl AsRef<Path>) -> Result<Self, ReadError> {
        let name = filename.as_ref().display().to_string();
        let string = read_to_string(filename.as_ref())
            .map_err(|_| ReadError::FileNotFound(name.clone()))?;

        serde_yaml::from_str(&string).map_err(|e| ReadError::CouldNotParse(name, e))
    }
}

/// (De)serialization of a matrix as a list of its rows.
mod matrix_rows {
    use nalgebra::DMatrix;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S>(matrix: &DMatrix<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rows: Vec<Vec<f64>> = matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();

        rows.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DMatrix<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows: Vec<Vec<f64>> = Vec::deserialize(deserializer)?;
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, |row| row.len());

        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != ncols) {
            return Err(de::Error::custom(format!(
                "row {} of a matrix has {} elements, expected {}",
                index,
                row.len(),
                ncols
            )));
        }

        Ok(DMatrix::from_row_iterator(
            nrows,
            ncols,
            rows.into_iter().flatten(),
        ))
    }
}
