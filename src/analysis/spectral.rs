// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Eigendecomposition of the symmetrized overlap matrix.

use getset::{CopyGetters, Getters};
use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::errors::SpectralError;

use super::symmetrize::SymmetrizedMatrix;

/// Sorted eigenspectrum of the row-stochastic symmetrized overlap matrix.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Spectrum {
    /// Eigenvalues sorted in descending order.
    #[getset(get = "pub")]
    eigenvalues: DVector<f64>,
    /// Right eigenvectors (columns) matching the eigenvalues.
    #[getset(get = "pub")]
    eigenvectors: DMatrix<f64>,
    /// Differences between consecutive eigenvalues. The last gap is zero.
    #[getset(get = "pub")]
    gaps: DVector<f64>,
    /// Gaps multiplied by the corresponding eigenvalues.
    #[getset(get = "pub")]
    weighted_gaps: DVector<f64>,
    /// Number of clusters suggested by the largest weighted gap.
    #[getset(get_copy = "pub")]
    suggested_clusters: usize,
}

impl Spectrum {
    /// Calculate the eigenspectrum of the row-stochastic matrix of the symmetrization.
    pub fn new(symmetrized: &SymmetrizedMatrix) -> Result<Self, SpectralError> {
        Self::from_balanced(symmetrized.balanced())
    }

    /// Calculate the eigenspectrum of the row-stochastic matrix `M = D⁻¹B`
    /// where `B` is the symmetric `balanced` matrix and `D` contains its row sums.
    ///
    /// `M` is similar to the symmetric matrix `D^(-1/2) B D^(-1/2)` which is decomposed instead.
    /// The eigenvalues are therefore real and the eigenvectors of `M` are obtained
    /// as `v = D^(-1/2) u`.
    ///
    /// The eigenvalues are sorted in descending order (ties keep the order of the solver)
    /// and the sign of each eigenvector is chosen so that its largest-magnitude component is positive.
    pub fn from_balanced(balanced: &DMatrix<f64>) -> Result<Self, SpectralError> {
        let n = balanced.nrows();
        if balanced.ncols() != n {
            return Err(SpectralError::NotSquare(n, balanced.ncols()));
        }

        let mut scaling = Vec::with_capacity(n);
        for i in 0..n {
            let sum = balanced.row(i).sum();
            if sum.is_nan() || sum <= 0.0 {
                return Err(SpectralError::NonPositiveRowSum(i));
            }
            scaling.push(1.0 / sum.sqrt());
        }

        let similar = DMatrix::from_fn(n, n, |i, j| {
            0.5 * (balanced[(i, j)] + balanced[(j, i)]) * scaling[i] * scaling[j]
        });

        let eigen = SymmetricEigen::new(similar);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let eigenvalues = DVector::from_iterator(n, order.iter().map(|&i| eigen.eigenvalues[i]));
        let mut eigenvectors =
            DMatrix::from_fn(n, n, |row, col| eigen.eigenvectors[(row, order[col])] * scaling[row]);

        for mut column in eigenvectors.column_iter_mut() {
            let largest = column.iamax();
            if column[largest] < 0.0 {
                column.neg_mut();
            }
        }

        let mut gaps = DVector::zeros(n);
        for i in 0..n.saturating_sub(1) {
            gaps[i] = eigenvalues[i] - eigenvalues[i + 1];
        }

        let weighted_gaps = gaps.component_mul(&eigenvalues);

        let mut suggested_clusters = if n > 0 { 1 } else { 0 };
        let mut max_gap = f64::NEG_INFINITY;
        for (i, &gap) in weighted_gaps.iter().enumerate() {
            if gap > max_gap {
                max_gap = gap;
                suggested_clusters = i + 1;
            }
        }

        Ok(Self {
            eigenvalues,
            eigenvectors,
            gaps,
            weighted_gaps,
            suggested_clusters,
        })
    }

    /// Number of eigenvalues.
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Returns `true` if the spectrum contains no eigenvalues.
    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    /// Log the sorted eigenvalues together with the gaps.
    pub(crate) fn log_info(&self) {
        for i in 0..self.len() {
            log::info!(
                "EV{:04}: {:>12.8}   gap: {:>12.8}   weighted gap: {:>12.8}",
                i + 1,
                self.eigenvalues[i],
                self.gaps[i],
                self.weighted_gaps[i]
            );
        }

        colog_info!(
            "Largest eigenvalue-weighted gap suggests {} cluster(s).",
            self.suggested_clusters
        );
    }
}
