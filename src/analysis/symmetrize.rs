// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Symmetrization of the overlap matrix and correction of the node weights.

use getset::{CopyGetters, Getters};
use nalgebra::{DMatrix, DVector};

use crate::{errors::SymmetrizeError, input::Symmetrization};

/// Result of the symmetrization of the overlap matrix.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct SymmetrizedMatrix {
    /// Symmetric matrix with row sums equal to the corrected node weights.
    #[getset(get = "pub")]
    balanced: DMatrix<f64>,
    /// Row-stochastic matrix obtained by normalizing the rows of the balanced matrix.
    /// Satisfies detailed balance with respect to the row sums of the balanced matrix.
    #[getset(get = "pub")]
    stochastic: DMatrix<f64>,
    /// Corrected node weights.
    #[getset(get = "pub")]
    weights: DVector<f64>,
    /// Has the weight correction converged?
    #[getset(get_copy = "pub")]
    weights_converged: bool,
    /// Number of iterations of the weight correction.
    #[getset(get_copy = "pub")]
    weight_iterations: usize,
    /// Has the balancing of the matrix converged?
    #[getset(get_copy = "pub")]
    matrix_converged: bool,
    /// Number of iterations of the matrix balancing.
    #[getset(get_copy = "pub")]
    matrix_iterations: usize,
}

impl SymmetrizedMatrix {
    /// Have both the weight correction and the matrix balancing converged?
    pub fn converged(&self) -> bool {
        self.weights_converged && self.matrix_converged
    }

    /// Stationary distribution of the row-stochastic matrix, i.e. the normalized row sums
    /// of the balanced matrix.
    pub fn stationary(&self) -> DVector<f64> {
        let row_sums = row_sums(&self.balanced);
        let total = row_sums.sum();
        row_sums / total
    }
}

/// Sums of the individual rows of a matrix.
#[inline]
fn row_sums(matrix: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        matrix.nrows(),
        (0..matrix.nrows()).map(|i| matrix.row(i).sum()),
    )
}

/// Symmetrize the overlap matrix `matrix` using the node `weights`.
///
/// ## Algorithm
/// 1. If requested, the weights are corrected by iterating `w ← Sᵀw` until the change
///    of the weights is lower than the tolerance.
/// 2. The rows of the matrix are rescaled to sum to the node weights and the matrix is
///    symmetrized by averaging it with its transpose. This is repeated until the change
///    of the matrix (Frobenius norm) is lower than the tolerance.
/// 3. The rows of the balanced matrix are normalized to obtain a row-stochastic matrix.
///
/// Reaching the maximal number of iterations in any of the loops is not an error.
/// The result is returned and flagged as not converged.
///
/// ## Returns
/// - `SymmetrizedMatrix` containing the balanced matrix, the row-stochastic matrix and the corrected weights.
/// - `SymmetrizeError` if the matrix is not square, does not match the weights, contains
///   invalid elements, or if any of its rows sums to zero.
pub fn symmetrize(
    matrix: &DMatrix<f64>,
    weights: &DVector<f64>,
    params: &Symmetrization,
) -> Result<SymmetrizedMatrix, SymmetrizeError> {
    params
        .validate()
        .map_err(SymmetrizeError::InvalidParameters)?;

    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(SymmetrizeError::NotSquare(n, matrix.ncols()));
    }

    if weights.len() != n {
        return Err(SymmetrizeError::InconsistentWeights(n, weights.len()));
    }

    for i in 0..n {
        for j in 0..n {
            let value = matrix[(i, j)];
            if !value.is_finite() || value < 0.0 {
                return Err(SymmetrizeError::InvalidElement(i, j, value));
            }
        }
    }

    for (i, &w) in weights.iter().enumerate() {
        if !w.is_finite() || w < 0.0 {
            return Err(SymmetrizeError::InvalidWeight(i, w));
        }
    }

    let tolerance = params.tolerance();
    let max_iterations = params.max_iterations();

    // correct the weights
    let mut weights = weights.clone();
    let mut weights_converged = true;
    let mut weight_iterations = 0;
    if params.correct_weights() {
        weights_converged = false;
        while weight_iterations < max_iterations {
            let new_weights = matrix.tr_mul(&weights);
            let change = (&weights - &new_weights).norm();
            weights = new_weights;
            weight_iterations += 1;

            if change < tolerance {
                weights_converged = true;
                break;
            }
        }

        if weights_converged {
            log::debug!(
                "Weight correction converged after {} iterations.",
                weight_iterations
            );
        } else {
            colog_warn!(
                "Weight correction did not converge within {} iterations. Using the last available weights.",
                max_iterations
            );
        }
    }

    // balance and symmetrize the matrix
    let mut balanced = matrix.clone();
    let mut matrix_converged = false;
    let mut matrix_iterations = 0;
    while matrix_iterations < max_iterations {
        let sums = row_sums(&balanced);
        if let Some(i) = sums.iter().position(|&s| s <= 0.0) {
            return Err(SymmetrizeError::ZeroRowSum(i));
        }

        let scaled = DMatrix::from_fn(n, n, |i, j| balanced[(i, j)] * weights[i] / sums[i]);
        let new_balanced = (&scaled + scaled.transpose()) * 0.5;
        let change = (&balanced - &new_balanced).norm();
        balanced = new_balanced;
        matrix_iterations += 1;

        if change < tolerance {
            matrix_converged = true;
            break;
        }
    }

    if matrix_converged {
        log::debug!(
            "Matrix symmetrization converged after {} iterations.",
            matrix_iterations
        );
    } else {
        colog_warn!(
            "Matrix symmetrization did not converge within {} iterations. Using the last available matrix.",
            max_iterations
        );
    }

    // normalize rows
    let sums = row_sums(&balanced);
    if let Some(i) = sums.iter().position(|&s| s <= 0.0) {
        return Err(SymmetrizeError::ZeroRowSum(i));
    }
    let stochastic = DMatrix::from_fn(n, n, |i, j| balanced[(i, j)] / sums[i]);

    Ok(SymmetrizedMatrix {
        balanced,
        stochastic,
        weights,
        weights_converged,
        weight_iterations,
        matrix_converged,
        matrix_iterations,
    })
}
