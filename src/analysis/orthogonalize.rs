// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Weighted orthonormalization of the eigenvectors.

use nalgebra::{DMatrix, DVector};

use crate::errors::ClusterError;

/// Eigenvalues larger than this value belong to the Perron cluster.
pub const PERRON_THRESHOLD: f64 = 0.9999;

/// Count the leading eigenvalues that belong to the Perron cluster,
/// i.e. the number of eigenvalues at the start of the (descending) spectrum that are larger than [`PERRON_THRESHOLD`].
pub fn perron_cluster_size(eigenvalues: &DVector<f64>) -> usize {
    eigenvalues
        .iter()
        .take_while(|&&value| value > PERRON_THRESHOLD)
        .count()
}

/// Inner product of `u` and `v` weighted by `weights`.
#[inline(always)]
fn weighted_dot(u: &DVector<f64>, v: &DVector<f64>, weights: &DVector<f64>) -> f64 {
    u.component_mul(weights).dot(v)
}

/// Orthonormalize the eigenvectors with respect to the inner product weighted by the node weights.
///
/// If the Perron cluster contains more than one eigenvalue, the eigenvectors of the Perron cluster
/// are not uniquely defined. In that case, the eigenvector with the largest overlap with the weights
/// is replaced by the first eigenvector, the first eigenvector is replaced by a constant vector and
/// the eigenvectors of the Perron cluster are orthogonalized using the weighted Gram-Schmidt process.
/// Every eigenvector is then normalized to unit weighted norm.
///
/// ## Returns
/// - New matrix of weight-orthonormalized eigenvectors (columns).
/// - `ClusterError` if the weights are invalid or any eigenvector has zero weighted norm.
pub fn orthogonalize(
    eigenvalues: &DVector<f64>,
    eigenvectors: &DMatrix<f64>,
    weights: &DVector<f64>,
) -> Result<DMatrix<f64>, ClusterError> {
    let n = eigenvectors.nrows();
    if weights.len() != n {
        return Err(ClusterError::InconsistentWeights(weights.len(), n));
    }

    if weights.iter().any(|&w| !w.is_finite() || w < 0.0) || weights.sum() <= 0.0 {
        return Err(ClusterError::InvalidWeights);
    }

    let mut result = eigenvectors.clone();
    let perron = perron_cluster_size(eigenvalues).min(result.ncols());

    if perron > 1 {
        log::info!(
            "Perron cluster contains {} eigenvalues. Orthogonalizing its eigenvectors.",
            perron
        );

        let mut max_overlap = 0.0;
        let mut max_index = 0;
        for i in 0..perron {
            let overlap = result.column(i).dot(weights).abs();
            if overlap > max_overlap {
                max_overlap = overlap;
                max_index = i;
            }
        }

        let first = result.column(0).clone_owned();
        result.set_column(max_index, &first);
        result.set_column(0, &DVector::from_element(n, 1.0));

        for i in 1..perron {
            let mut current = result.column(i).clone_owned();
            for j in 0..i {
                let previous = result.column(j).clone_owned();
                let norm2 = weighted_dot(&previous, &previous, weights);
                if norm2 <= 0.0 {
                    return Err(ClusterError::ZeroNormEigenvector(j));
                }

                let projection = weighted_dot(&previous, &current, weights) / norm2;
                current.axpy(-projection, &previous, 1.0);
            }
            result.set_column(i, &current);
        }
    }

    for i in 0..result.ncols() {
        let column = result.column(i).clone_owned();
        let norm2 = weighted_dot(&column, &column, weights);
        if norm2.is_nan() || norm2 <= 0.0 {
            return Err(ClusterError::ZeroNormEigenvector(i));
        }

        result.set_column(i, &(column / norm2.sqrt()));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::analysis::spectral::Spectrum;

    use super::*;

    /// Two uncoupled blocks. The Perron cluster is degenerate.
    fn reducible() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            5,
            5,
            &[
                0.30, 0.10, 0.00, 0.00, 0.00, //
                0.10, 0.20, 0.00, 0.00, 0.00, //
                0.00, 0.00, 0.10, 0.05, 0.02, //
                0.00, 0.00, 0.05, 0.04, 0.01, //
                0.00, 0.00, 0.02, 0.01, 0.00, //
            ],
        )
    }

    fn row_sums(matrix: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_iterator(
            matrix.nrows(),
            (0..matrix.nrows()).map(|i| matrix.row(i).sum()),
        )
    }

    fn assert_weighted_orthonormal(vectors: &DMatrix<f64>, weights: &DVector<f64>) {
        let gram = vectors.transpose() * DMatrix::from_diagonal(weights) * vectors;
        assert_relative_eq!(
            gram,
            DMatrix::identity(vectors.ncols(), vectors.ncols()),
            epsilon = 1e-10
        );
    }

    #[test]
    fn perron_size() {
        let eigenvalues = DVector::from_vec(vec![1.0, 0.99995, 0.9998, 0.99999, 0.5]);
        assert_eq!(perron_cluster_size(&eigenvalues), 2);

        let eigenvalues = DVector::from_vec(vec![0.5, 0.2]);
        assert_eq!(perron_cluster_size(&eigenvalues), 0);
    }

    #[test]
    fn degenerate_perron_cluster() {
        let balanced = reducible();
        let spectrum = Spectrum::from_balanced(&balanced).unwrap();
        assert_eq!(perron_cluster_size(spectrum.eigenvalues()), 2);

        let weights = row_sums(&balanced);
        let result =
            orthogonalize(spectrum.eigenvalues(), spectrum.eigenvectors(), &weights).unwrap();

        assert_weighted_orthonormal(&result, &weights);

        // first eigenvector is constant
        let c = result[(0, 0)];
        for i in 1..5 {
            assert_relative_eq!(result[(i, 0)], c, epsilon = 1e-12);
        }
        assert_relative_eq!(c, 1.0 / weights.sum().sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn non_degenerate() {
        let balanced = DMatrix::from_row_slice(
            3,
            3,
            &[
                0.40, 0.05, 0.01, //
                0.05, 0.30, 0.04, //
                0.01, 0.04, 0.10, //
            ],
        );
        let spectrum = Spectrum::from_balanced(&balanced).unwrap();
        let weights = row_sums(&balanced);

        let result =
            orthogonalize(spectrum.eigenvalues(), spectrum.eigenvectors(), &weights).unwrap();
        assert_weighted_orthonormal(&result, &weights);

        // the columns only get rescaled
        for k in 0..3 {
            let scale = result[(0, k)] / spectrum.eigenvectors()[(0, k)];
            for i in 0..3 {
                assert_relative_eq!(
                    result[(i, k)],
                    spectrum.eigenvectors()[(i, k)] * scale,
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn fail_zero_norm() {
        let eigenvalues = DVector::from_vec(vec![0.5, 0.3]);
        let eigenvectors = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 0.0]);

        match orthogonalize(&eigenvalues, &eigenvectors, &DVector::from_element(2, 0.5)) {
            Ok(_) => panic!("Function should have failed."),
            Err(ClusterError::ZeroNormEigenvector(1)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }

    #[test]
    fn fail_invalid_weights() {
        let eigenvalues = DVector::from_vec(vec![1.0, 0.3]);
        let eigenvectors = DMatrix::identity(2, 2);

        match orthogonalize(&eigenvalues, &eigenvectors, &DVector::from_element(3, 0.5)) {
            Ok(_) => panic!("Function should have failed."),
            Err(ClusterError::InconsistentWeights(3, 2)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }

        match orthogonalize(&eigenvalues, &eigenvectors, &DVector::from_element(2, 0.0)) {
            Ok(_) => panic!("Function should have failed."),
            Err(ClusterError::InvalidWeights) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }
}
