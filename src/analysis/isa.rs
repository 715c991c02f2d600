// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Identification of metastable clusters using the Inner Simplex Algorithm (ISA).

use getset::{CopyGetters, Getters};
use nalgebra::DMatrix;

use crate::errors::ClusterError;

/// Relative size of the residual below which a candidate vertex is considered
/// linearly dependent on the previously selected vertices.
const SIMPLEX_EPSILON: f64 = 1e-12;
/// Reciprocal condition number of the vertex matrix below which it is considered singular.
pub(crate) const RCOND_THRESHOLD: f64 = 1e-12;

/// Result of the Inner Simplex Algorithm.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct IsaClustering {
    /// Membership matrix (nodes × clusters). Rows sum to one.
    #[getset(get = "pub")]
    chi: DMatrix<f64>,
    /// Rotation matrix transforming the eigenvectors into the membership matrix.
    #[getset(get = "pub")]
    rotation: DMatrix<f64>,
    /// Indices of the nodes selected as the vertices of the simplex.
    #[getset(get = "pub")]
    vertices: Vec<usize>,
    /// Largest element of the membership matrix.
    #[getset(get_copy = "pub")]
    c_f: f64,
    /// Smallest element of the membership matrix (indicator of the quality of the simplex).
    #[getset(get_copy = "pub")]
    indicator: f64,
}

impl IsaClustering {
    /// Number of identified clusters.
    pub fn n_clusters(&self) -> usize {
        self.rotation.nrows()
    }
}

/// Calculate the reciprocal condition number of a square matrix from its singular values.
pub(crate) fn reciprocal_condition(matrix: &DMatrix<f64>) -> f64 {
    let singular = matrix.clone().svd(false, false).singular_values;
    let max = singular.max();
    let min = singular.min();

    if max > 0.0 {
        min / max
    } else {
        0.0
    }
}

/// Identify `n_clusters` metastable clusters from the (weight-orthonormalized) eigenvectors.
///
/// The first `n_clusters` eigenvectors define a point for every node. The algorithm
/// searches for the nodes spanning the largest simplex in this space:
/// 1. The node with the largest norm is the first vertex. It is subtracted from all points.
/// 2. For every next vertex, the direction of the previous vertex is projected out from all points,
///    the point with the largest residual becomes the next vertex and the points are rescaled by that residual.
///
/// The inverse of the matrix composed of the vertex rows is the rotation matrix
/// and the membership matrix is `chi = eigenvectors[:, :n_clusters] · rotation`.
///
/// If `n_clusters` exceeds the number of eigenvectors, it is reduced (with a warning).
///
/// ## Returns
/// - `IsaClustering` containing the membership matrix, the rotation matrix and the vertices.
/// - `ClusterError::NoClusters` if `n_clusters` is zero.
/// - `ClusterError::DegenerateSimplex` if the vertices do not span a simplex.
pub fn cluster_by_isa(
    eigenvectors: &DMatrix<f64>,
    n_clusters: usize,
) -> Result<IsaClustering, ClusterError> {
    if n_clusters == 0 {
        return Err(ClusterError::NoClusters);
    }

    let available = eigenvectors.ncols().min(eigenvectors.nrows());
    let k = if n_clusters > available {
        colog_warn!(
            "Requested {} clusters but only {} eigenvectors are available. Using {} clusters.",
            n_clusters,
            available,
            available
        );
        available
    } else {
        n_clusters
    };

    if k == 0 {
        return Err(ClusterError::NoClusters);
    }

    let points = eigenvectors.columns(0, k).clone_owned();
    let n = points.nrows();
    let row_norm = |matrix: &DMatrix<f64>, i: usize| -> f64 {
        (0..k).map(|j| matrix[(i, j)].powi(2)).sum::<f64>().sqrt()
    };

    let mut vertices = Vec::with_capacity(k);

    // first vertex: the point with the largest norm
    let mut max_distance = 0.0;
    let mut first_vertex = 0;
    for i in 0..n {
        let distance = row_norm(&points, i);
        if distance > max_distance {
            max_distance = distance;
            first_vertex = i;
        }
    }

    if max_distance <= 0.0 {
        return Err(ClusterError::DegenerateSimplex(0));
    }
    let scale = max_distance;
    vertices.push(first_vertex);

    // shift the system so that the first vertex is at the origin
    let mut system = points.clone();
    for i in 0..n {
        for j in 0..k {
            system[(i, j)] -= points[(first_vertex, j)];
        }
    }

    let mut previous = first_vertex;
    for v in 1..k {
        let direction: Vec<f64> = (0..k).map(|j| system[(previous, j)]).collect();

        let mut max_distance = 0.0;
        let mut next_vertex = 0;
        for i in 0..n {
            let projection: f64 = (0..k).map(|j| direction[j] * system[(i, j)]).sum();
            for (j, d) in direction.iter().enumerate() {
                system[(i, j)] -= projection * d;
            }

            let distance = row_norm(&system, i);
            if distance > max_distance {
                max_distance = distance;
                next_vertex = i;
            }
        }

        if max_distance <= SIMPLEX_EPSILON * scale || vertices.contains(&next_vertex) {
            return Err(ClusterError::DegenerateSimplex(v));
        }

        system /= max_distance;
        vertices.push(next_vertex);
        previous = next_vertex;
    }

    let vertex_matrix = DMatrix::from_fn(k, k, |a, b| points[(vertices[a], b)]);
    if reciprocal_condition(&vertex_matrix) < RCOND_THRESHOLD {
        return Err(ClusterError::DegenerateSimplex(k - 1));
    }

    let rotation = vertex_matrix
        .try_inverse()
        .ok_or(ClusterError::DegenerateSimplex(k - 1))?;

    let chi = &points * &rotation;
    let c_f = chi.max();
    let indicator = chi.min();

    colog_info!(
        "Inner simplex algorithm identified {} clusters with vertices at nodes {}.",
        k,
        vertices
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<String>>()
            .join(", ")
    );
    log::info!(
        "Membership matrix: maximum = {:.6}, minimum (indicator) = {:.6}.",
        c_f,
        indicator
    );

    Ok(IsaClustering {
        chi,
        rotation,
        vertices,
        c_f,
        indicator,
    })
}
