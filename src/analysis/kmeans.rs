// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Weighted k-means clustering of sample points.
//!
//! Used to place new nodes into the sampled region, optionally keeping
//! the positions of already existing nodes fixed.

use getset::{CopyGetters, Getters};
use nalgebra::DVector;
use rand::{seq::SliceRandom, Rng};

use crate::{
    errors::KMeansError,
    input::KMeans,
    structures::{Metric, WeightedSamples},
};

/// Result of the weighted k-means clustering.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct KMeansResult {
    /// Positions of the movable cluster centers.
    #[getset(get = "pub")]
    centers: Vec<DVector<f64>>,
    /// Index of the closest center for every sample.
    /// Indices `0..k` refer to the movable centers, indices `k..` refer to the fixed centers.
    #[getset(get = "pub")]
    memberships: Vec<usize>,
    /// Number of performed iterations.
    #[getset(get_copy = "pub")]
    iterations: usize,
    /// Mean squared movement of the centers in the last iteration.
    #[getset(get_copy = "pub")]
    progress: f64,
    /// Has the clustering converged?
    #[getset(get_copy = "pub")]
    converged: bool,
}

impl KMeansResult {
    /// Number of samples assigned to each of the centers (movable centers first, then fixed).
    pub fn cluster_sizes(&self, n_fixed: usize) -> Vec<usize> {
        let mut sizes = vec![0; self.centers.len() + n_fixed];
        for &m in self.memberships.iter() {
            sizes[m] += 1;
        }

        sizes
    }
}

/// Index of the center closest to the point.
#[inline]
fn closest<M: Metric>(metric: &M, point: &DVector<f64>, centers: &[&DVector<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let distance = metric.dist2(point.as_slice(), center.as_slice());
        if distance < best_distance {
            best_distance = distance;
            best = c;
        }
    }

    best
}

/// Assign every sample to its closest center.
fn assign<M: Metric>(
    metric: &M,
    samples: &WeightedSamples,
    movable: &[DVector<f64>],
    fixed: &[DVector<f64>],
) -> Vec<usize> {
    let centers: Vec<&DVector<f64>> = movable.iter().chain(fixed.iter()).collect();
    samples
        .points()
        .iter()
        .map(|point| closest(metric, point, &centers))
        .collect()
}

/// Cluster weighted samples into `k` clusters using the k-means algorithm.
///
/// The initial positions of the `k` movable centers are randomly selected samples.
/// In every iteration, each sample is assigned to the closest center (movable or `fixed`)
/// and every movable center is moved to the weighted mean of its samples as defined
/// by the `metric` (circular mean along periodic coordinates).
/// Centers with no samples assigned keep their position. The clustering converges
/// once the mean squared movement of the movable centers drops below `params.threshold`.
///
/// Reaching the maximal number of iterations is not an error; the result is flagged as not converged.
///
/// ## Returns
/// - `KMeansResult` with the positions of the movable centers and the memberships of the samples.
/// - `KMeansError` if `k` is zero, larger than the number of samples, or if the dimensions do not match.
pub fn kmeans<M: Metric, R: Rng + ?Sized>(
    samples: &WeightedSamples,
    k: usize,
    fixed: &[DVector<f64>],
    metric: &M,
    params: &KMeans,
    rng: &mut R,
) -> Result<KMeansResult, KMeansError> {
    params.validate().map_err(KMeansError::InvalidParameters)?;

    if k == 0 {
        return Err(KMeansError::NoClusters);
    }

    if k > samples.len() {
        return Err(KMeansError::TooManyClusters(k, samples.len()));
    }

    for (index, center) in fixed.iter().enumerate() {
        if center.len() != samples.n_dims() {
            return Err(KMeansError::InconsistentDimension {
                index,
                got: center.len(),
                expected: samples.n_dims(),
            });
        }
    }

    let mut indices: Vec<usize> = (0..samples.len()).collect();
    indices.shuffle(rng);
    let mut centers: Vec<DVector<f64>> = indices[..k]
        .iter()
        .map(|&i| samples.points()[i].clone())
        .collect();

    let mut iterations = 0;
    let mut progress = f64::INFINITY;
    let mut converged = false;

    while iterations < params.max_iterations() {
        iterations += 1;
        let memberships = assign(metric, samples, &centers, fixed);

        let mut members: Vec<Vec<(&DVector<f64>, f64)>> = vec![Vec::new(); k];
        for ((point, weight), &m) in samples.iter().zip(memberships.iter()) {
            if m < k {
                members[m].push((point, weight));
            }
        }

        let mut movement = 0.0;
        for (center, assigned) in centers.iter_mut().zip(members.iter()) {
            let new = match metric.mean_weighted(assigned) {
                Some(x) => x,
                None => continue,
            };

            movement += metric.dist2(center.as_slice(), new.as_slice());
            *center = new;
        }

        progress = movement / k as f64;
        log::debug!("k-means iteration {}: progress {:.6e}", iterations, progress);

        if progress < params.threshold() {
            converged = true;
            break;
        }
    }

    if !converged {
        colog_warn!(
            "K-means clustering did not converge within {} iterations (last progress: {}).",
            params.max_iterations(),
            format!("{:.3e}", progress)
        );
    }

    let memberships = assign(metric, samples, &centers, fixed);

    Ok(KMeansResult {
        centers,
        memberships,
        iterations,
        progress,
        converged,
    })
}
