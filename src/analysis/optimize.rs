// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Optimization of the membership matrix obtained from the Inner Simplex Algorithm.
//!
//! The rotation matrix is refined so that the memberships of the representative nodes
//! are non-negative and as crisp as possible (PCCA+ objective).

use getset::{CopyGetters, Getters};
use hashbrown::HashSet;
use nalgebra::{DMatrix, DVector};

use crate::{
    analysis::isa::{reciprocal_condition, IsaClustering, RCOND_THRESHOLD},
    errors::ClusterError,
    input::ChiOptimization,
};

/// Rows of the membership matrix with maximum larger than this are vertices of the simplex.
const VERTEX_THRESHOLD: f64 = 0.9999;

/// Result of the optimization of the membership matrix.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct OptimizedChi {
    /// Optimized membership matrix (nodes × clusters).
    #[getset(get = "pub")]
    chi: DMatrix<f64>,
    /// Optimized rotation matrix.
    #[getset(get = "pub")]
    rotation: DMatrix<f64>,
    /// Indices of the nodes used in the optimization (vertices and heavy nodes).
    #[getset(get = "pub")]
    representatives: Vec<usize>,
    /// Light nodes whose memberships were shifted to be non-negative.
    #[getset(get = "pub")]
    shifted_rows: Vec<usize>,
    /// Light nodes which are vertices of the simplex. Their memberships are kept.
    #[getset(get = "pub")]
    light_vertex_rows: Vec<usize>,
    /// Weight below which a node is considered light.
    #[getset(get_copy = "pub")]
    threshold: f64,
    /// Crispness of the optimized membership matrix.
    #[getset(get_copy = "pub")]
    crispness: f64,
    /// Has the optimizer converged?
    #[getset(get_copy = "pub")]
    converged: bool,
    /// Number of iterations performed by the optimizer.
    #[getset(get_copy = "pub")]
    iterations: usize,
}

/// Optimize the membership matrix of the ISA clustering.
///
/// The free parameters are the lower-right `(k-1)×(k-1)` block of the rotation matrix.
/// The first column and the first row of the rotation matrix are completed so that the memberships
/// of the representative nodes are non-negative and sum to one. The crispness
/// `Σ_ij R[j,i]² / R[0,i]` of such a feasible rotation matrix is maximized using the
/// Nelder-Mead downhill simplex method.
///
/// Light nodes (weight lower than `outlier_percentage` % of the mean weight) do not take part
/// in the optimization. Once it is finished, their memberships are shifted to be non-negative,
/// unless they are vertices of the simplex.
///
/// ## Returns
/// - `OptimizedChi` containing the optimized membership and rotation matrices.
/// - `ClusterError::InconsistentWeights` if the weights do not match the eigenvectors.
/// - `ClusterError::NotEnoughEigenvalues` if there are fewer eigenvectors than clusters.
/// - `ClusterError::SingularRotation` if the optimized rotation matrix can not be inverted.
pub fn optimize_chi(
    eigenvectors: &DMatrix<f64>,
    isa: &IsaClustering,
    weights: &DVector<f64>,
    params: &ChiOptimization,
) -> Result<OptimizedChi, ClusterError> {
    let n = eigenvectors.nrows();
    let k = isa.n_clusters();

    if weights.len() != n || isa.chi().nrows() != n {
        return Err(ClusterError::InconsistentWeights(weights.len(), n));
    }

    if eigenvectors.ncols() < k {
        return Err(ClusterError::NotEnoughEigenvalues(k, eigenvectors.ncols()));
    }

    let threshold = weights.mean() * params.outlier_percentage() / 100.0;
    let points = eigenvectors.columns(0, k).clone_owned();

    let vertices: HashSet<usize> = (0..n)
        .filter(|&i| isa.chi().row(i).max() > VERTEX_THRESHOLD)
        .collect();

    let mut representatives: Vec<usize> = vertices
        .iter()
        .copied()
        .chain((0..n).filter(|&i| weights[i] > threshold))
        .collect::<HashSet<usize>>()
        .into_iter()
        .collect();
    representatives.sort_unstable();

    if k == 1 {
        log::info!("Single cluster. Membership matrix is not optimized.");
        return Ok(OptimizedChi {
            chi: isa.chi().clone(),
            rotation: isa.rotation().clone(),
            representatives,
            shifted_rows: Vec::new(),
            light_vertex_rows: Vec::new(),
            threshold,
            crispness: 1.0,
            converged: true,
            iterations: 0,
        });
    }

    let subset = DMatrix::from_fn(representatives.len(), k, |r, j| {
        points[(representatives[r], j)]
    });

    let mut start = Vec::with_capacity((k - 1) * (k - 1));
    for a in 1..k {
        for b in 1..k {
            start.push(isa.rotation()[(a, b)]);
        }
    }

    let optimizer = NelderMead {
        max_iterations: params.max_iterations(),
        xtol: params.xtol(),
        ftol: params.ftol(),
    };

    let result = optimizer.minimize(|x| objective(x, &subset, k), &start);

    let (rotation, crispness, converged) = match fill_rotation(&result.x, &subset, k) {
        Some(rotation) if result.value.is_finite() => (rotation, -result.value, result.converged),
        _ => {
            colog_warn!(
                "Could not find a feasible rotation matrix. Keeping the membership matrix of the inner simplex algorithm."
            );
            (isa.rotation().clone(), f64::NAN, false)
        }
    };

    if !converged {
        colog_warn!(
            "Optimization of the membership matrix did not converge within {} iterations.",
            params.max_iterations()
        );
    }

    if reciprocal_condition(&rotation) < RCOND_THRESHOLD || rotation.clone().try_inverse().is_none()
    {
        return Err(ClusterError::SingularRotation);
    }

    let mut chi = &points * &rotation;

    let mut shifted_rows = Vec::new();
    let mut light_vertex_rows = Vec::new();
    for i in 0..n {
        if weights[i] > threshold {
            continue;
        }

        if vertices.contains(&i) {
            light_vertex_rows.push(i);
            continue;
        }

        let min = chi.row(i).min();
        let denominator = 1.0 - k as f64 * min;
        if denominator.abs() < 1e-12 {
            continue;
        }

        for j in 0..k {
            chi[(i, j)] = (chi[(i, j)] - min) / denominator;
        }
        shifted_rows.push(i);
    }

    colog_info!(
        "Optimized membership matrix using {} representative nodes ({} iterations, crispness {}).",
        representatives.len(),
        result.iterations,
        format!("{:.6}", crispness)
    );

    if !shifted_rows.is_empty() {
        log::info!(
            "Shifted memberships of {} light node(s) to be non-negative.",
            shifted_rows.len()
        );
    }

    if !light_vertex_rows.is_empty() {
        colog_warn!(
            "Light node(s) {} are vertices of the simplex. Their memberships were not shifted.",
            light_vertex_rows
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        );
    }

    Ok(OptimizedChi {
        chi,
        rotation,
        representatives,
        shifted_rows,
        light_vertex_rows,
        threshold,
        crispness,
        converged,
        iterations: result.iterations,
    })
}

/// Construct a feasible rotation matrix from the free parameters `x`.
/// Returns `None` if no feasible matrix can be constructed.
fn fill_rotation(x: &[f64], subset: &DMatrix<f64>, k: usize) -> Option<DMatrix<f64>> {
    let mut rotation: DMatrix<f64> = DMatrix::zeros(k, k);
    for a in 1..k {
        for b in 1..k {
            rotation[(a, b)] = x[(a - 1) * (k - 1) + (b - 1)];
        }
    }

    // rows sum to zero
    for a in 1..k {
        let sum: f64 = (1..k).map(|b| rotation[(a, b)]).sum();
        rotation[(a, 0)] = -sum;
    }

    // memberships of the representatives are non-negative
    for j in 0..k {
        let mut max = f64::NEG_INFINITY;
        for l in 0..subset.nrows() {
            let first = subset[(l, 0)];
            if first <= 0.0 {
                return None;
            }

            let projection: f64 = (1..k).map(|a| subset[(l, a)] * rotation[(a, j)]).sum();
            max = max.max(-projection / first);
        }
        rotation[(0, j)] = max;
    }

    // partition of unity
    let total = subset.column(0).mean() * rotation.row(0).sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }

    Some(rotation / total)
}

/// Crispness of the membership matrix defined by a feasible rotation matrix.
fn crispness(rotation: &DMatrix<f64>) -> Option<f64> {
    let k = rotation.nrows();
    let mut total = 0.0;
    for i in 0..k {
        let first = rotation[(0, i)];
        if first.is_nan() || first <= 0.0 {
            return None;
        }

        for j in 0..k {
            total += rotation[(j, i)].powi(2) / first;
        }
    }

    Some(total)
}

/// Function minimized by the optimizer (negative crispness).
fn objective(x: &[f64], subset: &DMatrix<f64>, k: usize) -> f64 {
    match fill_rotation(x, subset, k).as_ref().and_then(crispness) {
        Some(value) if value.is_finite() => -value,
        _ => f64::INFINITY,
    }
}

/// Nelder-Mead downhill simplex minimizer.
#[derive(Debug, Clone, Copy)]
struct NelderMead {
    max_iterations: usize,
    xtol: f64,
    ftol: f64,
}

/// Result of the Nelder-Mead minimization.
#[derive(Debug, Clone)]
struct Minimum {
    x: Vec<f64>,
    value: f64,
    iterations: usize,
    converged: bool,
}

impl NelderMead {
    const REFLECTION: f64 = 1.0;
    const EXPANSION: f64 = 2.0;
    const CONTRACTION: f64 = 0.5;
    const SHRINK: f64 = 0.5;

    /// Relative size of the initial simplex.
    const NONZERO_STEP: f64 = 0.05;
    /// Size of the initial simplex along zero coordinates.
    const ZERO_STEP: f64 = 0.00025;

    /// Find the minimum of `function` starting from `start`.
    /// Not-a-number function values are treated as infinite.
    fn minimize(&self, function: impl Fn(&[f64]) -> f64, start: &[f64]) -> Minimum {
        let evaluate = |x: &[f64]| {
            let value = function(x);
            if value.is_nan() {
                f64::INFINITY
            } else {
                value
            }
        };

        let n = start.len();
        if n == 0 {
            return Minimum {
                x: Vec::new(),
                value: evaluate(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex = Vec::with_capacity(n + 1);
        simplex.push(start.to_vec());
        for i in 0..n {
            let mut point = start.to_vec();
            point[i] = if point[i] != 0.0 {
                (1.0 + Self::NONZERO_STEP) * point[i]
            } else {
                Self::ZERO_STEP
            };
            simplex.push(point);
        }

        let mut values: Vec<f64> = simplex.iter().map(|x| evaluate(x)).collect();

        let mut iterations = 0;
        let mut converged = false;
        loop {
            let mut order: Vec<usize> = (0..=n).collect();
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let x_spread = simplex[1..]
                .iter()
                .flat_map(|point| point.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
                .fold(0.0, f64::max);
            let f_spread = values[1..]
                .iter()
                .map(|v| (v - values[0]).abs())
                .fold(0.0, |acc: f64, v| if v.is_nan() { f64::INFINITY } else { acc.max(v) });

            if x_spread <= self.xtol && f_spread <= self.ftol {
                converged = true;
                break;
            }

            if iterations >= self.max_iterations {
                break;
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|point| point[j]).sum::<f64>() / n as f64)
                .collect();
            let along = |coefficient: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&simplex[n])
                    .map(|(c, w)| c + coefficient * (c - w))
                    .collect()
            };

            let reflected = along(Self::REFLECTION);
            let f_reflected = evaluate(&reflected);

            if f_reflected < values[0] {
                let expanded = along(Self::REFLECTION * Self::EXPANSION);
                let f_expanded = evaluate(&expanded);
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
                continue;
            }

            let (contracted, accept) = if f_reflected < values[n] {
                let point = along(Self::REFLECTION * Self::CONTRACTION);
                let value = evaluate(&point);
                (point, value <= f_reflected)
            } else {
                let point = along(-Self::CONTRACTION);
                let value = evaluate(&point);
                (point, value < values[n])
            };

            if accept {
                values[n] = evaluate(&contracted);
                simplex[n] = contracted;
                continue;
            }

            // shrink towards the best point
            for i in 1..=n {
                let shrunk: Vec<f64> = simplex[0]
                    .iter()
                    .zip(&simplex[i])
                    .map(|(best, x)| best + Self::SHRINK * (x - best))
                    .collect();
                values[i] = evaluate(&shrunk);
                simplex[i] = shrunk;
            }
        }

        Minimum {
            x: simplex.swap_remove(0),
            value: values[0],
            iterations,
            converged,
        }
    }
}
