// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Construction of the node overlap matrix.
//!
//! Element `S[i][j]` of the overlap matrix is the weighted average of `φ_j` over
//! the samples collected for node `i`.

use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    errors::OverlapError,
    structures::{samples::weighted_average, Metric, Node},
};

use super::phi::{phi, phi_denominator, phi_numerator, PhiContext};

/// Method used to evaluate the phi-functions when constructing the overlap matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapMode {
    /// Evaluate every phi-function using the overflow-safe formula.
    #[default]
    #[serde(alias = "direct")]
    Direct,
    /// For each sample, calculate the normalization of the phi-functions only once
    /// and reuse it for all nodes. Faster, but may produce NaN values for very large `alpha`.
    #[serde(alias = "cached", alias = "fast")]
    CachedDenominator,
}

/// Calculate the overlap matrix of the `active` nodes.
///
/// ## Parameters
/// - `ctx`: parameters of the phi-functions.
/// - `metric`: metric of the coordinate space.
/// - `active`: nodes for which the overlap matrix is constructed.
/// - `participants`: positions of all nodes partitioning the coordinate space
///   (normally the positions of the `active` nodes).
/// - `mode`: method for evaluating the phi-functions.
/// - `lag`: number of samples by which the phi values are shifted relative to the weights.
///   With a nonzero lag, phi is evaluated for samples `[lag..]` while the weights are taken
///   from samples `[..len - lag]`, producing a time-lagged overlap matrix.
/// - `n_threads`: number of threads used for the calculation.
///
/// ## Returns
/// - Square matrix with the dimension equal to the number of active nodes.
/// - `OverlapError` if there are no active nodes or participants, if the dimensions
///   of the positions and samples do not match, if any active node has not enough samples,
///   or if the weight of its samples sums to zero.
pub fn overlap_matrix<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    active: &[&Node],
    participants: &[&DVector<f64>],
    mode: OverlapMode,
    lag: usize,
    n_threads: usize,
) -> Result<DMatrix<f64>, OverlapError> {
    if active.is_empty() {
        return Err(OverlapError::NoActiveNodes);
    }

    if participants.is_empty() {
        return Err(OverlapError::NoParticipants);
    }

    let n_dims = participants[0].len();
    for (index, position) in participants.iter().enumerate() {
        if position.len() != n_dims {
            return Err(OverlapError::InconsistentParticipant {
                index,
                got: position.len(),
                expected: n_dims,
            });
        }
    }

    for node in active {
        let samples = node.samples();
        if samples.is_empty() {
            return Err(OverlapError::EmptySamples(node.name().to_owned()));
        }

        for got in [node.position().len(), samples.n_dims()] {
            if got != n_dims {
                return Err(OverlapError::InconsistentDimension {
                    node: node.name().to_owned(),
                    got,
                    expected: n_dims,
                });
            }
        }

        if samples.len() <= lag {
            return Err(OverlapError::NotEnoughSamples {
                node: node.name().to_owned(),
                samples: samples.len(),
                lag,
            });
        }

        let total: f64 = samples.weights()[..samples.len() - lag].iter().sum();
        if total <= 0.0 {
            return Err(OverlapError::ZeroWeight(node.name().to_owned()));
        }
    }

    let n_nodes = active.len();
    colog_info!(
        "Calculating overlap matrix for {} nodes using {} thread(s)...",
        n_nodes,
        n_threads
    );
    let start = Instant::now();

    let positions: Vec<&DVector<f64>> = active.iter().map(|node| node.position()).collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map_err(|e| OverlapError::ThreadPool(e.to_string()))?;

    let rows: Vec<Vec<f64>> = pool.install(|| {
        active
            .par_iter()
            .map(|node| overlap_row(ctx, metric, node, &positions, participants, mode, lag))
            .collect()
    });

    let matrix = DMatrix::from_fn(n_nodes, n_nodes, |i, j| rows[i][j]);

    colog_info!(
        "Overlap matrix calculated in {} s.",
        format!("{:.3}", start.elapsed().as_secs_f64())
    );

    Ok(matrix)
}

/// Calculate a single row of the overlap matrix, i.e. the average memberships
/// of the samples of `node` in all nodes at `positions`.
fn overlap_row<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    node: &Node,
    positions: &[&DVector<f64>],
    participants: &[&DVector<f64>],
    mode: OverlapMode,
    lag: usize,
) -> Vec<f64> {
    let samples = node.samples();
    let points = &samples.points()[lag..];
    let weights = &samples.weights()[..samples.len() - lag];

    match mode {
        OverlapMode::Direct => positions
            .iter()
            .map(|q_j| {
                weighted_average(
                    points.iter().map(|x| phi(ctx, metric, x, q_j, participants)),
                    weights,
                )
            })
            .collect(),

        OverlapMode::CachedDenominator => {
            let denominators: Vec<f64> = points
                .iter()
                .map(|x| phi_denominator(ctx, metric, x, positions))
                .collect();

            positions
                .iter()
                .map(|q_j| {
                    weighted_average(
                        points
                            .iter()
                            .zip(denominators.iter())
                            .map(|(x, denom)| phi_numerator(ctx, metric, x, q_j) / denom),
                        weights,
                    )
                })
                .collect()
        }
    }
}
