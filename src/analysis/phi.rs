// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Smooth membership functions (phi-functions) partitioning the coordinate space between nodes.
//!
//! The membership of a point `x` in node `i` is defined as
//!
//! ```text
//! φ_i(x) = exp(-α·d(x, q_i)²) / Σ_j exp(-α·d(x, q_j)²)
//! ```
//!
//! where `q_j` are the positions of all nodes participating in the partition.
//! The functions in this module evaluate this expression in forms which can not overflow.

use getset::CopyGetters;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    structures::{Metric, WeightedSamples},
};

/// Parameters of the phi-functions.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters, Serialize, Deserialize)]
pub struct PhiContext {
    /// Width parameter of the phi-functions. The larger the value, the sharper the partition.
    #[getset(get_copy = "pub")]
    alpha: f64,
    /// Inverse temperature (1/kT) used to convert memberships to potentials.
    #[getset(get_copy = "pub")]
    beta: f64,
}

impl PhiContext {
    /// Construct the parameters of the phi-functions.
    ///
    /// ## Returns
    /// - `PhiContext` if both `alpha` and `beta` are positive and finite.
    /// - `ConfigError::InvalidAlpha` or `ConfigError::InvalidBeta` otherwise.
    pub fn new(alpha: f64, beta: f64) -> Result<Self, ConfigError> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(ConfigError::InvalidAlpha(alpha));
        }

        if !beta.is_finite() || beta <= 0.0 {
            return Err(ConfigError::InvalidBeta(beta));
        }

        Ok(Self { alpha, beta })
    }
}

/// Calculate the membership of point `x` in the node positioned at `q_i`.
///
/// `participants` are the positions of all nodes partitioning the space and must include `q_i`.
/// The result lies in `(0, 1]` and overflow of any exponential just yields zero membership.
#[inline]
pub fn phi<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    x: &DVector<f64>,
    q_i: &DVector<f64>,
    participants: &[&DVector<f64>],
) -> f64 {
    let d_i = metric.dist2(x.as_slice(), q_i.as_slice());

    let denominator: f64 = participants
        .iter()
        .map(|q_j| (-ctx.alpha * (metric.dist2(x.as_slice(), q_j.as_slice()) - d_i)).exp())
        .sum();

    1.0 / denominator
}

/// Calculate the unnormalized membership `exp(-α·d(x, q_i)²)`.
///
/// May underflow to zero for distant points.
#[inline(always)]
pub fn phi_numerator<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    x: &DVector<f64>,
    q_i: &DVector<f64>,
) -> f64 {
    (-ctx.alpha * metric.dist2(x.as_slice(), q_i.as_slice())).exp()
}

/// Calculate the normalization of the phi-functions at point `x`,
/// i.e. the sum of `phi_numerator` over the provided node positions.
#[inline]
pub fn phi_denominator<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    x: &DVector<f64>,
    positions: &[&DVector<f64>],
) -> f64 {
    positions
        .iter()
        .map(|q| phi_numerator(ctx, metric, x, q))
        .sum()
}

/// Calculate the potential of the phi-function `-(1/β)·ln φ_i(x)`.
///
/// Evaluated with the log-sum-exp shift so that the result is finite for any finite input.
pub fn phi_log_potential<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    x: &DVector<f64>,
    q_i: &DVector<f64>,
    participants: &[&DVector<f64>],
) -> f64 {
    let d_i = metric.dist2(x.as_slice(), q_i.as_slice());

    let exponents: Vec<f64> = participants
        .iter()
        .map(|q_j| -ctx.alpha * (metric.dist2(x.as_slice(), q_j.as_slice()) - d_i))
        .collect();

    let max = exponents.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = exponents.iter().map(|t| (t - max).exp()).sum();

    -(1.0 / ctx.beta) * (-max - sum.ln())
}

/// Construct the point equal to `q_i` except for the coordinate `coord` which is set to `x_k`.
fn point_along_coordinate(x_k: f64, coord: usize, q_i: &DVector<f64>) -> DVector<f64> {
    let mut point = q_i.clone();
    if let Some(value) = point.get_mut(coord) {
        *value = x_k;
    }

    point
}

/// Calculate the membership in node `i` along a single coordinate.
///
/// The membership is evaluated at the position of node `i` with the coordinate
/// `coord` replaced by `x_k`. Used for one-dimensional profiles of the phi-functions.
pub fn phi_contrib<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    x_k: f64,
    coord: usize,
    q_i: &DVector<f64>,
    participants: &[&DVector<f64>],
) -> f64 {
    let point = point_along_coordinate(x_k, coord, q_i);
    phi(ctx, metric, &point, q_i, participants)
}

/// Calculate the potential of the phi-function of node `i` along a single coordinate.
/// See [`phi_contrib`] and [`phi_log_potential`].
pub fn phi_contrib_log_potential<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    x_k: f64,
    coord: usize,
    q_i: &DVector<f64>,
    participants: &[&DVector<f64>],
) -> f64 {
    let point = point_along_coordinate(x_k, coord, q_i);
    phi_log_potential(ctx, metric, &point, q_i, participants)
}

/// Calculate the membership in node `i` for all provided samples.
pub fn phi_samples<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    samples: &WeightedSamples,
    q_i: &DVector<f64>,
    participants: &[&DVector<f64>],
) -> Vec<f64> {
    samples
        .points()
        .iter()
        .map(|x| phi(ctx, metric, x, q_i, participants))
        .collect()
}

/// Calculate the normalization of the phi-functions for all provided samples.
pub fn phi_denominator_samples<M: Metric>(
    ctx: &PhiContext,
    metric: &M,
    samples: &WeightedSamples,
    positions: &[&DVector<f64>],
) -> Vec<f64> {
    samples
        .points()
        .iter()
        .map(|x| phi_denominator(ctx, metric, x, positions))
        .collect()
}
