// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Contains the implementation of the `Symmetrization` structure and its methods.

use getset::CopyGetters;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default convergence tolerance of the symmetrization loops.
const DEFAULT_TOLERANCE: f64 = 1e-6;
/// Default maximal number of iterations of each symmetrization loop.
const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Parameters for the symmetrization of the overlap matrix and the correction of node weights.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Symmetrization {
    /// Convergence tolerance. A loop stops once the norm of the change between two
    /// consecutive iterations drops below this value.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_tolerance", alias = "error")]
    tolerance: f64,

    /// Maximal number of iterations of each loop. Reaching it is not an error,
    /// but the result is flagged as not converged.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_max_iterations")]
    max_iterations: usize,

    /// Correct the node weights by iterating `w ← Sᵀw` before the symmetrization.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_true")]
    correct_weights: bool,
}

#[inline(always)]
fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

#[inline(always)]
fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

#[inline(always)]
fn default_true() -> bool {
    true
}

impl Default for Symmetrization {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            correct_weights: true,
        }
    }
}

impl Symmetrization {
    /// Specify parameters of the symmetrization.
    /// If `tolerance` or `max_iterations` is `None`, the default value is used.
    pub fn new(
        tolerance: Option<f64>,
        max_iterations: Option<usize>,
        correct_weights: bool,
    ) -> Result<Self, ConfigError> {
        let symmetrization = Self {
            tolerance: tolerance.unwrap_or(DEFAULT_TOLERANCE),
            max_iterations: max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            correct_weights,
        };

        symmetrization.validate()?;
        Ok(symmetrization)
    }

    /// Check that the parameters of the symmetrization are valid.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::InvalidTolerance(
                "symmetrization tolerance".to_owned(),
                self.tolerance,
            ));
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(
                "symmetrization max_iterations".to_owned(),
            ));
        }

        Ok(())
    }

    /// Log basic info about the symmetrization.
    pub(crate) fn info(&self) {
        if self.correct_weights {
            colog_info!(
                "Will correct node weights and symmetrize the overlap matrix (tolerance: {}, max. {} iterations).",
                self.tolerance,
                self.max_iterations
            );
        } else {
            colog_info!(
                "Will symmetrize the overlap matrix without correcting node weights (tolerance: {}, max. {} iterations).",
                self.tolerance,
                self.max_iterations
            );
        }
    }
}
