// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Contains the implementation of the `ChiOptimization` structure and its methods.

use getset::CopyGetters;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default percentage of the mean node weight below which a node is considered light.
const DEFAULT_OUTLIER_PERCENTAGE: f64 = 5.0;
/// Default maximal number of iterations of the downhill simplex optimizer.
const DEFAULT_MAX_ITERATIONS: usize = 5000;
/// Default tolerance for the change of the optimized parameters.
const DEFAULT_XTOL: f64 = 1e-4;
/// Default tolerance for the change of the objective function.
const DEFAULT_FTOL: f64 = 1e-4;

/// Parameters for the optimization of the membership (chi) matrix.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChiOptimization {
    /// Nodes with a weight lower than this percentage of the mean node weight are treated
    /// as light outliers. They are excluded from the optimization and their memberships
    /// are shifted to be non-negative afterwards.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_outlier_percentage", alias = "outliers")]
    outlier_percentage: f64,

    /// Maximal number of iterations of the optimizer.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_max_iterations")]
    max_iterations: usize,

    /// Convergence tolerance for the optimized parameters.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_xtol")]
    xtol: f64,

    /// Convergence tolerance for the objective function.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_ftol")]
    ftol: f64,
}

#[inline(always)]
fn default_outlier_percentage() -> f64 {
    DEFAULT_OUTLIER_PERCENTAGE
}

#[inline(always)]
fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

#[inline(always)]
fn default_xtol() -> f64 {
    DEFAULT_XTOL
}

#[inline(always)]
fn default_ftol() -> f64 {
    DEFAULT_FTOL
}

impl Default for ChiOptimization {
    fn default() -> Self {
        Self {
            outlier_percentage: DEFAULT_OUTLIER_PERCENTAGE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            xtol: DEFAULT_XTOL,
            ftol: DEFAULT_FTOL,
        }
    }
}

impl ChiOptimization {
    /// Specify parameters of the chi matrix optimization.
    /// If any of them is `None`, the default value is used.
    pub fn new(
        outlier_percentage: Option<f64>,
        max_iterations: Option<usize>,
        xtol: Option<f64>,
        ftol: Option<f64>,
    ) -> Result<Self, ConfigError> {
        let optimization = Self {
            outlier_percentage: outlier_percentage.unwrap_or(DEFAULT_OUTLIER_PERCENTAGE),
            max_iterations: max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            xtol: xtol.unwrap_or(DEFAULT_XTOL),
            ftol: ftol.unwrap_or(DEFAULT_FTOL),
        };

        optimization.validate()?;
        Ok(optimization)
    }

    /// Check that the parameters of the optimization are valid.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.outlier_percentage) {
            return Err(ConfigError::InvalidOutlierPercentage(
                self.outlier_percentage,
            ));
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(
                "optimization max_iterations".to_owned(),
            ));
        }

        for (name, value) in [("xtol", self.xtol), ("ftol", self.ftol)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidTolerance(name.to_owned(), value));
            }
        }

        Ok(())
    }

    /// Log basic info about the optimization.
    pub(crate) fn info(&self) {
        colog_info!(
            "Will optimize the membership matrix (outliers below {}% of the mean weight, max. {} iterations).",
            self.outlier_percentage,
            self.max_iterations
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimization_default() {
        let optimization = ChiOptimization::default();
        assert_eq!(optimization.outlier_percentage(), 5.0);
        assert_eq!(optimization.max_iterations(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(optimization.xtol(), 1e-4);
        assert_eq!(optimization.ftol(), 1e-4);
    }

    #[test]
    fn optimization_new() {
        let optimization = ChiOptimization::new(Some(10.0), None, Some(1e-6), None).unwrap();
        assert_eq!(optimization.outlier_percentage(), 10.0);
        assert_eq!(optimization.max_iterations(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(optimization.xtol(), 1e-6);
        assert_eq!(optimization.ftol(), DEFAULT_FTOL);
    }

    #[test]
    fn optimization_new_fail() {
        match ChiOptimization::new(Some(120.0), None, None, None) {
            Ok(_) => panic!("Function should have failed."),
            Err(ConfigError::InvalidOutlierPercentage(_)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }

        match ChiOptimization::new(None, Some(0), None, None) {
            Ok(_) => panic!("Function should have failed."),
            Err(ConfigError::InvalidMaxIterations(_)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }

        match ChiOptimization::new(None, None, None, Some(-1e-3)) {
            Ok(_) => panic!("Function should have failed."),
            Err(ConfigError::InvalidTolerance(name, _)) => assert_eq!(name, "ftol"),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }

    #[test]
    fn optimization_from_yaml() {
        let optimization: ChiOptimization =
            serde_yaml::from_str("outliers: 2.5\nmax_iterations: 100").unwrap();
        assert_eq!(optimization.outlier_percentage(), 2.5);
        assert_eq!(optimization.max_iterations(), 100);
        assert_eq!(optimization.xtol(), DEFAULT_XTOL);

        assert!(serde_yaml::from_str::<ChiOptimization>("tolerance: 1.0").is_err());
    }
}
