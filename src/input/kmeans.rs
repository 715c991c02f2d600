// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Contains the implementation of the `KMeans` structure and its methods.

use getset::CopyGetters;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default threshold for the movement of the cluster centers.
const DEFAULT_THRESHOLD: f64 = 1e-4;
/// Default maximal number of k-means iterations.
const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Parameters of the weighted k-means clustering.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KMeans {
    /// Clustering is converged once the mean squared movement of the cluster centers
    /// drops below this value.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_threshold")]
    threshold: f64,

    /// Maximal number of iterations.
    #[getset(get_copy = "pub")]
    #[serde(default = "default_max_iterations")]
    max_iterations: usize,
}

#[inline(always)]
fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

#[inline(always)]
fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl KMeans {
    /// Specify parameters of the k-means clustering.
    /// If any of them is `None`, the default value is used.
    pub fn new(threshold: Option<f64>, max_iterations: Option<usize>) -> Result<Self, ConfigError> {
        let kmeans = Self {
            threshold: threshold.unwrap_or(DEFAULT_THRESHOLD),
            max_iterations: max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        };

        kmeans.validate()?;
        Ok(kmeans)
    }

    /// Check that the parameters of the clustering are valid.
    /// A zero threshold is allowed (iterate until `max_iterations` is reached).
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidTolerance(
                "k-means threshold".to_owned(),
                self.threshold,
            ));
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(
                "k-means max_iterations".to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kmeans_default() {
        let kmeans = KMeans::default();
        assert_eq!(kmeans.threshold(), 1e-4);
        assert_eq!(kmeans.max_iterations(), 50);
    }

    #[test]
    fn kmeans_new() {
        let kmeans = KMeans::new(Some(0.0), Some(10)).unwrap();
        assert_eq!(kmeans.threshold(), 0.0);
        assert_eq!(kmeans.max_iterations(), 10);

        assert!(KMeans::new(Some(-1.0), None).is_err());
        assert!(KMeans::new(None, Some(0)).is_err());
    }

    #[test]
    fn kmeans_from_yaml() {
        let kmeans: KMeans = serde_yaml::from_str("max_iterations: 200").unwrap();
        assert_eq!(kmeans.threshold(), DEFAULT_THRESHOLD);
        assert_eq!(kmeans.max_iterations(), 200);
    }
}
