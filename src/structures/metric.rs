// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Contains metrics for measuring distances between sample points and node positions,
//! with and without periodicity of the coordinates.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::errors::MetricError;

/// Trait implemented by structures measuring distances in the sampled coordinate space.
///
/// The metric must be shareable between threads as the overlap matrix is calculated in parallel.
pub trait Metric: Sync {
    /// Signed difference `a - b` along the coordinate with index `coord`.
    fn diff(&self, coord: usize, a: f64, b: f64) -> f64;

    /// Squared distance between points `x` and `q`.
    ///
    /// Both points are expected to have the same number of coordinates.
    fn dist2(&self, x: &[f64], q: &[f64]) -> f64 {
        x.iter()
            .zip(q.iter())
            .enumerate()
            .map(|(coord, (&a, &b))| {
                let d = self.diff(coord, a, b);
                d * d
            })
            .sum()
    }

    /// Weighted mean of `points` in the space measured by this metric.
    ///
    /// The default implementation calculates the arithmetic mean.
    /// All points are expected to have the same number of coordinates.
    ///
    /// ## Returns
    /// - `None` if there are no points or if the weights sum to zero.
    fn mean_weighted(&self, points: &[(&DVector<f64>, f64)]) -> Option<DVector<f64>> {
        let (first, _) = points.first()?;
        let mut sum = DVector::zeros(first.len());
        let mut total = 0.0;
        for &(point, weight) in points {
            sum.axpy(weight, point, 1.0);
            total += weight;
        }

        if total <= 0.0 {
            return None;
        }

        Some(sum / total)
    }
}

/// Plain Euclidean metric. No coordinate is periodic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Euclidean;

impl Metric for Euclidean {
    #[inline(always)]
    fn diff(&self, _coord: usize, a: f64, b: f64) -> f64 {
        a - b
    }

    #[inline]
    fn dist2(&self, x: &[f64], q: &[f64]) -> f64 {
        x.iter().zip(q.iter()).map(|(&a, &b)| (a - b) * (a - b)).sum()
    }
}

/// Metric where some coordinates are periodic (e.g., torsion angles of internal coordinates).
///
/// Differences along a periodic coordinate are wrapped into `[-period/2, period/2]`.
/// Coordinates without a period (or beyond the length of `periods`) are treated as Euclidean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPeriodic")]
pub struct Periodic {
    periods: Vec<Option<f64>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPeriodic {
    periods: Vec<Option<f64>>,
}

impl TryFrom<RawPeriodic> for Periodic {
    type Error = MetricError;

    fn try_from(raw: RawPeriodic) -> Result<Self, Self::Error> {
        Periodic::new(raw.periods)
    }
}

impl Periodic {
    /// Construct a new periodic metric.
    ///
    /// ## Parameters
    /// - `periods`: period of each coordinate; `None` for a non-periodic coordinate.
    ///
    /// ## Returns
    /// - `Periodic` if all periods are positive and finite.
    /// - `MetricError::InvalidPeriod` otherwise.
    pub fn new(periods: Vec<Option<f64>>) -> Result<Self, MetricError> {
        for (i, period) in periods.iter().enumerate() {
            if let Some(p) = period {
                if !p.is_finite() || *p <= 0.0 {
                    return Err(MetricError::InvalidPeriod(i, *p));
                }
            }
        }

        Ok(Self { periods })
    }

    /// Construct a metric in which all `n_dims` coordinates are angles in radians (period 2π).
    pub fn torsions(n_dims: usize) -> Self {
        Self {
            periods: vec![Some(std::f64::consts::TAU); n_dims],
        }
    }

    /// Get the period of the coordinate with index `coord`.
    pub fn period(&self, coord: usize) -> Option<f64> {
        self.periods.get(coord).copied().flatten()
    }
}

impl Metric for Periodic {
    #[inline]
    fn diff(&self, coord: usize, a: f64, b: f64) -> f64 {
        let d = a - b;
        match self.period(coord) {
            Some(p) => d - p * (d / p).round(),
            None => d,
        }
    }

    /// Periodic coordinates are averaged as angles (circular mean),
    /// the result lies in `[-period/2, period/2]`.
    fn mean_weighted(&self, points: &[(&DVector<f64>, f64)]) -> Option<DVector<f64>> {
        let (first, _) = points.first()?;
        let total: f64 = points.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return None;
        }

        let mean = DVector::from_iterator(
            first.len(),
            (0..first.len()).map(|coord| match self.period(coord) {
                Some(p) => {
                    let scale = std::f64::consts::TAU / p;
                    let (sin, cos) = points.iter().fold((0.0_f64, 0.0_f64), |(s, c), (x, w)| {
                        let angle = x[coord] * scale;
                        (s + w * angle.sin(), c + w * angle.cos())
                    });
                    sin.atan2(cos) / scale
                }
                None => points.iter().map(|(x, w)| w * x[coord]).sum::<f64>() / total,
            }),
        );

        Some(mean)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn euclidean_dist2() {
        let x = [1.0, 2.0, -1.0];
        let q = [0.0, 0.5, 1.0];

        assert_relative_eq!(Euclidean.dist2(&x, &q), 1.0 + 2.25 + 4.0);
        assert_relative_eq!(Euclidean.dist2(&x, &x), 0.0);
    }

    #[test]
    fn periodic_wraps_differences() {
        let metric = Periodic::new(vec![Some(10.0), None]).unwrap();

        assert_relative_eq!(metric.diff(0, 9.0, 1.0), -2.0);
        assert_relative_eq!(metric.diff(0, 1.0, 9.0), 2.0);
        assert_relative_eq!(metric.diff(0, 3.0, 1.0), 2.0);
        assert_relative_eq!(metric.diff(1, 9.0, 1.0), 8.0);
        // coordinate without a specified period
        assert_relative_eq!(metric.diff(2, 9.0, 1.0), 8.0);

        assert_relative_eq!(metric.dist2(&[9.0, 2.0], &[1.0, 0.0]), 4.0 + 4.0);
    }

    #[test]
    fn torsions_are_close_across_the_boundary() {
        let metric = Periodic::torsions(2);

        let x = [PI - 0.1, -PI + 0.05];
        let q = [-PI + 0.1, PI - 0.05];

        assert_relative_eq!(metric.dist2(&x, &q), 0.2 * 0.2 + 0.1 * 0.1, epsilon = 1e-12);
    }

    #[test]
    fn euclidean_mean_weighted() {
        let a = DVector::from_vec(vec![0.0, 1.0]);
        let b = DVector::from_vec(vec![4.0, -1.0]);

        let mean = Euclidean.mean_weighted(&[(&a, 3.0), (&b, 1.0)]).unwrap();
        assert_relative_eq!(mean[0], 1.0);
        assert_relative_eq!(mean[1], 0.5);

        assert!(Euclidean.mean_weighted(&[]).is_none());
        assert!(Euclidean.mean_weighted(&[(&a, 0.0), (&b, 0.0)]).is_none());
    }

    #[test]
    fn periodic_mean_across_the_boundary() {
        let metric = Periodic::torsions(1);
        let points: Vec<DVector<f64>> = [3.0, -3.0, 3.1, -3.1]
            .iter()
            .map(|&x| DVector::from_vec(vec![x]))
            .collect();
        let weighted: Vec<(&DVector<f64>, f64)> = points.iter().map(|p| (p, 1.0)).collect();

        let mean = metric.mean_weighted(&weighted).unwrap();
        // the arithmetic mean would be 0, on the opposite side of the circle
        assert_relative_eq!(mean[0].abs(), PI, epsilon = 1e-10);
        for point in points.iter() {
            assert!(metric.dist2(mean.as_slice(), point.as_slice()) < 0.1);
        }
    }

    #[test]
    fn periodic_mean_mixed_coordinates() {
        let metric = Periodic::new(vec![Some(10.0), None]).unwrap();
        let a = DVector::from_vec(vec![9.0, 9.0]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        let c = DVector::from_vec(vec![0.0, 2.0]);

        let mean = metric
            .mean_weighted(&[(&a, 1.0), (&b, 1.0), (&c, 2.0)])
            .unwrap();
        assert_relative_eq!(mean[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(mean[1], 14.0 / 4.0);

        assert!(metric.mean_weighted(&[(&a, 0.0)]).is_none());
    }

    #[test]
    fn periodic_invalid_period() {
        match Periodic::new(vec![Some(1.0), Some(-2.0)]) {
            Ok(_) => panic!("Function should have failed."),
            Err(MetricError::InvalidPeriod(1, _)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }

        match Periodic::new(vec![Some(f64::INFINITY)]) {
            Ok(_) => panic!("Function should have failed."),
            Err(MetricError::InvalidPeriod(0, _)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }

    #[test]
    fn periodic_deserialize() {
        let metric: Periodic = serde_yaml::from_str("periods: [6.5, null]").unwrap();
        assert_eq!(metric.period(0), Some(6.5));
        assert_eq!(metric.period(1), None);

        match serde_yaml::from_str::<Periodic>("periods: [6.5, -1.0]") {
            Ok(_) => panic!("Function should have failed."),
            Err(e) => assert!(e.to_string().contains("must be positive and finite")),
        }
    }
}
