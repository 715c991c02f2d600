// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Contains the structure for storing weighted sample points collected for a node.

use getset::Getters;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::errors::SamplesError;

/// Ordered collection of sample points with non-negative statistical weights.
///
/// All sample points have the same number of coordinates.
/// The order of the samples is significant (it corresponds to the time order
/// of the simulation) and is used for time-lagged overlaps and chain splitting.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
#[serde(try_from = "RawWeightedSamples")]
pub struct WeightedSamples {
    /// Sample points.
    #[getset(get = "pub")]
    points: Vec<DVector<f64>>,
    /// Weight of each sample point.
    #[getset(get = "pub")]
    weights: Vec<f64>,
    /// Number of coordinates of each sample point.
    n_dims: usize,
    /// Optional names of the individual coordinates.
    #[getset(get = "pub")]
    labels: Option<Vec<String>>,
}

/// Unvalidated form of `WeightedSamples` as read from a file.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeightedSamples {
    points: Vec<DVector<f64>>,
    weights: Vec<f64>,
    #[serde(default)]
    n_dims: Option<usize>,
    #[serde(default)]
    labels: Option<Vec<String>>,
}

impl TryFrom<RawWeightedSamples> for WeightedSamples {
    type Error = SamplesError;

    fn try_from(raw: RawWeightedSamples) -> Result<Self, Self::Error> {
        let samples = WeightedSamples::new(raw.points, raw.weights)?;

        match raw.n_dims {
            Some(n) if n != samples.n_dims() => {
                return Err(SamplesError::InconsistentDimension {
                    index: 0,
                    got: samples.n_dims(),
                    expected: n,
                })
            }
            _ => (),
        }

        match raw.labels {
            Some(labels) => samples.with_labels(labels),
            None => Ok(samples),
        }
    }
}

impl WeightedSamples {
    /// Construct a new collection of weighted samples.
    ///
    /// ## Returns
    /// - `WeightedSamples` if the number of points matches the number of weights,
    ///   all points have the same dimension and all weights are finite and non-negative.
    /// - `SamplesError` otherwise.
    pub fn new(points: Vec<DVector<f64>>, weights: Vec<f64>) -> Result<Self, SamplesError> {
        if points.len() != weights.len() {
            return Err(SamplesError::InconsistentLength(points.len(), weights.len()));
        }

        let n_dims = points.first().map_or(0, |p| p.len());
        for (index, point) in points.iter().enumerate() {
            if point.len() != n_dims {
                return Err(SamplesError::InconsistentDimension {
                    index,
                    got: point.len(),
                    expected: n_dims,
                });
            }
        }

        for (index, &weight) in weights.iter().enumerate() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(SamplesError::InvalidWeight(index, weight));
            }
        }

        Ok(Self {
            points,
            weights,
            n_dims,
            labels: None,
        })
    }

    /// Construct a new collection of samples, all with a weight of 1.
    pub fn uniform(points: Vec<DVector<f64>>) -> Result<Self, SamplesError> {
        let weights = vec![1.0; points.len()];
        Self::new(points, weights)
    }

    /// Attach names to the individual coordinates of the samples.
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self, SamplesError> {
        if labels.len() != self.n_dims {
            return Err(SamplesError::InconsistentLabels(labels.len(), self.n_dims));
        }

        self.labels = Some(labels);
        Ok(self)
    }

    /// Number of samples.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if there are no samples.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of coordinates of each sample point.
    #[inline(always)]
    pub fn n_dims(&self) -> usize {
        self.n_dims
    }

    /// Get sample point with the target index.
    #[inline(always)]
    pub fn point(&self, index: usize) -> Option<&DVector<f64>> {
        self.points.get(index)
    }

    /// Get weight of the sample with the target index.
    #[inline(always)]
    pub fn weight(&self, index: usize) -> Option<f64> {
        self.weights.get(index).copied()
    }

    /// Iterate over the sample points and their weights.
    pub fn iter(&self) -> impl Iterator<Item = (&DVector<f64>, f64)> {
        self.points.iter().zip(self.weights.iter().copied())
    }

    /// Sum of the weights of all samples.
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Create a new collection containing only the samples with the specified indices (in the specified order).
    pub fn subset(&self, indices: &[usize]) -> Result<Self, SamplesError> {
        let mut points = Vec::with_capacity(indices.len());
        let mut weights = Vec::with_capacity(indices.len());

        for &index in indices {
            match (self.points.get(index), self.weights.get(index)) {
                (Some(p), Some(&w)) => {
                    points.push(p.clone());
                    weights.push(w);
                }
                _ => return Err(SamplesError::IndexOutOfRange(index, self.len())),
            }
        }

        Ok(Self {
            points,
            weights,
            n_dims: self.n_dims,
            labels: self.labels.clone(),
        })
    }

    /// Calculate the weighted mean of the samples.
    /// Returns `None` if the total weight of the samples is zero (or there are no samples).
    pub fn mean_weighted(&self) -> Option<DVector<f64>> {
        let total = self.total_weight();
        if total <= 0.0 {
            return None;
        }

        let mut mean = DVector::zeros(self.n_dims);
        for (point, weight) in self.iter() {
            mean.axpy(weight, point, 1.0);
        }

        Some(mean / total)
    }

    /// Calculate the weighted (population) variance of the samples along each coordinate.
    /// Returns `None` if the total weight of the samples is zero (or there are no samples).
    pub fn var_weighted(&self) -> Option<DVector<f64>> {
        let mean = self.mean_weighted()?;
        let total = self.total_weight();

        let mut variance = DVector::zeros(self.n_dims);
        for (point, weight) in self.iter() {
            let diff = point - &mean;
            variance.axpy(weight, &diff.component_mul(&diff), 1.0);
        }

        Some(variance / total)
    }

    /// Split the samples into `n_chains` contiguous chains of nearly equal length.
    ///
    /// The first `len % n_chains` chains contain one extra sample.
    /// Returns an empty vector if `n_chains` is zero.
    pub fn split(&self, n_chains: usize) -> Vec<WeightedSamples> {
        if n_chains == 0 {
            return Vec::new();
        }

        let base = self.len() / n_chains;
        let extra = self.len() % n_chains;

        let mut chains = Vec::with_capacity(n_chains);
        let mut start = 0;
        for c in 0..n_chains {
            let length = base + usize::from(c < extra);
            let end = start + length;

            chains.push(Self {
                points: self.points[start..end].to_vec(),
                weights: self.weights[start..end].to_vec(),
                n_dims: self.n_dims,
                labels: self.labels.clone(),
            });

            start = end;
        }

        chains
    }

    /// Get the name of a coordinate. Falls back to `dim{index + 1}` if no labels are attached.
    pub fn label(&self, coord: usize) -> String {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(coord).cloned())
            .unwrap_or_else(|| format!("dim{}", coord + 1))
    }
}

/// Calculate the weighted average of `values`.
/// Returns NaN if the weights sum to zero.
pub(crate) fn weighted_average(values: impl Iterator<Item = f64>, weights: &[f64]) -> f64 {
    let (sum, total) = values
        .zip(weights.iter())
        .fold((0.0, 0.0), |(sum, total), (v, &w)| (sum + v * w, total + w));

    sum / total
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn points(values: &[[f64; 2]]) -> Vec<DVector<f64>> {
        values
            .iter()
            .map(|p| DVector::from_column_slice(p))
            .collect()
    }

    #[test]
    fn new_valid() {
        let samples = WeightedSamples::new(
            points(&[[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]),
            vec![1.0, 0.0, 2.5],
        )
        .unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples.n_dims(), 2);
        assert!(!samples.is_empty());
        assert_relative_eq!(samples.total_weight(), 3.5);
        assert_relative_eq!(samples.point(1).unwrap()[1], 3.0);
        assert_relative_eq!(samples.weight(2).unwrap(), 2.5);
        assert!(samples.point(3).is_none());
    }

    #[test]
    fn new_inconsistent_length() {
        match WeightedSamples::new(points(&[[0.0, 1.0], [2.0, 3.0]]), vec![1.0]) {
            Ok(_) => panic!("Function should have failed."),
            Err(SamplesError::InconsistentLength(2, 1)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }

    #[test]
    fn new_inconsistent_dimension() {
        let points = vec![
            DVector::from_vec(vec![0.0, 1.0]),
            DVector::from_vec(vec![0.0, 1.0, 2.0]),
        ];

        match WeightedSamples::new(points, vec![1.0, 1.0]) {
            Ok(_) => panic!("Function should have failed."),
            Err(SamplesError::InconsistentDimension {
                index: 1,
                got: 3,
                expected: 2,
            }) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }

    #[test]
    fn new_invalid_weight() {
        for weight in [-1.0, f64::NAN, f64::INFINITY] {
            match WeightedSamples::new(points(&[[0.0, 1.0], [2.0, 3.0]]), vec![1.0, weight]) {
                Ok(_) => panic!("Function should have failed."),
                Err(SamplesError::InvalidWeight(1, _)) => (),
                Err(e) => panic!("Unexpected error type `{}` returned.", e),
            }
        }
    }

    #[test]
    fn labels() {
        let samples = WeightedSamples::uniform(points(&[[0.0, 1.0]])).unwrap();
        assert_eq!(samples.label(0), "dim1");
        assert_eq!(samples.label(1), "dim2");

        let samples = samples
            .with_labels(vec!["phi".to_owned(), "psi".to_owned()])
            .unwrap();
        assert_eq!(samples.label(0), "phi");
        assert_eq!(samples.label(1), "psi");

        match WeightedSamples::uniform(points(&[[0.0, 1.0]]))
            .unwrap()
            .with_labels(vec!["phi".to_owned()])
        {
            Ok(_) => panic!("Function should have failed."),
            Err(SamplesError::InconsistentLabels(1, 2)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }

    #[test]
    fn subset() {
        let samples = WeightedSamples::new(
            points(&[[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]),
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();

        let subset = samples.subset(&[2, 0]).unwrap();
        assert_eq!(subset.len(), 2);
        assert_relative_eq!(subset.point(0).unwrap()[0], 4.0);
        assert_relative_eq!(subset.weight(1).unwrap(), 1.0);

        match samples.subset(&[0, 3]) {
            Ok(_) => panic!("Function should have failed."),
            Err(SamplesError::IndexOutOfRange(3, 3)) => (),
            Err(e) => panic!("Unexpected error type `{}` returned.", e),
        }
    }

    #[test]
    fn mean_and_variance_weighted() {
        let samples = WeightedSamples::new(
            points(&[[0.0, 1.0], [2.0, 1.0], [4.0, 1.0]]),
            vec![1.0, 2.0, 1.0],
        )
        .unwrap();

        let mean = samples.mean_weighted().unwrap();
        assert_relative_eq!(mean[0], 2.0);
        assert_relative_eq!(mean[1], 1.0);

        let variance = samples.var_weighted().unwrap();
        assert_relative_eq!(variance[0], 2.0);
        assert_relative_eq!(variance[1], 0.0);
    }

    #[test]
    fn mean_zero_weight() {
        let samples =
            WeightedSamples::new(points(&[[0.0, 1.0], [2.0, 1.0]]), vec![0.0, 0.0]).unwrap();
        assert!(samples.mean_weighted().is_none());
        assert!(samples.var_weighted().is_none());

        let empty = WeightedSamples::uniform(vec![]).unwrap();
        assert!(empty.mean_weighted().is_none());
    }

    #[test]
    fn split_uneven() {
        let samples = WeightedSamples::uniform(
            (0..11)
                .map(|i| DVector::from_vec(vec![i as f64]))
                .collect(),
        )
        .unwrap();

        let chains = samples.split(3);
        assert_eq!(chains.len(), 3);
        assert_eq!(chains[0].len(), 4);
        assert_eq!(chains[1].len(), 4);
        assert_eq!(chains[2].len(), 3);

        assert_relative_eq!(chains[0].point(0).unwrap()[0], 0.0);
        assert_relative_eq!(chains[1].point(0).unwrap()[0], 4.0);
        assert_relative_eq!(chains[2].point(2).unwrap()[0], 10.0);

        assert!(samples.split(0).is_empty());
    }

    /// Write sample points and weights in the serialized format of `WeightedSamples`.
    fn samples_yaml(points: &[&[f64]], weights: &[f64]) -> String {
        let points: Vec<String> = points
            .iter()
            .map(|p| format!("[{:?}, {}, null]", p, p.len()))
            .collect();
        format!("points: [{}]\nweights: {:?}\n", points.join(", "), weights)
    }

    #[test]
    fn deserialize_valid() {
        let samples = WeightedSamples::new(points(&[[0.0, 1.0], [2.0, 3.0]]), vec![1.0, 0.5])
            .unwrap()
            .with_labels(vec!["phi".to_owned(), "psi".to_owned()])
            .unwrap();

        let string = serde_yaml::to_string(&samples).unwrap();
        let read: WeightedSamples = serde_yaml::from_str(&string).unwrap();
        assert_eq!(read, samples);

        let string = samples_yaml(&[&[0.0, 1.0], &[2.0, 3.0]], &[1.0, 2.0]);
        let read: WeightedSamples = serde_yaml::from_str(&string).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read.n_dims(), 2);
        assert!(read.labels().is_none());
    }

    #[test]
    fn deserialize_negative_weight() {
        let string = samples_yaml(&[&[0.0, 1.0], &[2.0, 3.0]], &[1.0, -2.0]);
        match serde_yaml::from_str::<WeightedSamples>(&string) {
            Ok(_) => panic!("Function should have failed."),
            Err(e) => assert!(e.to_string().contains("weight of the sample")),
        }
    }

    #[test]
    fn deserialize_mixed_dimensions() {
        let string = samples_yaml(&[&[0.0, 1.0], &[2.0, 3.0, 4.0]], &[1.0, 1.0]);
        match serde_yaml::from_str::<WeightedSamples>(&string) {
            Ok(_) => panic!("Function should have failed."),
            Err(e) => assert!(e.to_string().contains("coordinates were expected")),
        }

        let string = format!("{}n_dims: 3\n", samples_yaml(&[&[0.0, 1.0]], &[1.0]));
        assert!(serde_yaml::from_str::<WeightedSamples>(&string).is_err());

        let string = format!("{}labels: [phi]\n", samples_yaml(&[&[0.0, 1.0]], &[1.0]));
        assert!(serde_yaml::from_str::<WeightedSamples>(&string).is_err());
    }

    #[test]
    fn weighted_average_simple() {
        let values = [1.0, 2.0, 4.0];
        assert_relative_eq!(
            weighted_average(values.iter().copied(), &[1.0, 1.0, 2.0]),
            11.0 / 4.0
        );
        assert!(weighted_average(values.iter().copied(), &[0.0, 0.0, 0.0]).is_nan());
    }
}
