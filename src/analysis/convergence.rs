// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Gelman-Rubin diagnostic of the convergence of the sampling.

use getset::{CopyGetters, Getters};
use indexmap::IndexMap;
use nalgebra::DVector;

use crate::{errors::DiagnosticError, structures::WeightedSamples};

/// Result of the Gelman-Rubin convergence diagnostic.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct GelmanRubin {
    /// Potential scale reduction factor (R̂) for every coordinate.
    #[getset(get = "pub")]
    shrink_factors: DVector<f64>,
    /// Mean of the within-chain variances.
    #[getset(get = "pub")]
    within: DVector<f64>,
    /// Variance of the chain means.
    #[getset(get = "pub")]
    between: DVector<f64>,
    /// Length of the shortest chain.
    #[getset(get_copy = "pub")]
    chain_length: usize,
    /// Threshold below which the sampling is considered converged.
    #[getset(get_copy = "pub")]
    threshold: f64,
    /// Is the sampling converged along every coordinate?
    #[getset(get_copy = "pub")]
    converged: bool,
    /// Names of the coordinates.
    #[getset(get = "pub")]
    labels: Vec<String>,
}

impl GelmanRubin {
    /// Indices of the coordinates that are not converged.
    pub fn offending(&self) -> Vec<usize> {
        self.shrink_factors
            .iter()
            .enumerate()
            .filter(|(_, r)| !(**r < self.threshold))
            .map(|(i, _)| i)
            .collect()
    }

    /// Shrink factors indexed by the names of the coordinates.
    pub fn report(&self) -> IndexMap<String, f64> {
        self.labels
            .iter()
            .cloned()
            .zip(self.shrink_factors.iter().copied())
            .collect()
    }
}

/// Calculate the Gelman-Rubin potential scale reduction factor of the samples.
///
/// The samples are split into `n_chains` contiguous chains. For every coordinate,
/// `W` is the mean of the weighted within-chain variances and `B` is the variance of the chain means
/// around the weighted mean of all samples. The shrink factor is `R̂ = sqrt(((1 - 1/L)·W + B) / W)`
/// where `L` is the length of the shortest chain. When the samples do not split evenly,
/// the last chains are the shorter ones, so `L` may differ from the length of the second chain
/// (which older versions of this diagnostic used as `L`).
///
/// The sampling is converged if the shrink factor of every coordinate is lower than `threshold`.
/// The verdict is never an error.
///
/// ## Returns
/// - `GelmanRubin` containing the shrink factors.
/// - `DiagnosticError` if there are fewer than two chains, fewer samples than chains,
///   or any chain has zero total weight.
pub fn gelman_rubin(
    samples: &WeightedSamples,
    n_chains: usize,
    threshold: f64,
) -> Result<GelmanRubin, DiagnosticError> {
    if n_chains < 2 {
        return Err(DiagnosticError::NotEnoughChains(n_chains));
    }

    if samples.len() < n_chains {
        return Err(DiagnosticError::NotEnoughSamples(samples.len(), n_chains));
    }

    let chains = samples.split(n_chains);
    let mut means = Vec::with_capacity(n_chains);
    let mut variances = Vec::with_capacity(n_chains);
    for (c, chain) in chains.iter().enumerate() {
        match (chain.mean_weighted(), chain.var_weighted()) {
            (Some(mean), Some(variance)) => {
                means.push(mean);
                variances.push(variance);
            }
            _ => return Err(DiagnosticError::ZeroWeightChain(c)),
        }
    }

    let total_mean = samples
        .mean_weighted()
        .ok_or(DiagnosticError::ZeroWeightChain(0))?;

    let n_dims = samples.n_dims();
    let chain_length = chains.iter().map(|c| c.len()).min().unwrap_or(0);

    let within = variances
        .iter()
        .fold(DVector::zeros(n_dims), |acc: DVector<f64>, v| acc + v)
        / n_chains as f64;

    let between = means.iter().fold(DVector::zeros(n_dims), |acc: DVector<f64>, m| {
        let diff = m - &total_mean;
        acc + diff.component_mul(&diff)
    }) / (n_chains - 1) as f64;

    let shrink_factors = DVector::from_iterator(
        n_dims,
        (0..n_dims).map(|d| {
            let estimate = (1.0 - 1.0 / chain_length as f64) * within[d] + between[d];
            if within[d] > 0.0 {
                (estimate / within[d]).sqrt()
            } else if estimate == 0.0 {
                1.0
            } else {
                f64::INFINITY
            }
        }),
    );

    let converged = shrink_factors.iter().all(|&r| r < threshold);
    let labels: Vec<String> = (0..n_dims).map(|d| samples.label(d)).collect();

    for (label, r) in labels.iter().zip(shrink_factors.iter()) {
        log::info!("Gelman-Rubin R for {}: {:.6}", label, r);
    }

    let result = GelmanRubin {
        shrink_factors,
        within,
        between,
        chain_length,
        threshold,
        converged,
        labels,
    };

    if converged {
        colog_info!(
            "Sampling is converged (all shrink factors below {}).",
            threshold
        );
    } else {
        colog_warn!(
            "Sampling is not converged in coordinate(s) {}.",
            result
                .offending()
                .iter()
                .map(|&d| result.labels[d].clone())
                .collect::<Vec<String>>()
                .join(", ")
        );
    }

    Ok(result)
}
