// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Contains the implementation of the main `Analysis` structure and its methods.

use std::fs::read_to_string;
use std::path::Path;

use derive_builder::Builder;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Deserializer, Serialize};

use crate::analysis::{overlap::OverlapMode, phi::PhiContext};
use crate::errors::ConfigError;

use super::{ChiOptimization, ClusterCount, Symmetrization};

/// Structure holding all the information necessary to perform the analysis.
#[derive(Debug, Clone, Builder, Getters, CopyGetters, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Analysis {
    /// Width parameter of the phi-functions. Must be positive.
    #[getset(get_copy = "pub")]
    alpha: f64,

    /// Inverse temperature (1/kT) used to convert memberships to potentials. Must be positive.
    /// If not specified, defaults to 1.
    #[builder(default = "1.0")]
    #[serde(default = "default_beta")]
    #[getset(get_copy = "pub")]
    beta: f64,

    /// Number of metastable clusters to identify.
    /// If not specified, the number suggested by the eigenvalue spectrum is used.
    #[builder(default)]
    #[serde(default, alias = "n_clusters")]
    #[getset(get_copy = "pub")]
    clusters: ClusterCount,

    /// Parameters of the symmetrization of the overlap matrix and of the weight correction.
    #[builder(default)]
    #[serde(default)]
    #[getset(get = "pub")]
    symmetrization: Symmetrization,

    /// Optional parameters of the membership matrix optimization.
    /// If not provided, the membership matrix of the inner simplex algorithm is used as is.
    #[builder(setter(strip_option), default)]
    #[serde(deserialize_with = "deserialize_optimize_chi", default)]
    #[getset(get = "pub")]
    optimize_chi: Option<ChiOptimization>,

    /// Method used to evaluate the phi-functions when constructing the overlap matrix.
    #[builder(default)]
    #[serde(default)]
    #[getset(get_copy = "pub")]
    overlap_mode: OverlapMode,

    /// Number of samples by which the phi values are shifted relative to the sample weights.
    /// Zero (default) produces the plain overlap matrix, non-zero values produce a time-lagged matrix.
    #[builder(default)]
    #[serde(default, alias = "shift")]
    #[getset(get_copy = "pub")]
    lag: usize,

    /// If true, nodes marked as failed are excluded from the analysis.
    #[builder(default = "false")]
    #[serde(default)]
    #[getset(get_copy = "pub")]
    ignore_failed: bool,

    /// Number of threads used to construct the overlap matrix. Defaults to 1.
    #[builder(default = "1")]
    #[serde(default = "default_one")]
    #[getset(get_copy = "pub")]
    n_threads: usize,

    /// Optional path to an output YAML file where the results of the analysis are written.
    #[builder(setter(into, strip_option), default)]
    #[serde(default)]
    #[getset(get = "pub")]
    output: Option<String>,
}

fn default_beta() -> f64 {
    1.0
}

fn default_one() -> usize {
    1
}

fn validate_n_threads(n_threads: usize) -> Result<(), ConfigError> {
    if n_threads == 0 {
        Err(ConfigError::InvalidNThreads)
    } else {
        Ok(())
    }
}

fn deserialize_optimize_chi<'de, D>(deserializer: D) -> Result<Option<ChiOptimization>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_yaml::Value = Deserialize::deserialize(deserializer)?;

    match value {
        serde_yaml::Value::String(keyword) if keyword == "default" => {
            Ok(Some(ChiOptimization::default()))
        }
        serde_yaml::Value::Null | serde_yaml::Value::Bool(false) => Ok(None),
        serde_yaml::Value::Bool(true) => Ok(Some(ChiOptimization::default())),
        serde_yaml::Value::Mapping(_) => serde_yaml::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Err(serde::de::Error::custom(
            "Invalid value for 'optimize_chi'. Expected 'default', 'true', 'false', 'null', or a valid structure.",
        )),
    }
}

impl Analysis {
    /// Start providing the analysis parameters.
    pub fn builder() -> AnalysisBuilder {
        AnalysisBuilder::default()
    }

    /// Read parameters of the analysis from an input YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Analysis, ConfigError> {
        let name = path.as_ref().display().to_string();
        let string =
            read_to_string(&path).map_err(|_| ConfigError::CouldNotOpenConfig(name.clone()))?;
        let analysis: Analysis = serde_yaml::from_str(&string)
            .map_err(|e| ConfigError::CouldNotParseConfig(name, e))?;

        analysis.validate()?;
        Ok(analysis)
    }

    /// Check that the Analysis structure is valid. Used after deserialization from config yaml file.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        PhiContext::new(self.alpha, self.beta)?;
        validate_n_threads(self.n_threads)?;
        self.symmetrization.validate()?;

        if let Some(ref optimization) = self.optimize_chi {
            optimization.validate()?;
        }

        Ok(())
    }

    /// Get the parameters of the phi-functions.
    pub fn phi_context(&self) -> Result<PhiContext, ConfigError> {
        PhiContext::new(self.alpha, self.beta)
    }

    /// Log basic info about the analysis.
    pub(crate) fn info(&self) {
        colog_info!(
            "Phi-functions: alpha = {}, beta = {}.",
            self.alpha,
            self.beta
        );

        match self.clusters {
            ClusterCount::Auto => colog_info!(
                "Will use the number of clusters suggested by the eigenvalue spectrum."
            ),
            ClusterCount::Fixed(n) => colog_info!("Will identify {} metastable clusters.", n),
        }

        log::info!(
            "Overlap matrix: mode {:?}, lag {}, {} thread(s).",
            self.overlap_mode,
            self.lag,
            self.n_threads
        );

        if self.ignore_failed {
            log::info!("Failed nodes will be ignored.");
        }

        self.symmetrization.info();

        if let Some(ref optimization) = self.optimize_chi {
            optimization.info();
        }

        if let Some(ref output) = self.output {
            colog_info!("Will write the results into '{}'.", output);
        }
    }
}

impl AnalysisBuilder {
    /// Alias for `clusters`.
    #[inline(always)]
    pub fn n_clusters(&mut self, value: ClusterCount) -> &mut Self {
        self.clusters(value)
    }

    /// Validate the process of analysis building.
    fn validate(&self) -> Result<(), String> {
        if let Some(alpha) = self.alpha {
            PhiContext::new(alpha, self.beta.unwrap_or(1.0)).map_err(|e| e.to_string())?;
        }

        if let Some(n_threads) = self.n_threads {
            validate_n_threads(n_threads).map_err(|e| e.to_string())?;
        }

        if let Some(symmetrization) = &self.symmetrization {
            symmetrization.validate().map_err(|e| e.to_string())?;
        }

        if let Some(Some(optimization)) = &self.optimize_chi {
            optimization.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}
