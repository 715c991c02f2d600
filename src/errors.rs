// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! This module contains error types that can be returned by the `pccaplus` crate.

use std::path::Path;

use colored::{ColoredString, Colorize};
use thiserror::Error;

fn path_to_yellow(path: &Path) -> ColoredString {
    path.display().to_string().yellow()
}

/// Errors that can occur when constructing a `WeightedSamples` structure.
#[derive(Error, Debug)]
pub enum SamplesError {
    #[error("{} number of sample points ('{}') does not match the number of sample weights ('{}')",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InconsistentLength(usize, usize),

    #[error("{} sample point with index '{}' has '{}' coordinates but '{}' coordinates were expected",
    "error:".red().bold(), .index.to_string().yellow(), .got.to_string().yellow(), .expected.to_string().yellow())]
    InconsistentDimension {
        index: usize,
        got: usize,
        expected: usize,
    },

    #[error("{} weight of the sample with index '{}' is '{}' (weights must be finite and non-negative)",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InvalidWeight(usize, f64),

    #[error("{} sample index '{}' is out of range (the sample set only contains '{}' points)",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    IndexOutOfRange(usize, usize),

    #[error("{} '{}' coordinate labels were provided for samples with '{}' coordinates",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InconsistentLabels(usize, usize),
}

/// Errors that can occur when constructing a `Node` structure.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("{} direct weight of node '{}' is '{}' (weights must be finite and non-negative)",
    "error:".red().bold(), .0.yellow(), .1.to_string().yellow())]
    InvalidWeight(String, f64),

    #[error("{} position of node '{}' has '{}' coordinates but its samples have '{}' coordinates",
    "error:".red().bold(), .name.yellow(), .position.to_string().yellow(), .samples.to_string().yellow())]
    InconsistentDimension {
        name: String,
        position: usize,
        samples: usize,
    },

    #[error("{} corrected weight of node '{}' is '{}' (weights must be finite and non-negative)",
    "error:".red().bold(), .0.yellow(), .1.to_string().yellow())]
    InvalidCorrectedWeight(String, f64),
}

/// Errors that can occur when constructing the periodic metric.
#[derive(Error, Debug)]
pub enum MetricError {
    #[error("{} period of coordinate '{}' is '{}' but it must be positive and finite",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InvalidPeriod(usize, f64),
}

/// Errors that can occur when constructing the node overlap matrix.
#[derive(Error, Debug)]
pub enum OverlapError {
    #[error("{} no active nodes provided for the calculation of the overlap matrix", "error:".red().bold())]
    NoActiveNodes,

    #[error("{} no nodes participate in the partition of the coordinate space", "error:".red().bold())]
    NoParticipants,

    #[error("{} node '{}' has no samples", "error:".red().bold(), .0.yellow())]
    EmptySamples(String),

    #[error("{} node '{}' has '{}' samples which is not more than the requested lag of '{}' samples",
    "error:".red().bold(), .node.yellow(), .samples.to_string().yellow(), .lag.to_string().yellow())]
    NotEnoughSamples {
        node: String,
        samples: usize,
        lag: usize,
    },

    #[error("{} the total weight of the samples of node '{}' is zero", "error:".red().bold(), .0.yellow())]
    ZeroWeight(String),

    #[error("{} position of participating node with index '{}' has '{}' coordinates but '{}' coordinates were expected",
    "error:".red().bold(), .index.to_string().yellow(), .got.to_string().yellow(), .expected.to_string().yellow())]
    InconsistentParticipant {
        index: usize,
        got: usize,
        expected: usize,
    },

    #[error("{} node '{}' has '{}' coordinates but the partition has '{}' coordinates",
    "error:".red().bold(), .node.yellow(), .got.to_string().yellow(), .expected.to_string().yellow())]
    InconsistentDimension {
        node: String,
        got: usize,
        expected: usize,
    },

    #[error("{} could not construct a thread pool for the overlap matrix calculation ({})", "error:".red().bold(), .0)]
    ThreadPool(String),
}

/// Errors that can occur when symmetrizing the overlap matrix.
#[derive(Error, Debug)]
pub enum SymmetrizeError {
    #[error("{} matrix to symmetrize is not square (shape '{}x{}')",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    NotSquare(usize, usize),

    #[error("{} matrix of size '{}' cannot be symmetrized using '{}' node weights",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InconsistentWeights(usize, usize),

    #[error("{} matrix element '[{}, {}]' is '{}' (elements must be finite and non-negative)",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow(), .2.to_string().yellow())]
    InvalidElement(usize, usize, f64),

    #[error("{} node weight with index '{}' is '{}' (weights must be finite and non-negative)",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InvalidWeight(usize, f64),

    #[error("{} row '{}' of the matrix sums to zero and cannot be rescaled",
    "error:".red().bold(), .0.to_string().yellow())]
    ZeroRowSum(usize),

    #[error("{}", .0)]
    InvalidParameters(ConfigError),
}

/// Errors that can occur when calculating the eigenspectrum.
#[derive(Error, Debug)]
pub enum SpectralError {
    #[error("{} matrix to decompose is not square (shape '{}x{}')",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    NotSquare(usize, usize),

    #[error("{} row '{}' of the balanced matrix does not have a positive sum; the matrix is not reversible",
    "error:".red().bold(), .0.to_string().yellow())]
    NonPositiveRowSum(usize),
}

/// Errors that can occur when identifying the metastable clusters.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("{} the number of clusters must be at least '{}'", "error:".red().bold(), "1".yellow())]
    NoClusters,

    #[error("{} could not construct the inner simplex: vertex '{}' is linearly dependent on the previous vertices (degenerate simplex)
({} try requesting fewer clusters)",
    "error:".red().bold(), .0.to_string().yellow(), "hint:".blue().bold())]
    DegenerateSimplex(usize),

    #[error("{} the rotation matrix is singular", "error:".red().bold())]
    SingularRotation,

    #[error("{} eigenvector '{}' has zero weighted norm", "error:".red().bold(), .0.to_string().yellow())]
    ZeroNormEigenvector(usize),

    #[error("{} '{}' node weights were provided for '{}' nodes",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    InconsistentWeights(usize, usize),

    #[error("{} node weights must be non-negative and must not all be zero", "error:".red().bold())]
    InvalidWeights,

    #[error("{} '{}' clusters were requested but only '{}' eigenvalues are available",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    NotEnoughEigenvalues(usize, usize),
}

/// Errors that can occur when performing weighted k-means clustering.
#[derive(Error, Debug)]
pub enum KMeansError {
    #[error("{} the number of k-means clusters must be at least '{}'", "error:".red().bold(), "1".yellow())]
    NoClusters,

    #[error("{} cannot identify '{}' k-means clusters using only '{}' samples",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    TooManyClusters(usize, usize),

    #[error("{} fixed cluster center with index '{}' has '{}' coordinates but the samples have '{}' coordinates",
    "error:".red().bold(), .index.to_string().yellow(), .got.to_string().yellow(), .expected.to_string().yellow())]
    InconsistentDimension {
        index: usize,
        got: usize,
        expected: usize,
    },

    #[error("{}", .0)]
    InvalidParameters(ConfigError),
}

/// Errors that can occur when performing the Gelman-Rubin convergence diagnostic.
#[derive(Error, Debug)]
pub enum DiagnosticError {
    #[error("{} the Gelman-Rubin diagnostic requires at least '{}' chains, not '{}'",
    "error:".red().bold(), "2".yellow(), .0.to_string().yellow())]
    NotEnoughChains(usize),

    #[error("{} cannot split '{}' samples into '{}' chains",
    "error:".red().bold(), .0.to_string().yellow(), .1.to_string().yellow())]
    NotEnoughSamples(usize, usize),

    #[error("{} the total weight of chain '{}' is zero", "error:".red().bold(), .0.to_string().yellow())]
    ZeroWeightChain(usize),
}

/// Errors that can occur while running the full analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{} no nodes participating in the partition were provided", "error:".red().bold())]
    NoActiveNodes,

    #[error("{} the direct weights of the active nodes sum to '{}' (expected a positive value)",
    "error:".red().bold(), .0.to_string().yellow())]
    InvalidWeights(f64),

    #[error("{}", .0)]
    Config(ConfigError),

    #[error("{}", .0)]
    Overlap(OverlapError),

    #[error("{}", .0)]
    Symmetrize(SymmetrizeError),

    #[error("{}", .0)]
    Spectral(SpectralError),

    #[error("{}", .0)]
    Cluster(ClusterError),

    #[error("{}", .0)]
    Write(WriteError),
}

/// Errors that can occur while writing the results.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{} could not create file '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotCreateFile(Box<Path>),

    #[error("{} could not write results in yaml format (serde_yaml error: `{}`)", "error:".red().bold(), .0.to_string())]
    CouldNotWriteYaml(serde_yaml::Error),

    #[error("{} could not write results to the output file ({})", "error:".red().bold(), .0)]
    CouldNotWriteResults(std::io::Error),
}

/// Errors that can occur while reading previously written results.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("{} could not open the results file '{}'", "error:".red().bold(), .0.yellow())]
    FileNotFound(String),

    #[error("{} could not understand the contents of the results file '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    CouldNotParse(String, serde_yaml::Error),
}

/// Errors that can occur when constructing an `Analysis` structure or its parameters.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{} could not open the configuration file '{}'", "error:".red().bold(), .0.yellow())]
    CouldNotOpenConfig(String),

    #[error("{} could not understand the contents of the configuration file '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    CouldNotParseConfig(String, serde_yaml::Error),

    #[error("{} the specified value of '{}' is '{}' but it must be positive and finite",
    "error:".red().bold(), "alpha".yellow(), .0.to_string().yellow())]
    InvalidAlpha(f64),

    #[error("{} the specified value of '{}' is '{}' but it must be positive and finite",
    "error:".red().bold(), "beta".yellow(), .0.to_string().yellow())]
    InvalidBeta(f64),

    #[error("{} the specified value of '{}' is '{}' but it must be positive and finite",
    "error:".red().bold(), .0.yellow(), .1.to_string().yellow())]
    InvalidTolerance(String, f64),

    #[error("{} the specified value of '{}' is invalid (must be positive)",
    "error:".red().bold(), .0.yellow())]
    InvalidMaxIterations(String),

    #[error("{} the specified value of '{}' is invalid (must be positive)", "error:".red().bold(), "n_threads".yellow())]
    InvalidNThreads,

    #[error("{} the specified number of clusters is invalid (must be positive)", "error:".red().bold())]
    InvalidClusters,

    #[error("{} the specified value of '{}' is '{}' but it must be between '{}' and '{}'",
    "error:".red().bold(), "outlier_percentage".yellow(), .0.to_string().yellow(), "0".yellow(), "100".yellow())]
    InvalidOutlierPercentage(f64),
}
