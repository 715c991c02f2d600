// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Functions used in various integration tests.

use pccaplus::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Normal;

/// Centers of three well separated metastable states in 2D.
#[allow(dead_code)]
pub(super) const CENTERS: [[f64; 2]; 3] = [[0.0, 0.0], [6.0, 0.0], [3.0, 5.2]];

/// Test utility. Generate `n` points normally distributed around `center`.
pub(super) fn gaussian_points(
    center: &[f64],
    std: f64,
    n: usize,
    rng: &mut StdRng,
) -> Vec<DVector<f64>> {
    let normal = Normal::new(0.0, std).unwrap();
    (0..n)
        .map(|_| {
            DVector::from_iterator(center.len(), center.iter().map(|c| c + rng.sample(normal)))
        })
        .collect()
}

/// Test utility. Construct a node at `position` sampling a normal distribution around it.
#[allow(dead_code)]
pub(super) fn gaussian_node(
    name: &str,
    position: &[f64],
    std: f64,
    n_samples: usize,
    rng: &mut StdRng,
) -> Node {
    let samples = WeightedSamples::uniform(gaussian_points(position, std, n_samples, rng)).unwrap();
    Node::new(name, DVector::from_column_slice(position), 1.0, samples).unwrap()
}

/// Test utility. One node per state, each sampling its own state.
#[allow(dead_code)]
pub(super) fn three_state_nodes(seed: u64) -> Vec<Node> {
    let mut rng = StdRng::seed_from_u64(seed);
    CENTERS
        .iter()
        .enumerate()
        .map(|(i, center)| gaussian_node(&format!("state{}", i), center, 0.5, 300, &mut rng))
        .collect()
}

/// Test utility. Two nodes per state, shifted by ±0.5 along x from the center of the state.
#[allow(dead_code)]
pub(super) fn six_node_system(seed: u64) -> Vec<Node> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut nodes = Vec::new();
    for (i, center) in CENTERS.iter().enumerate() {
        for (j, shift) in [-0.5, 0.5].iter().enumerate() {
            let position = [center[0] + shift, center[1]];
            nodes.push(gaussian_node(
                &format!("state{}_{}", i, j),
                &position,
                0.5,
                200,
                &mut rng,
            ));
        }
    }

    nodes
}
