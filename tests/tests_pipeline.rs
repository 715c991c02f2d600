// Released under MIT License.
// Copyright (c) 2024-2026 Ladislav Bartos

//! Integration tests for the construction of Markov state models.

mod common;

use approx::assert_relative_eq;
use pccaplus::errors::{AnalysisError, OverlapError};
use pccaplus::prelude::*;
use tempfile::NamedTempFile;

use common::{six_node_system, three_state_nodes};

fn fixed_analysis(n_clusters: usize) -> AnalysisBuilder {
    let mut builder = Analysis::builder();
    builder
        .alpha(1.0)
        .clusters(ClusterCount::fixed(n_clusters).unwrap())
        .symmetrization(Symmetrization::new(Some(1e-10), Some(10000), true).unwrap());
    builder
}

#[test]
fn test_three_states_one_node_each() {
    let mut nodes = three_state_nodes(42);
    let analysis = fixed_analysis(3).build().unwrap();
    let results = analysis.run(&mut nodes, &Euclidean).unwrap();

    assert_eq!(results.n_nodes(), 3);
    assert_eq!(results.n_clusters(), 3);

    for i in 0..3 {
        assert!(results.symmetrized_matrix()[(i, i)] > 0.9);
        assert_relative_eq!(
            results.symmetrized_matrix().row(i).sum(),
            1.0,
            epsilon = 1e-10
        );
        assert_relative_eq!(results.overlap_matrix().row(i).sum(), 1.0, epsilon = 1e-10);
    }

    for sum in results.numerics().qc_row_sums() {
        assert!(sum.abs() < 1e-6);
    }

    // every node is dominated by a different cluster
    let truth: Vec<usize> = (0..3)
        .map(|i| results.dominant_cluster(&format!("state{}", i)).unwrap())
        .collect();
    assert_ne!(truth[0], truth[1]);
    assert_ne!(truth[0], truth[2]);
    assert_ne!(truth[1], truth[2]);

    // memberships of the individual samples
    let ctx = analysis.phi_context().unwrap();
    let positions: Vec<&DVector<f64>> = nodes.iter().map(|n| n.position()).collect();
    let mut correct = 0;
    let mut total = 0;
    for (state, node) in nodes.iter().enumerate() {
        for (point, _) in node.samples().iter() {
            let membership = DVector::from_iterator(
                3,
                (0..3).map(|c| {
                    positions
                        .iter()
                        .enumerate()
                        .map(|(i, q)| {
                            phi(&ctx, &Euclidean, point, q, &positions)
                                * results.chi_matrix()[(i, c)]
                        })
                        .sum::<f64>()
                }),
            );

            assert_relative_eq!(membership.sum(), 1.0, epsilon = 1e-8);

            if membership.argmax().0 == truth[state] {
                correct += 1;
            }
            total += 1;
        }
    }

    assert!(correct as f64 / total as f64 > 0.95);

    // corrected weights are written back to the nodes
    let sum: f64 = nodes.iter().map(|n| n.weight_corrected().unwrap()).sum();
    assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
    for node in nodes.iter() {
        assert_relative_eq!(
            node.weight_corrected().unwrap(),
            results.weights()[node.name()].corrected()
        );
        assert_relative_eq!(results.weights()[node.name()].direct(), 1.0 / 3.0);
    }
}

#[test]
fn test_suggested_clusters() {
    let mut nodes = six_node_system(7);
    let analysis = Analysis::builder()
        .alpha(1.0)
        .clusters(ClusterCount::auto())
        .build()
        .unwrap();

    let results = analysis.run(&mut nodes, &Euclidean).unwrap();

    assert_eq!(results.suggested_clusters(), 3);
    assert_eq!(results.n_clusters(), 3);
    assert_eq!(results.perron_cluster(), 3);
    assert_eq!(results.eigenvalues().len(), 6);
    assert!(results.eigenvalues()[3] < 0.9);

    for window in results.eigenvalues().windows(2) {
        assert!(window[0] >= window[1]);
    }

    // both nodes of a state belong to the same cluster
    for state in 0..3 {
        assert_eq!(
            results.dominant_cluster(&format!("state{}_0", state)),
            results.dominant_cluster(&format!("state{}_1", state))
        );
    }
}

#[test]
fn test_optimized_chi() {
    let mut nodes = six_node_system(11);
    let analysis = fixed_analysis(3)
        .optimize_chi(ChiOptimization::default())
        .build()
        .unwrap();

    let results = analysis.run(&mut nodes, &Euclidean).unwrap();

    assert_eq!(results.n_clusters(), 3);
    assert!(results.convergence().chi_optimization_converged().is_some());

    for row in results.chi_matrix().row_iter() {
        assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-8);
        for &value in row.iter() {
            assert!(value >= -1e-6);
        }
    }

    assert!(results.numerics().is_consistent(1e-6));

    let cluster_weights = results.numerics().cluster_weights();
    let from_chi = results.numerics().cluster_weights_from_chi();
    for (a, b) in cluster_weights.iter().zip(from_chi.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-6);
    }

    let total: f64 = results.cluster_weights().iter().sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-6);
}

#[test]
fn test_ignore_failed() {
    let mut nodes = six_node_system(3);
    nodes[4] = nodes[4].clone().with_failed(true);

    let analysis = fixed_analysis(3).ignore_failed(true).build().unwrap();
    let results = analysis.run(&mut nodes, &Euclidean).unwrap();

    assert_eq!(results.n_nodes(), 5);
    assert!(results.node_index("state2_0").is_none());
    assert!(nodes[4].weight_corrected().is_none());
    assert_eq!(results.n_clusters(), 3);

    // failed nodes are analyzed unless requested otherwise
    let mut nodes = six_node_system(3);
    nodes[4] = nodes[4].clone().with_failed(true);
    let results = fixed_analysis(3).build().unwrap().run(&mut nodes, &Euclidean).unwrap();
    assert_eq!(results.n_nodes(), 6);
}

#[test]
fn test_overlap_modes_match() {
    let nodes = three_state_nodes(5);
    let ctx = PhiContext::new(1.0, 1.0).unwrap();
    let active: Vec<&Node> = nodes.iter().collect();
    let positions: Vec<&DVector<f64>> = nodes.iter().map(|n| n.position()).collect();

    let direct = overlap_matrix(
        &ctx,
        &Euclidean,
        &active,
        &positions,
        OverlapMode::Direct,
        0,
        1,
    )
    .unwrap();

    for n_threads in [1, 2, 3, 8] {
        let cached = overlap_matrix(
            &ctx,
            &Euclidean,
            &active,
            &positions,
            OverlapMode::CachedDenominator,
            0,
            n_threads,
        )
        .unwrap();

        for (a, b) in direct.iter().zip(cached.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }
}

#[test]
fn test_lagged_overlap() {
    let mut nodes = three_state_nodes(8);
    let analysis = fixed_analysis(3).lag(10).build().unwrap();
    let results = analysis.run(&mut nodes, &Euclidean).unwrap();

    assert_eq!(results.n_clusters(), 3);
    for i in 0..3 {
        assert!(results.overlap_matrix()[(i, i)] > 0.9);
    }
}

#[test]
fn test_output_yaml() {
    let output = NamedTempFile::new().unwrap();
    let path_to_output = output.path().to_str().unwrap();

    let mut nodes = three_state_nodes(1);
    let analysis = fixed_analysis(3).output(path_to_output).build().unwrap();
    let results = analysis.run(&mut nodes, &Euclidean).unwrap();

    let read = AnalysisResults::from_file(path_to_output).unwrap();
    assert_eq!(read, results);

    let content = std::fs::read_to_string(path_to_output).unwrap();
    assert!(content.starts_with("# Markov state model of 3 nodes and 3 clusters"));
}

#[test]
fn test_config_from_yaml() {
    let analysis = Analysis::from_file("tests/files/inputs/pipeline.yaml").unwrap();
    assert_relative_eq!(analysis.beta(), 2.0);
    assert_eq!(analysis.overlap_mode(), OverlapMode::CachedDenominator);

    let mut nodes = three_state_nodes(42);
    let from_yaml = analysis.run(&mut nodes, &Euclidean).unwrap();

    let mut nodes = three_state_nodes(42);
    let from_builder = fixed_analysis(3).build().unwrap().run(&mut nodes, &Euclidean).unwrap();

    assert_eq!(from_yaml.n_clusters(), from_builder.n_clusters());
    for (a, b) in from_yaml
        .symmetrized_matrix()
        .iter()
        .zip(from_builder.symmetrized_matrix().iter())
    {
        assert_relative_eq!(a, b, epsilon = 1e-10);
    }
    for (a, b) in from_yaml
        .qc_matrix()
        .iter()
        .zip(from_builder.qc_matrix().iter())
    {
        assert_relative_eq!(a, b, epsilon = 1e-8);
    }
}

#[test]
fn test_too_many_clusters() {
    let mut nodes = three_state_nodes(2);
    let analysis = fixed_analysis(5).build().unwrap();

    // the number of clusters is capped by the number of nodes
    let results = analysis.run(&mut nodes, &Euclidean).unwrap();
    assert_eq!(results.n_clusters(), 3);
}

#[test]
fn test_not_enough_samples_for_lag() {
    let mut nodes = three_state_nodes(4);
    let analysis = fixed_analysis(3).lag(300).build().unwrap();

    match analysis.run(&mut nodes, &Euclidean) {
        Ok(_) => panic!("Function should have failed."),
        Err(AnalysisError::Overlap(OverlapError::NotEnoughSamples { .. })) => (),
        Err(e) => panic!("Unexpected error type `{}` returned.", e),
    }

    for node in nodes.iter() {
        assert!(node.weight_corrected().is_none());
    }
}

#[test]
fn test_no_partition_nodes() {
    let mut nodes: Vec<Node> = three_state_nodes(4)
        .into_iter()
        .map(|n| n.with_partition(false))
        .collect();
    let analysis = fixed_analysis(3).build().unwrap();

    match analysis.run(&mut nodes, &Euclidean) {
        Ok(_) => panic!("Function should have failed."),
        Err(AnalysisError::NoActiveNodes) => (),
        Err(e) => panic!("Unexpected error type `{}` returned.", e),
    }
}
