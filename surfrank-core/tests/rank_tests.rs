// Tests for the power-iteration rank engine

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use surfrank_core::rank::{PowerIteration, RankConfig, RankError, rank};
use surfrank_scanner::LinkGraph;

const EPSILON: f64 = 1e-9;

/// Random graph with a sprinkling of dangling nodes and self links.
fn random_graph(seed: u64, nodes: usize, edges: usize) -> LinkGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = LinkGraph::new();
    for i in 0..nodes {
        graph.add_node(&format!("https://n{}.example/", i));
    }
    for _ in 0..edges {
        let source = rng.random_range(0..nodes);
        let target = rng.random_range(0..nodes);
        graph.record_edge(
            &format!("https://n{}.example/", source),
            &format!("https://n{}.example/", target),
        );
    }
    graph
}

// ============================================================================
// Conservation and determinism
// ============================================================================

#[test]
fn test_scores_sum_to_one_every_iteration() {
    for seed in 0..20 {
        let graph = random_graph(seed, 30, 60);
        for step in PowerIteration::new(&graph, 0.85, 50) {
            let total: f64 = step.scores.iter().sum();
            assert!(
                (total - 1.0).abs() < EPSILON,
                "seed {} iteration {} sums to {}",
                seed,
                step.iteration,
                total
            );
            assert!(step.scores.iter().all(|&s| s >= 0.0));
        }
    }
}

#[test]
fn test_converged_ranking_sums_to_one() {
    for seed in 0..10 {
        let graph = random_graph(seed, 50, 120);
        let ranking = rank(&graph, &RankConfig::default()).unwrap();
        assert_eq!(ranking.len(), 50);
        assert!((ranking.total() - 1.0).abs() < EPSILON);
    }
}

#[test]
fn test_rank_is_deterministic() {
    let graph = random_graph(42, 40, 100);
    let first = rank(&graph, &RankConfig::default()).unwrap();
    let second = rank(&graph, &RankConfig::default()).unwrap();
    assert_eq!(first, second);

    let rebuilt = rank(&random_graph(42, 40, 100), &RankConfig::default()).unwrap();
    assert_eq!(first, rebuilt);
}

#[test]
fn test_residual_shrinks() {
    let graph = random_graph(3, 25, 70);
    let residuals: Vec<f64> = PowerIteration::new(&graph, 0.85, 30)
        .map(|step| step.residual)
        .collect();
    assert!(residuals.last().unwrap() < residuals.first().unwrap());
}

// ============================================================================
// Small graphs with known answers
// ============================================================================

#[test]
fn test_two_cycle_splits_evenly() {
    let graph = LinkGraph::from_edges([("A", "B"), ("B", "A")]);
    let ranking = rank(&graph, &RankConfig::default()).unwrap();
    assert!((ranking.score("A").unwrap() - 0.5).abs() < 1e-6);
    assert!((ranking.score("B").unwrap() - 0.5).abs() < 1e-6);
}

#[test]
fn test_isolated_node_gets_positive_score() {
    let mut graph = LinkGraph::from_edges([("A", "B"), ("B", "A")]);
    graph.add_node("lonely");

    let ranking = rank(&graph, &RankConfig::default()).unwrap();

    let lonely = ranking.score("lonely").unwrap();
    assert!(lonely > 0.0);
    assert!((ranking.total() - 1.0).abs() < EPSILON);
}

#[test]
fn test_dangling_sink_converges() {
    // b and c only feed the sink, which links nowhere
    let graph = LinkGraph::from_edges([("a", "sink"), ("b", "sink"), ("c", "sink")]);
    let ranking = rank(&graph, &RankConfig::default()).unwrap();

    assert_eq!(ranking.top(1)[0].0, "sink");
    for url in ["a", "b", "c"] {
        assert!(ranking.score(url).unwrap() > 0.0);
    }
}

#[test]
fn test_single_node_scores_one() {
    let mut graph = LinkGraph::new();
    graph.add_node("only");
    let ranking = rank(&graph, &RankConfig::default()).unwrap();
    assert!((ranking.score("only").unwrap() - 1.0).abs() < EPSILON);
}

#[test]
fn test_zero_damping_is_uniform() {
    let graph = random_graph(9, 10, 30);
    let ranking = rank(&graph, &RankConfig::default().with_damping(0.0)).unwrap();
    for (_, score) in ranking.iter() {
        assert!((score - 0.1).abs() < EPSILON);
    }
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_zero_iterations_fails_immediately() {
    let graph = LinkGraph::from_edges([("A", "B")]);
    let err = rank(&graph, &RankConfig::default().with_max_iterations(0)).unwrap_err();
    match err {
        RankError::NotConverged {
            iterations,
            residual,
        } => {
            assert_eq!(iterations, 0);
            assert!(residual.is_infinite());
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_tight_tolerance_does_not_converge() {
    let graph = random_graph(5, 20, 50);
    let config = RankConfig::default()
        .with_tolerance(0.0)
        .with_max_iterations(3);
    assert!(matches!(
        rank(&graph, &config),
        Err(RankError::NotConverged { iterations: 3, .. })
    ));
}

#[test]
fn test_empty_graph_needs_no_iterations() {
    let ranking = rank(&LinkGraph::new(), &RankConfig::default().with_max_iterations(0)).unwrap();
    assert!(ranking.is_empty());
    assert!(ranking.top(5).is_empty());
}
