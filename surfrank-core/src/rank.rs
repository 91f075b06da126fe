//! PageRank by power iteration over a crawled link graph.
//!
//! Each node splits `damping` of its score evenly across its out-links. Mass
//! held by dangling nodes (no out-links) and the `1 - damping` leak are spread
//! uniformly over all nodes, so the score vector sums to 1 after every
//! iteration. Iteration stops once the L1 change between two iterations drops
//! below `node_count * tolerance`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surfrank_scanner::LinkGraph;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankConfig {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1.0e-6,
        }
    }
}

impl RankConfig {
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<(), RankError> {
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(RankError::InvalidDamping(self.damping));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(RankError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankError {
    #[error("power iteration failed to converge in {iterations} iterations (residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },

    #[error("damping factor must be within [0, 1], got {0}")]
    InvalidDamping(f64),

    #[error("tolerance must be a non-negative number, got {0}")]
    InvalidTolerance(f64),
}

/// Scores after one iteration, in graph node order.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationStep {
    pub iteration: usize,
    pub residual: f64,
    pub scores: Vec<f64>,
}

/// Iterator over successive power-iteration steps, at most `max_iterations`
/// of them. Does not check convergence; [`rank`] does.
pub struct PowerIteration {
    adjacency: Vec<Vec<usize>>,
    dangling: Vec<usize>,
    damping: f64,
    scores: Vec<f64>,
    iteration: usize,
    max_iterations: usize,
}

impl PowerIteration {
    pub fn new(graph: &LinkGraph, damping: f64, max_iterations: usize) -> Self {
        let adjacency = graph.adjacency();
        let node_count = adjacency.len();
        let dangling = adjacency
            .iter()
            .enumerate()
            .filter(|(_, targets)| targets.is_empty())
            .map(|(idx, _)| idx)
            .collect();
        let initial = if node_count == 0 {
            0.0
        } else {
            1.0 / node_count as f64
        };

        Self {
            adjacency,
            dangling,
            damping,
            scores: vec![initial; node_count],
            iteration: 0,
            max_iterations,
        }
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }
}

impl Iterator for PowerIteration {
    type Item = IterationStep;

    fn next(&mut self) -> Option<IterationStep> {
        let node_count = self.scores.len();
        if node_count == 0 || self.iteration >= self.max_iterations {
            return None;
        }

        let previous = &self.scores;
        let mut next = vec![0.0; node_count];

        // Mass flows along out-links, 1/k per link
        for (source, targets) in self.adjacency.iter().enumerate() {
            if targets.is_empty() {
                continue;
            }
            let share = self.damping * previous[source] / targets.len() as f64;
            for &target in targets {
                next[target] += share;
            }
        }

        let dangling_mass: f64 =
            self.damping * self.dangling.iter().map(|&idx| previous[idx]).sum::<f64>();
        let uniform = 1.0 / node_count as f64;
        let redistributed = (dangling_mass + (1.0 - self.damping)) * uniform;
        for score in next.iter_mut() {
            *score += redistributed;
        }

        let residual: f64 = next
            .iter()
            .zip(previous)
            .map(|(new, old)| (new - old).abs())
            .sum();

        self.scores = next;
        self.iteration += 1;
        trace!("iteration {} residual {:e}", self.iteration, residual);

        Some(IterationStep {
            iteration: self.iteration,
            residual,
            scores: self.scores.clone(),
        })
    }
}

/// Converged scores, keyed by URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    urls: Vec<String>,
    scores: Vec<f64>,
    positions: HashMap<String, usize>,
    iterations: usize,
}

impl Ranking {
    fn new(graph: &LinkGraph, scores: Vec<f64>, iterations: usize) -> Self {
        let urls: Vec<String> = graph.urls().map(str::to_string).collect();
        let positions = urls
            .iter()
            .enumerate()
            .map(|(idx, url)| (url.clone(), idx))
            .collect();
        Self {
            urls,
            scores,
            positions,
            iterations,
        }
    }

    pub fn score(&self, url: &str) -> Option<f64> {
        self.positions.get(url).map(|&idx| self.scores[idx])
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().sum()
    }

    /// Iterations it took to converge.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// (url, score) in graph node order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.urls.iter().map(String::as_str).zip(self.scores.iter().copied())
    }

    /// Highest scores first; equal scores are ordered by URL.
    pub fn top(&self, n: usize) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }
}

pub fn rank(graph: &LinkGraph, config: &RankConfig) -> Result<Ranking, RankError> {
    config.validate()?;

    if graph.is_empty() {
        return Ok(Ranking::default());
    }

    let threshold = graph.node_count() as f64 * config.tolerance;
    let mut residual = f64::INFINITY;

    for step in PowerIteration::new(graph, config.damping, config.max_iterations) {
        residual = step.residual;
        if residual < threshold {
            debug!(
                "Ranking converged after {} iterations over {} nodes",
                step.iteration,
                graph.node_count()
            );
            return Ok(Ranking::new(graph, step.scores, step.iteration));
        }
    }

    Err(RankError::NotConverged {
        iterations: config.max_iterations,
        residual,
    })
}
