use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Directed link graph observed during a crawl. Each ordered (source, target)
/// pair is stored at most once; self links are kept.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<I, S, T>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut graph = Self::new();
        for (source, target) in edges {
            graph.record_edge(source.as_ref(), target.as_ref());
        }
        graph
    }

    pub fn add_node(&mut self, url: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(url) {
            return idx;
        }
        let idx = self.graph.add_node(url.to_string());
        self.index.insert(url.to_string(), idx);
        idx
    }

    /// Records `source -> target`. Returns false if the edge was already known.
    pub fn record_edge(&mut self, source: &str, target: &str) -> bool {
        let from = self.add_node(source);
        let to = self.add_node(target);

        if self.graph.contains_edge(from, to) {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&from), Some(&to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn out_degree(&self, url: &str) -> usize {
        self.index
            .get(url)
            .map(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count())
            .unwrap_or(0)
    }

    /// Node URLs in insertion order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].as_str(),
                self.graph[edge.target()].as_str(),
            )
        })
    }

    /// Dense adjacency view: out-neighbour positions for every node, in
    /// insertion order.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        self.graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .map(|n| n.index())
                    .collect()
            })
            .collect()
    }
}
