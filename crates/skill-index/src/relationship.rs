//! Relationship-aware reranking.
//!
//! Supplemented from the Python prototype's `router/skill_relationships.py`
//! (dropped by the distillation): tools that are frequently used together
//! get a small score boost when one of them already ranks highly, so a
//! close companion tool surfaces even when its own text match is weaker.

use std::collections::HashMap;

/// An undirected, weighted adjacency graph between tool `fq_name`s.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    edges: HashMap<String, Vec<(String, f32)>>,
}

impl RelationshipGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an edge between `a` and `b` with the given weight,
    /// symmetrically.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: f32) {
        self.edges.entry(a.to_string()).or_default().push((b.to_string(), weight));
        self.edges.entry(b.to_string()).or_default().push((a.to_string(), weight));
    }

    fn neighbors(&self, name: &str) -> &[(String, f32)] {
        self.edges.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Boosts neighbors of the top `top_n` results by `boost * edge_weight`,
/// then re-sorts by score descending, stable-tie-broken by `fq_name`.
///
/// `boost = 0.15`, `top_n = 5` match the magnitude the original
/// implementation uses for a single-hop neighbor nudge: enough to reorder
/// near-ties, never enough to outrank a strong direct hit.
pub fn apply_relationship_rerank(
    graph: &RelationshipGraph,
    mut results: Vec<(String, f32)>,
    boost: f32,
    top_n: usize,
) -> Vec<(String, f32)> {
    let top: Vec<String> = results.iter().take(top_n).map(|(n, _)| n.clone()).collect();

    let mut boosts: HashMap<String, f32> = HashMap::new();
    for name in &top {
        for (neighbor, weight) in graph.neighbors(name) {
            *boosts.entry(neighbor.clone()).or_insert(0.0) += boost * weight;
        }
    }

    for (name, score) in results.iter_mut() {
        if let Some(b) = boosts.get(name) {
            *score += b;
        }
    }

    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbor_of_top_result_gets_boosted() {
        let mut graph = RelationshipGraph::new();
        graph.add_edge("k8s.get_pods", "k8s.get_logs", 1.0);

        let results = vec![
            ("k8s.get_pods".to_string(), 0.9),
            ("k8s.get_logs".to_string(), 0.5),
            ("k8s.unrelated".to_string(), 0.6),
        ];

        let reranked = apply_relationship_rerank(&graph, results, 0.15, 5);
        let logs_score = reranked.iter().find(|(n, _)| n == "k8s.get_logs").unwrap().1;
        assert!((logs_score - 0.65).abs() < 1e-6);
    }

    #[test]
    fn ties_break_lexicographically() {
        let graph = RelationshipGraph::new();
        let results = vec![("b".to_string(), 0.5), ("a".to_string(), 0.5)];
        let reranked = apply_relationship_rerank(&graph, results, 0.15, 5);
        assert_eq!(reranked[0].0, "a");
    }
}
