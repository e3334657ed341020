//! The Router: turns a free-text task description into a ranked list of
//! candidate tools, deterministically.
//!
//! Pipeline: retrieve `top_k = max(threshold, K)` hybrid candidates,
//! combine semantic and keyword scores with configurable weights, apply
//! relationship rerank, prepend and dedupe always-available core tools,
//! clip to `K`. Ties break by score desc, then name length, then
//! lexicographic — so the same inputs always produce the same order.

#![warn(missing_docs)]

use skill_index::relationship::{apply_relationship_rerank, RelationshipGraph};

/// One candidate's raw scores before combination.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Fully-qualified tool name.
    pub fq_name: String,
    /// Dense/semantic similarity score, already in `[0, 1]`.
    pub semantic_score: f32,
    /// Sparse/keyword match score, already in `[0, 1]`.
    pub keyword_score: f32,
}

/// Weights and limits controlling one `rank` call.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Weight applied to the semantic score.
    pub semantic_weight: f32,
    /// Weight applied to the keyword score.
    pub keyword_weight: f32,
    /// Number of results to return.
    pub k: usize,
    /// Minimum candidate pool size to retrieve before ranking, so a
    /// relationship rerank or a core-tool prepend always has enough
    /// material to work with.
    pub retrieval_threshold: usize,
    /// Relationship-rerank boost magnitude.
    pub relationship_boost: f32,
    /// How many top results' neighbors get boosted.
    pub relationship_top_n: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.6,
            keyword_weight: 0.4,
            k: 10,
            retrieval_threshold: 20,
            relationship_boost: 0.15,
            relationship_top_n: 5,
        }
    }
}

/// Ranks `candidates` (already retrieved — the caller is responsible for
/// calling the Indexer's `search_hybrid` with `top_k =
/// max(retrieval_threshold, k)`), prepends `core_tools` deduplicated, and
/// returns at most `config.k` fully-qualified tool names in rank order.
pub fn rank(
    candidates: Vec<Candidate>,
    core_tools: &[String],
    graph: &RelationshipGraph,
    config: &RouterConfig,
) -> Vec<String> {
    let mut scored: Vec<(String, f32)> = candidates
        .into_iter()
        .map(|c| {
            let combined = (config.semantic_weight * c.semantic_score
                + config.keyword_weight * c.keyword_score)
                .clamp(0.0, 1.0);
            (c.fq_name, combined)
        })
        .collect();

    scored = apply_relationship_rerank(
        graph,
        scored,
        config.relationship_boost,
        config.relationship_top_n,
    );

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.len().cmp(&b.0.len()))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut ordered: Vec<String> = core_tools.to_vec();
    for (name, _) in scored {
        if !ordered.contains(&name) {
            ordered.push(name);
        }
    }

    ordered.truncate(config.k);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, semantic: f32, keyword: f32) -> Candidate {
        Candidate {
            fq_name: name.to_string(),
            semantic_score: semantic,
            keyword_score: keyword,
        }
    }

    #[test]
    fn ranks_by_combined_weighted_score() {
        let candidates = vec![candidate("a.x", 1.0, 0.0), candidate("a.y", 0.0, 1.0)];
        let config = RouterConfig::default();
        let ranked = rank(candidates, &[], &RelationshipGraph::new(), &config);
        assert_eq!(ranked[0], "a.x");
    }

    #[test]
    fn core_tools_are_prepended_and_deduped() {
        let candidates = vec![candidate("a.x", 1.0, 1.0)];
        let core = vec!["a.x".to_string(), "core.help".to_string()];
        let config = RouterConfig::default();
        let ranked = rank(candidates, &core, &RelationshipGraph::new(), &config);
        assert_eq!(ranked, vec!["a.x".to_string(), "core.help".to_string()]);
    }

    #[test]
    fn result_is_clipped_to_k() {
        let candidates = (0..20)
            .map(|i| candidate(&format!("a.t{i}"), 0.5, 0.5))
            .collect();
        let mut config = RouterConfig::default();
        config.k = 3;
        let ranked = rank(candidates, &[], &RelationshipGraph::new(), &config);
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn deterministic_across_runs() {
        let candidates = vec![candidate("a.x", 0.5, 0.5), candidate("a.y", 0.5, 0.5)];
        let config = RouterConfig::default();
        let first = rank(candidates.clone(), &[], &RelationshipGraph::new(), &config);
        let second = rank(candidates, &[], &RelationshipGraph::new(), &config);
        assert_eq!(first, second);
    }
}
