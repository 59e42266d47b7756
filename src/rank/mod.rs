//! Result merging and lexical ranking
//!
//! This module handles:
//! - Merging live and archived result sets
//! - Relevance scoring behind a pluggable trait
//! - Deterministic ordering (score, then recency, then id)

use crate::model::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single ranked hit in a combined result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub message: Message,
    pub archived: bool,
    pub score: f32,
}

/// Trait for relevance scoring, so lexical scoring can later be swapped
/// for an inverted-index rank without touching the merge logic
pub trait Scorer: Send + Sync {
    /// Score content against a query in [0.0, 1.0]
    fn score(&self, query: &str, content: &str) -> f32;
}

/// Lexical scorer: an exact (case-insensitive) substring match scores
/// 1.0; otherwise the score is the fraction of query words found as
/// substrings of content words.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer;

impl Scorer for LexicalScorer {
    fn score(&self, query: &str, content: &str) -> f32 {
        let query = query.to_lowercase();
        let content = content.to_lowercase();

        if query.is_empty() {
            return 0.0;
        }
        if content.contains(&query) {
            return 1.0;
        }

        let query_words: Vec<&str> = query.split_whitespace().collect();
        if query_words.is_empty() {
            return 0.0;
        }
        let content_words: Vec<&str> = content.split_whitespace().collect();

        let matched = query_words
            .iter()
            .filter(|qw| content_words.iter().any(|cw| cw.contains(*qw)))
            .count();

        matched as f32 / query_words.len() as f32
    }
}

/// Merge and rank hit sets
pub struct Ranker<'a> {
    scorer: &'a dyn Scorer,
}

impl<'a> Ranker<'a> {
    pub fn new(scorer: &'a dyn Scorer) -> Self {
        Self { scorer }
    }

    /// Merge live and archived messages into one deduplicated, ranked
    /// set. A message transiently present in both sources (archived but
    /// not yet purged) keeps its live copy.
    pub fn merge_and_rank(
        &self,
        query: &str,
        live: Vec<Message>,
        archived: Vec<Message>,
    ) -> Vec<SearchHit> {
        let mut by_id: HashMap<String, SearchHit> = HashMap::new();

        for message in archived {
            let score = self.scorer.score(query, &message.content);
            by_id.insert(
                message.id.clone(),
                SearchHit {
                    message,
                    archived: true,
                    score,
                },
            );
        }

        // Live copies win over archived duplicates
        for message in live {
            let score = self.scorer.score(query, &message.content);
            by_id.insert(
                message.id.clone(),
                SearchHit {
                    message,
                    archived: false,
                    score,
                },
            );
        }

        let mut hits: Vec<SearchHit> = by_id.into_values().collect();
        sort_hits(&mut hits);
        hits
    }
}

/// Deterministic ordering: score descending, then recency (newer
/// first), then message id as the final tie-break. No unstable-sort
/// ambiguity: the key is total.
fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.message.created_at.cmp(&a.message.created_at))
            .then_with(|| a.message.id.cmp(&b.message.id))
    });
}
