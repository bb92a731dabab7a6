//! Similarity ranking of embedded community posts

use crate::models::CommunityPost;

/// A retrieved post's content paired with its similarity score.
///
/// Transient: exists only within a single retrieval call and is never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub content: String,
    pub score: f32,
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude (or the lengths
/// differ), treating it as "no match" rather than propagating a division
/// error.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank posts against a query embedding.
///
/// Posts scoring strictly below `min_score` are discarded; the remainder
/// are sorted by descending similarity (ties keep the input order, so the
/// output is deterministic) and truncated to `top_k`. An empty result is
/// a normal outcome, not an error.
#[must_use]
pub fn rank(
    query_embedding: &[f32],
    posts: &[CommunityPost],
    min_score: f32,
    top_k: usize,
) -> Vec<RankedResult> {
    let mut ranked: Vec<RankedResult> = posts
        .iter()
        .filter_map(|post| {
            let embedding = post.embedding_slice()?;
            let score = cosine_similarity(query_embedding, embedding);
            (score >= min_score).then(|| RankedResult {
                content: post.content.clone(),
                score,
            })
        })
        .collect();

    // Stable sort keeps insertion order for equal scores
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_k);
    ranked
}
