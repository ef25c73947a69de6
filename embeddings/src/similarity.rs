//! Vector similarity.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Cosine of the angle between `a` and `b`, in `[-1, 1]`. A zero vector is
/// similar to nothing and scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let denominator = norm(a) * norm(b);
    if denominator == 0.0 {
        return Ok(0.0);
    }
    Ok(dot(a, b) / denominator)
}

/// Scale `v` to unit length in place. Zero vectors are left alone.
pub fn normalize(v: &mut [f32]) {
    let length = norm(v);
    if length > 0.0 {
        v.iter_mut().for_each(|x| *x /= length);
    }
}

/// One candidate's position and score in a dense ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Index into the candidate slice.
    pub index: usize,
    pub score: f32,
}

/// Every candidate ordered by descending cosine similarity to `query`.
///
/// Ties keep candidate order, so the ranking is a pure function of its
/// inputs.
pub fn rank_by_similarity(query: &[f32], candidates: &[&[f32]]) -> Result<Vec<SimilarityResult>> {
    let mut ranked = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            cosine_similarity(query, candidate).map(|score| SimilarityResult { index, score })
        })
        .collect::<Result<Vec<_>>>()?;
    ranked.sort_by_key(|r| (std::cmp::Reverse(OrderedFloat(r.score)), r.index));
    Ok(ranked)
}
