//! Rank fusion.
//!
//! Both rankings are lists of `(candidate index, score)` in rank order. A
//! candidate missing from a list has no rank in it and contributes nothing
//! from that side.

use std::cmp::Ordering;
use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::config::FusionMethod;

/// A candidate after fusion. Ranks are 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fused {
    pub index: usize,
    pub score: f32,
    pub dense_rank: Option<usize>,
    pub sparse_rank: Option<usize>,
}

impl Fused {
    fn best_rank(&self) -> usize {
        self.dense_rank
            .into_iter()
            .chain(self.sparse_rank)
            .min()
            .unwrap_or(usize::MAX)
    }

    fn other_rank(&self) -> usize {
        match (self.dense_rank, self.sparse_rank) {
            (Some(d), Some(s)) => d.max(s),
            _ => usize::MAX,
        }
    }
}

/// Order by descending score; ties go to the better individual rank, then
/// the other rank, then candidate position.
fn compare(a: &Fused, b: &Fused) -> Ordering {
    OrderedFloat(b.score)
        .cmp(&OrderedFloat(a.score))
        .then(a.best_rank().cmp(&b.best_rank()))
        .then(a.other_rank().cmp(&b.other_rank()))
        .then(a.index.cmp(&b.index))
}

/// Fuse a dense and a sparse ranking into one ordered list.
pub fn fuse(dense: &[(usize, f32)], sparse: &[(usize, f32)], method: FusionMethod) -> Vec<Fused> {
    let mut fused: HashMap<usize, Fused> = HashMap::new();
    let blank = |index| Fused {
        index,
        score: 0.0,
        dense_rank: None,
        sparse_rank: None,
    };

    for (rank, &(index, _)) in dense.iter().enumerate() {
        fused.entry(index).or_insert_with(|| blank(index)).dense_rank = Some(rank + 1);
    }
    for (rank, &(index, _)) in sparse.iter().enumerate() {
        fused.entry(index).or_insert_with(|| blank(index)).sparse_rank = Some(rank + 1);
    }

    match method {
        FusionMethod::Rrf { k } => {
            for f in fused.values_mut() {
                f.score = [f.dense_rank, f.sparse_rank]
                    .into_iter()
                    .flatten()
                    .map(|rank| 1.0 / (k + rank as f32))
                    .sum();
            }
        }
        FusionMethod::Weighted {
            dense: dense_weight,
            sparse: sparse_weight,
        } => {
            let dense_norm = min_max(dense);
            let sparse_norm = min_max(sparse);
            for f in fused.values_mut() {
                let d = dense_norm.get(&f.index).copied().unwrap_or(0.0);
                let s = sparse_norm.get(&f.index).copied().unwrap_or(0.0);
                f.score = dense_weight * d + sparse_weight * s;
            }
        }
    }

    let mut out: Vec<Fused> = fused.into_values().collect();
    out.sort_by(compare);
    out
}

/// Scale scores into `[0, 1]`. A list of equal scores maps to 1.0.
fn min_max(ranking: &[(usize, f32)]) -> HashMap<usize, f32> {
    let min = ranking.iter().map(|&(_, s)| s).fold(f32::INFINITY, f32::min);
    let max = ranking
        .iter()
        .map(|&(_, s)| s)
        .fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;

    ranking
        .iter()
        .map(|&(index, score)| {
            let norm = if span > f32::EPSILON {
                (score - min) / span
            } else {
                1.0
            };
            (index, norm)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn order(fused: &[Fused]) -> Vec<usize> {
        fused.iter().map(|f| f.index).collect()
    }

    #[test]
    fn test_rrf_rewards_agreement() {
        let dense = [(0, 0.9), (1, 0.8), (2, 0.1)];
        let sparse = [(1, 5.0), (2, 1.0)];

        let fused = fuse(&dense, &sparse, FusionMethod::Rrf { k: 60.0 });

        assert_eq!(order(&fused), vec![1, 2, 0]);
        assert_eq!(fused[0].dense_rank, Some(2));
        assert_eq!(fused[0].sparse_rank, Some(1));
        assert_eq!(fused[2].sparse_rank, None);
    }

    #[test]
    fn test_rrf_ties_prefer_better_individual_rank() {
        // 0 is (1, 3) and 1 is (3, 1): equal scores and equal ranks, so
        // position decides. 2 is (2, 2) and scores lower than both.
        let dense = [(0, 0.9), (2, 0.8), (1, 0.7)];
        let sparse = [(1, 3.0), (2, 2.0), (0, 1.0)];

        let fused = fuse(&dense, &sparse, FusionMethod::Rrf { k: 60.0 });

        assert_eq!(order(&fused), vec![0, 1, 2]);
    }

    #[test]
    fn test_weighted_fusion() {
        let dense = [(0, 1.0), (1, 0.5), (2, 0.0)];
        let sparse = [(2, 10.0), (1, 5.0)];

        let fused = fuse(
            &dense,
            &sparse,
            FusionMethod::Weighted {
                dense: 0.3,
                sparse: 0.7,
            },
        );

        assert_eq!(order(&fused), vec![2, 0, 1]);
        assert!((fused[0].score - 0.7).abs() < 1e-6);
        assert!((fused[2].score - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_is_deterministic() {
        let dense = [(3, 0.5), (1, 0.5), (2, 0.5), (0, 0.5)];
        let a = fuse(&dense, &[], FusionMethod::default());
        let b = fuse(&dense, &[], FusionMethod::default());
        assert_eq!(a, b);
        assert_eq!(order(&a), vec![3, 1, 2, 0]);
    }
}
