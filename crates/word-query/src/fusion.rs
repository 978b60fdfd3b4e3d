//! Rank fusion for combining retriever result lists.
//!
//! Both methods take the union of the input lists: a document missing from
//! a list simply receives no contribution from it. The fused list is sorted
//! by descending score with ties going to the lower document id.

use std::collections::{BTreeMap, HashSet};

use word_core::{DocumentId, FusedResult, FusionMethod, RankedHit, Result, WordError};

/// One retriever's ranking together with its weight.
pub type WeightedList<'a> = (&'a [RankedHit], f32);

/// Scale weights to sum to 1.
///
/// Weights must be finite, non-negative and not all zero.
pub fn normalize_weights(weights: &[f32]) -> Result<Vec<f32>> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(WordError::invalid_argument(format!(
            "fusion weights must be non-negative, got {:?}",
            weights
        )));
    }
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return Err(WordError::invalid_argument("fusion weights must not all be zero"));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

/// Min-max normalize a list's raw scores into [0, 1].
///
/// A list whose scores are all equal (including a single hit) maps to 1.0.
pub fn min_max_normalize(hits: &[RankedHit]) -> Vec<(DocumentId, f32)> {
    let min = hits.iter().map(|h| h.score).fold(f32::INFINITY, f32::min);
    let max = hits.iter().map(|h| h.score).fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    hits.iter()
        .map(|h| {
            let normalized = if range > 0.0 {
                (h.score - min) / range
            } else {
                1.0
            };
            (h.document_id, normalized)
        })
        .collect()
}

/// Convex combination (CC) fusion.
///
/// fused = Σ w_i * minmax_i(score), with weights normalized to sum to 1.
pub fn convex_combination(lists: &[WeightedList<'_>]) -> Result<Vec<FusedResult>> {
    let weights = normalize_weights(&lists.iter().map(|(_, w)| *w).collect::<Vec<_>>())?;

    let mut scores: BTreeMap<DocumentId, f32> = BTreeMap::new();
    for ((hits, _), weight) in lists.iter().zip(weights) {
        let mut seen = HashSet::new();
        for (id, normalized) in min_max_normalize(hits) {
            // first occurrence wins if a list repeats a document
            if seen.insert(id) {
                *scores.entry(id).or_default() += weight * normalized;
            }
        }
    }

    Ok(rank(scores))
}

/// Weighted Reciprocal Rank Fusion.
///
/// fused = Σ w_i / (c + rank_i), with weights normalized to sum to 1.
/// Higher `c` flattens the advantage of top-ranked results.
pub fn reciprocal_rank_fusion(lists: &[WeightedList<'_>], c: u32) -> Result<Vec<FusedResult>> {
    let weights = normalize_weights(&lists.iter().map(|(_, w)| *w).collect::<Vec<_>>())?;

    let mut scores: BTreeMap<DocumentId, f32> = BTreeMap::new();
    for ((hits, _), weight) in lists.iter().zip(weights) {
        let mut seen = HashSet::new();
        for hit in hits.iter() {
            if seen.insert(hit.document_id) {
                let rrf_score = weight / (c as f32 + hit.rank as f32);
                *scores.entry(hit.document_id).or_default() += rrf_score;
            }
        }
    }

    Ok(rank(scores))
}

/// Fuse a dense and a sparse ranking with the configured method.
pub fn fuse(
    method: FusionMethod,
    dense: &[RankedHit],
    sparse: &[RankedHit],
    weights: [f32; 2],
    rrf_k: u32,
) -> Result<Vec<FusedResult>> {
    let lists = [(dense, weights[0]), (sparse, weights[1])];
    match method {
        FusionMethod::Cc => convex_combination(&lists),
        FusionMethod::Rrf => reciprocal_rank_fusion(&lists, rrf_k),
    }
}

/// Keep the first `k` fused results.
pub fn top_k(mut fused: Vec<FusedResult>, k: usize) -> Vec<FusedResult> {
    fused.truncate(k);
    fused
}

fn rank(scores: BTreeMap<DocumentId, f32>) -> Vec<FusedResult> {
    let mut fused: Vec<(DocumentId, f32)> = scores.into_iter().collect();
    fused.sort_by(crate::sparse::by_score_then_id);

    fused
        .into_iter()
        .enumerate()
        .map(|(i, (document_id, fused_score))| FusedResult {
            document_id,
            fused_score,
            fused_rank: i as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(entries: &[(DocumentId, f32)]) -> Vec<RankedHit> {
        entries
            .iter()
            .enumerate()
            .map(|(i, &(document_id, score))| RankedHit {
                document_id,
                score,
                rank: i as u32 + 1,
            })
            .collect()
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_cc_matches_hand_computation() {
        // dense: 10 -> 0.9, 11 -> 0.7, 12 -> 0.5   => normalized 1.0, 0.5, 0.0
        // sparse: 11 -> 8.0, 13 -> 2.0             => normalized 1.0, 0.0
        let dense = hits(&[(10, 0.9), (11, 0.7), (12, 0.5)]);
        let sparse = hits(&[(11, 8.0), (13, 2.0)]);

        let fused = convex_combination(&[(&dense, 0.75), (&sparse, 0.25)]).unwrap();
        let by_id: Vec<(DocumentId, f32)> =
            fused.iter().map(|f| (f.document_id, f.fused_score)).collect();

        // 11: 0.75*0.5 + 0.25*1.0 = 0.625
        // 10: 0.75*1.0            = 0.75
        // 12: 0.0, 13: 0.0 (tie -> ascending id)
        assert_eq!(by_id.iter().map(|x| x.0).collect::<Vec<_>>(), vec![10, 11, 12, 13]);
        assert!(approx(by_id[0].1, 0.75));
        assert!(approx(by_id[1].1, 0.625));
        assert!(approx(by_id[2].1, 0.0));
        assert!(approx(by_id[3].1, 0.0));
        assert_eq!(
            fused.iter().map(|f| f.fused_rank).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn test_cc_weights_normalized_internally() {
        let dense = hits(&[(1, 0.9), (2, 0.1)]);
        let sparse = hits(&[(2, 3.0), (1, 1.0)]);

        let a = convex_combination(&[(&dense, 0.77), (&sparse, 0.23)]).unwrap();
        let b = convex_combination(&[(&dense, 77.0), (&sparse, 23.0)]).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.document_id, y.document_id);
            assert!(approx(x.fused_score, y.fused_score));
        }
        assert_eq!(a[0].document_id, 1);
        assert!(approx(a[0].fused_score, 0.77));
        assert!(approx(a[1].fused_score, 0.23));
    }

    #[test]
    fn test_union_not_intersection() {
        let dense = hits(&[(0, 0.9), (1, 0.8), (2, 0.7)]);
        let sparse = hits(&[(3, 5.0), (4, 1.0)]);

        let fused = fuse(FusionMethod::Cc, &dense, &sparse, [0.77, 0.23], 60).unwrap();
        assert_eq!(fused.len(), 5);

        let score = |id: DocumentId| {
            fused
                .iter()
                .find(|f| f.document_id == id)
                .map(|f| f.fused_score)
                .unwrap()
        };
        // dense-only documents scored from the dense list alone
        assert!(approx(score(0), 0.77));
        assert!(approx(score(1), 0.77 * 0.5));
        assert!(approx(score(2), 0.0));
        // sparse-only documents scored from the sparse list alone
        assert!(approx(score(3), 0.23));
        assert!(approx(score(4), 0.0));
    }

    #[test]
    fn test_one_empty_list() {
        let dense = hits(&[(5, 0.4), (6, 0.2)]);
        let fused = fuse(FusionMethod::Cc, &dense, &[], [0.77, 0.23], 60).unwrap();
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].document_id, 5);
        assert!(approx(fused[0].fused_score, 0.77));
        assert!(approx(fused[1].fused_score, 0.0));

        let none = fuse(FusionMethod::Cc, &[], &[], [0.77, 0.23], 60).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_single_hit_lists_normalize_to_one() {
        let dense = hits(&[(0, 0.31)]);
        let sparse = hits(&[(0, 0.92)]);
        let fused = fuse(FusionMethod::Cc, &dense, &sparse, [0.77, 0.23], 60).unwrap();
        assert_eq!(fused.len(), 1);
        assert!(approx(fused[0].fused_score, 1.0));
    }

    #[test]
    fn test_invalid_weights() {
        let dense = hits(&[(0, 1.0)]);
        assert!(convex_combination(&[(&dense, 0.0), (&dense, 0.0)]).is_err());
        assert!(convex_combination(&[(&dense, -0.5), (&dense, 1.5)]).is_err());
        assert!(reciprocal_rank_fusion(&[(&dense, f32::NAN)], 60).is_err());
    }

    #[test]
    fn test_zero_weight_list_contributes_nothing() {
        let dense = hits(&[(0, 1.0), (1, 0.5)]);
        let sparse = hits(&[(1, 9.0), (0, 1.0)]);
        let fused = fuse(FusionMethod::Cc, &dense, &sparse, [1.0, 0.0], 60).unwrap();
        assert_eq!(fused[0].document_id, 0);
        assert!(approx(fused[0].fused_score, 1.0));
    }

    #[test]
    fn test_rrf() {
        let dense = hits(&[(0, 0.9), (1, 0.8)]);
        let sparse = hits(&[(1, 4.0), (2, 2.0)]);
        let fused = fuse(FusionMethod::Rrf, &dense, &sparse, [0.5, 0.5], 60).unwrap();

        assert_eq!(fused.len(), 3);
        // 1 appears in both lists
        assert_eq!(fused[0].document_id, 1);
        assert!(approx(fused[0].fused_score, 0.5 / 62.0 + 0.5 / 61.0));
        // 0 (dense rank 1) and 2 (sparse rank 2)
        assert_eq!(fused[1].document_id, 0);
        assert!(approx(fused[1].fused_score, 0.5 / 61.0));
        assert_eq!(fused[2].document_id, 2);
    }

    #[test]
    fn test_rrf_tie_ascending_id() {
        let dense = hits(&[(7, 0.9)]);
        let sparse = hits(&[(3, 4.0)]);
        let fused = fuse(FusionMethod::Rrf, &dense, &sparse, [0.5, 0.5], 60).unwrap();
        assert_eq!(fused[0].document_id, 3);
        assert_eq!(fused[1].document_id, 7);
    }

    #[test]
    fn test_top_k_truncation() {
        let dense = hits(&(0..10).map(|i| (i, 1.0 - i as f32 * 0.1)).collect::<Vec<_>>());
        let fused = convex_combination(&[(&dense, 1.0)]).unwrap();
        assert_eq!(fused.len(), 10);

        let top = top_k(fused.clone(), 3);
        assert_eq!(top, fused[..3].to_vec());
        assert_eq!(top_k(fused, 20).len(), 10);
    }

    #[test]
    fn test_min_max_normalize() {
        let normalized = min_max_normalize(&hits(&[(0, 4.0), (1, 3.0), (2, 2.0)]));
        assert_eq!(normalized, vec![(0, 1.0), (1, 0.5), (2, 0.0)]);
        assert!(min_max_normalize(&[]).is_empty());
    }
}
