/// Position-aware blend between the fused retrieval score and the
/// reranker's judgement. Pinning the top-3 retrieval slots at
/// 75% retrieval preserves strong literal matches that query expansion
/// noise can otherwise cause the reranker to bury; ranks past 10 lean the
/// other way since by then retrieval alone is a weak signal.
pub fn retrieval_weight(pre_rerank_rank: usize) -> f32 {
    match pre_rerank_rank {
        1..=3 => 0.75,
        4..=10 => 0.60,
        _ => 0.40,
    }
}

/// Blend a normalized RRF score with a reranker probability at a given
/// pre-rerank rank (1-based).
pub fn blend(normalized_rrf: f32, rerank_score: f32, pre_rerank_rank: usize) -> f32 {
    let w = retrieval_weight(pre_rerank_rank);
    w * normalized_rrf + (1.0 - w) * rerank_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_buckets_match_the_blend_table() {
        assert_eq!(retrieval_weight(1), 0.75);
        assert_eq!(retrieval_weight(3), 0.75);
        assert_eq!(retrieval_weight(4), 0.60);
        assert_eq!(retrieval_weight(10), 0.60);
        assert_eq!(retrieval_weight(11), 0.40);
        assert_eq!(retrieval_weight(500), 0.40);
    }

    #[test]
    fn top_three_rank_with_zero_rerank_score_keeps_at_least_75_percent_of_retrieval() {
        for rank in 1..=3 {
            let blended = blend(0.8, 0.0, rank);
            assert!((blended - 0.75 * 0.8).abs() < 1e-6);
            assert!(blended >= 0.75 * 0.8 - 1e-6);
        }
    }

    #[test]
    fn a_perfect_rerank_score_pulls_the_blend_toward_one() {
        let blended = blend(0.2, 1.0, 50);
        assert!((blended - (0.40 * 0.2 + 0.60 * 1.0)).abs() < 1e-6);
    }
}
