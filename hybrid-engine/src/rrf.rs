use std::collections::BTreeMap;

/// RRF's smoothing constant, pinned at 60 per the original Cormack et
/// al. paper; it keeps the top few ranks from dominating a fused list
/// built from many queries.
const RRF_K: f32 = 60.0;

/// Extra weight folded into a rank's RRF contribution before summing,
/// so that being first (or in the top three) in any one retrieval list
/// counts for a bit more than the bare `1/(k+rank)` term alone.
fn rank_bonus(rank: usize) -> f32 {
    match rank {
        1 => 0.05,
        2 | 3 => 0.02,
        _ => 0.0,
    }
}

/// One ranked list of document ids, best first, as produced by one
/// retrieval method against one query variant.
pub type RankedList<'a> = &'a [String];

/// Fuse any number of ranked document-id lists into one score per
/// document id. Each list contributes `1/(RRF_K + rank)` for every docid
/// it contains, summed across lists; a docid absent from a list
/// contributes nothing from it. A single top-rank bonus is then added
/// per docid, based on the *best* (lowest) rank it achieved in any one
/// list — not summed per occurrence, so a docid that happens to rank
/// first in several lists (e.g. because the original query is entered
/// twice for extra weight) isn't rewarded more than one that ranks
/// first in just one.
pub fn fuse(lists: &[RankedList]) -> BTreeMap<String, f32> {
    let mut scores: BTreeMap<String, f32> = BTreeMap::new();
    let mut best_rank: BTreeMap<String, usize> = BTreeMap::new();
    for list in lists {
        for (idx, docid) in list.iter().enumerate() {
            let rank = idx + 1;
            let contribution = 1.0 / (RRF_K + rank as f32);
            *scores.entry(docid.clone()).or_insert(0.0) += contribution;
            best_rank
                .entry(docid.clone())
                .and_modify(|r| *r = (*r).min(rank))
                .or_insert(rank);
        }
    }
    for (docid, score) in scores.iter_mut() {
        let rank = best_rank.get(docid).copied().unwrap_or(usize::MAX);
        *score += rank_bonus(rank);
    }
    scores
}

/// Normalize fused scores to `[0, 1]` by dividing by the maximum, so
/// they can be blended against a reranker's `[0, 1]` probability on a
/// comparable scale. A fully empty or all-zero input maps every score
/// to `0.0`.
pub fn normalize(scores: &BTreeMap<String, f32>) -> BTreeMap<String, f32> {
    let max = scores.values().cloned().fold(0.0_f32, f32::max);
    if max <= 0.0 {
        return scores.keys().map(|k| (k.clone(), 0.0)).collect();
    }
    scores.iter().map(|(k, v)| (k.clone(), v / max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn a_docid_present_in_every_list_outranks_one_present_in_only_one() {
        let a = list(&["x", "y", "z"]);
        let b = list(&["x", "w", "v"]);
        let fused = fuse(&[&a, &b]);
        assert!(fused["x"] > fused["y"]);
        assert!(fused["x"] > fused["w"]);
    }

    #[test]
    fn earlier_rank_scores_higher_than_later_rank_in_the_same_list() {
        let a = list(&["x", "y", "z", "w"]);
        let fused = fuse(&[&a]);
        assert!(fused["x"] > fused["y"]);
        assert!(fused["y"] > fused["z"]);
        assert!(fused["z"] > fused["w"]);
    }

    #[test]
    fn top_rank_bonus_makes_rank_one_strictly_better_than_rank_two() {
        let a = list(&["x", "y"]);
        let fused = fuse(&[&a]);
        let gap_1_2 = fused["x"] - fused["y"];
        let bare_gap = 1.0 / (RRF_K + 1.0) - 1.0 / (RRF_K + 2.0);
        assert!(gap_1_2 > bare_gap);
    }

    #[test]
    fn normalize_maps_the_top_score_to_one() {
        let a = list(&["x", "y", "z"]);
        let fused = fuse(&[&a]);
        let normalized = normalize(&fused);
        assert!((normalized["x"] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_of_empty_scores_is_empty() {
        let empty: BTreeMap<String, f32> = BTreeMap::new();
        assert!(normalize(&empty).is_empty());
    }

    #[test]
    fn top_rank_bonus_is_applied_once_per_docid_not_once_per_list() {
        // "x" ranks first in two lists; "y" ranks first in only one.
        // Both get the rank-1 bonus, but "x" doesn't get it twice.
        let a = list(&["x", "z"]);
        let b = list(&["x", "w"]);
        let c = list(&["y", "v"]);
        let fused = fuse(&[&a, &b, &c]);
        let x_base = 1.0 / (RRF_K + 1.0) * 2.0; // rank 1 in both a and b
        let x_expected = x_base + rank_bonus(1);
        assert!((fused["x"] - x_expected).abs() < 1e-6);
    }
}
