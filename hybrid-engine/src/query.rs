use std::collections::BTreeMap;

use doc_model::DocumentHit;
use doc_store::{FindOptions, FindOutcome, Store};
use embedding_provider::Provider;
use llm_host::Host;
use rayon::prelude::*;

use crate::blend::blend;
use crate::errors::Result;
use crate::{bm25, rrf, vector};

/// Each retrieval list (one method, one query variant) is capped here
/// before fusion; chunk-to-document collapse and cross-list overlap
/// mean the fused candidate pool ends up much smaller than `Q.len() * 2
/// * RETRIEVAL_LIST_LIMIT`.
const RETRIEVAL_LIST_LIMIT: usize = 20;
/// How many query variants the expander is asked to produce, in
/// addition to the original query.
const EXPANSION_FANOUT: usize = 2;
/// The original query is entered into the fused query set this many
/// times, so it counts for as much as two expansion variants combined.
const ORIGINAL_QUERY_WEIGHT: usize = 2;
/// Fused candidates surviving to the rerank stage.
const FUSION_KEEP_TOP: usize = 30;

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub limit: usize,
    pub min_score: f32,
    pub collection: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.0,
            collection: None,
        }
    }
}

/// One hybrid-pipeline result, carrying the intermediate scores that
/// produced its final rank so a caller can explain the outcome.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub docid: String,
    pub collection: String,
    pub filepath: String,
    pub title: String,
    pub blended_score: f32,
    pub normalized_rrf: f32,
    pub rerank_score: Option<f32>,
}

struct Candidate {
    docid: String,
    hit: DocumentHit,
    excerpt: String,
}

/// Run the full hybrid retrieval pipeline: query expansion,
/// parallel BM25 + vector retrieval across the expanded query set,
/// Reciprocal Rank Fusion with top-rank bonuses, LLM reranking of the
/// fused shortlist, and a position-aware blend of retrieval and rerank
/// scores.
///
/// `provider` is `None` when no embedding provider is configured;
/// vector retrieval is then skipped and fusion runs on BM25 lists alone.
/// `host` is `None` when no local LLM models are configured; expansion
/// and reranking are then both skipped and `blended_score` falls back to
/// `normalized_rrf`.
pub fn query(
    store: &Store,
    provider: Option<&Provider>,
    host: Option<&Host>,
    text: &str,
    opts: &QueryOptions,
) -> Result<Vec<QueryHit>> {
    let variants = host.map(|h| llm_host::expand(h, store, text)).unwrap_or_default();

    let query_set: Vec<&str> = if variants.is_empty() {
        vec![text]
    } else {
        let mut set = Vec::with_capacity(ORIGINAL_QUERY_WEIGHT + EXPANSION_FANOUT);
        for _ in 0..ORIGINAL_QUERY_WEIGHT {
            set.push(text);
        }
        set.extend(variants.iter().take(EXPANSION_FANOUT).map(String::as_str));
        set
    };

    let collection = opts.collection.as_deref();

    // BM25 and vector retrieval touch no shared mutable state, so the
    // whole query set is dispatched concurrently.
    let per_query: Vec<(Vec<DocumentHit>, Vec<DocumentHit>)> = query_set
        .par_iter()
        .map(|q| -> Result<(Vec<DocumentHit>, Vec<DocumentHit>)> {
            let bm25_hits = bm25::search(store, q, RETRIEVAL_LIST_LIMIT, collection)?;
            let vector_hits = match provider {
                Some(p) => vector::search(store, p, q, RETRIEVAL_LIST_LIMIT, collection)?,
                None => Vec::new(),
            };
            Ok((bm25_hits, vector_hits))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut by_docid: BTreeMap<String, DocumentHit> = BTreeMap::new();
    let mut rank_lists: Vec<Vec<String>> = Vec::with_capacity(per_query.len() * 2);
    for (bm25_hits, vector_hits) in &per_query {
        rank_lists.push(collect_ids(bm25_hits, &mut by_docid));
        rank_lists.push(collect_ids(vector_hits, &mut by_docid));
    }

    let list_refs: Vec<&[String]> = rank_lists.iter().map(Vec::as_slice).collect();
    let fused = rrf::fuse(&list_refs);

    let mut ranked: Vec<(String, f32)> = fused.into_iter().collect();
    sort_by_score_then_docid(&mut ranked);
    ranked.truncate(FUSION_KEEP_TOP);

    let kept: BTreeMap<String, f32> = ranked.iter().cloned().collect();
    let normalized = rrf::normalize(&kept);

    let candidates: Vec<Candidate> = ranked
        .iter()
        .filter_map(|(docid, _)| {
            let hit = by_docid.get(docid)?.clone();
            let excerpt = fetch_excerpt(store, docid);
            Some(Candidate {
                docid: docid.clone(),
                hit,
                excerpt,
            })
        })
        .collect();

    // One rerank call over the whole shortlist, in fused-rank order so
    // output index lines up with pre-rerank rank.
    let rerank_scores: Option<Vec<f32>> = host.and_then(|h| {
        let excerpts: Vec<&str> = candidates.iter().map(|c| c.excerpt.as_str()).collect();
        llm_host::rerank(h, store, text, &excerpts)
            .ok()
            .map(|pairs| pairs.into_iter().map(|(_, score)| score).collect())
    });

    let mut results: Vec<QueryHit> = candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| {
            let pre_rerank_rank = idx + 1;
            let norm = normalized.get(&candidate.docid).copied().unwrap_or(0.0);
            let rerank_score = rerank_scores.as_ref().and_then(|scores| scores.get(idx).copied());
            let blended = match rerank_score {
                Some(r) => blend(norm, r, pre_rerank_rank),
                None => norm,
            };
            QueryHit {
                docid: candidate.docid,
                collection: candidate.hit.collection,
                filepath: candidate.hit.filepath,
                title: candidate.hit.title,
                blended_score: blended,
                normalized_rrf: norm,
                rerank_score,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.blended_score
            .partial_cmp(&a.blended_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.docid.cmp(&b.docid))
    });
    results.retain(|r| r.blended_score >= opts.min_score);
    results.truncate(opts.limit);
    Ok(results)
}

fn collect_ids(hits: &[DocumentHit], by_docid: &mut BTreeMap<String, DocumentHit>) -> Vec<String> {
    let mut ids = Vec::with_capacity(hits.len());
    for hit in hits {
        ids.push(hit.docid.clone());
        by_docid.entry(hit.docid.clone()).or_insert_with(|| hit.clone());
    }
    ids
}

fn sort_by_score_then_docid(ranked: &mut [(String, f32)]) {
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

fn fetch_excerpt(store: &Store, docid: &str) -> String {
    match store.find_document(&format!("#{docid}"), FindOptions { include_body: true }) {
        Ok(FindOutcome::Found(doc)) => doc.body,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_the_original_query_alone_when_expansion_is_unavailable() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "# Title\nhello world").unwrap();

        let hits = query(&store, None, None, "hello", &QueryOptions::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filepath, "a.md");
        // No rerank model: blended score is exactly the normalized RRF score.
        assert_eq!(hits[0].blended_score, hits[0].normalized_rrf);
        assert!(hits[0].rerank_score.is_none());
    }

    #[test]
    fn stale_content_drops_out_of_query_results_after_reindexing() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "# Title\nhello world").unwrap();
        store.add_or_update_document("notes", "a.md", "# Title\ngoodbye world").unwrap();

        assert!(query(&store, None, None, "hello", &QueryOptions::default()).unwrap().is_empty());
        let hits = query(&store, None, None, "goodbye", &QueryOptions::default()).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn min_score_filters_out_weak_matches() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "hello world").unwrap();
        let opts = QueryOptions {
            min_score: 2.0, // normalized RRF never exceeds 1.0
            ..QueryOptions::default()
        };
        assert!(query(&store, None, None, "hello", &opts).unwrap().is_empty());
    }

    #[test]
    fn limit_truncates_the_result_set() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("notes", "a.md", "shared term one").unwrap();
        store.add_or_update_document("notes", "b.md", "shared term two").unwrap();
        store.add_or_update_document("notes", "c.md", "shared term three").unwrap();
        let opts = QueryOptions {
            limit: 2,
            ..QueryOptions::default()
        };
        let hits = query(&store, None, None, "shared term", &opts).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn collection_filter_is_honored_end_to_end() {
        let store = Store::open_in_memory().unwrap();
        store.add_or_update_document("a", "x.md", "shared term").unwrap();
        store.add_or_update_document("b", "y.md", "shared term").unwrap();
        let opts = QueryOptions {
            collection: Some("a".to_string()),
            ..QueryOptions::default()
        };
        let hits = query(&store, None, None, "shared", &opts).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].collection, "a");
    }
}
