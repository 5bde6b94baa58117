use doc_model::CachePurpose;
use doc_store::Store;

use crate::errors::Result;
use crate::host::Host;

/// Cache key separator that cannot appear in either a query or an
/// excerpt's leading bytes in practice; collisions would only merge two
/// cache entries, never corrupt a read.
const PAIR_SEPARATOR: char = '\u{1}';

/// Score each `excerpts[i]` against `query`, returning `(index, score)`
/// pairs in input order. Unlike [`crate::expander::expand`], failures
/// here propagate: the hybrid pipeline needs to know the reranker was
/// unavailable so it can fall back to RRF-only ordering rather than
/// silently scoring everything zero.
pub fn rerank(host: &Host, store: &Store, query: &str, excerpts: &[&str]) -> Result<Vec<(usize, f32)>> {
    let model_id = host.reranker_model_id()?;
    let mut out = Vec::with_capacity(excerpts.len());

    for (i, excerpt) in excerpts.iter().enumerate() {
        let cache_input = format!("{query}{PAIR_SEPARATOR}{excerpt}");
        let cached = store.get_cached_response(&model_id, CachePurpose::Rerank, &cache_input)?;

        let score = match cached.and_then(|c| c.parse::<f32>().ok()) {
            Some(s) => s,
            None => {
                let s = host.rerank_pair(query, excerpt)?;
                store.put_cached_response(&model_id, CachePurpose::Rerank, &cache_input, &s.to_string())?;
                s
            }
        };
        out.push((i, score));
    }

    Ok(out)
}
