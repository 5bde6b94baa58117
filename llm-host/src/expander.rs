use doc_model::CachePurpose;
use doc_store::Store;

use crate::host::Host;

/// Produce two alternative phrasings of `query`, cached by model id and
/// query text. Any failure along the way — model unavailable, cache
/// read/write error, unparsable generation output — degrades to an empty
/// list rather than propagating, per this component's contract: the
/// hybrid pipeline falls back to the original query alone.
pub fn expand(host: &Host, store: &Store, query: &str) -> Vec<String> {
    let model_id = match host.generator_model_id() {
        Ok(m) => m,
        Err(_) => return Vec::new(),
    };

    if let Ok(Some(cached)) = store.get_cached_response(&model_id, CachePurpose::Expand, query) {
        let variants = parse_variants(&cached);
        if !variants.is_empty() {
            return variants;
        }
    }

    let prompt = format!(
        "Rewrite the search query \"{query}\" as two alternative phrasings that preserve its meaning. \
         Respond with a JSON array of exactly two strings and nothing else."
    );
    let raw = match host.generate(&prompt) {
        Ok(r) => r,
        Err(_) => return Vec::new(),
    };

    let variants = parse_variants(&raw);
    if !variants.is_empty() {
        if let Ok(json) = serde_json::to_string(&variants) {
            let _ = store.put_cached_response(&model_id, CachePurpose::Expand, query, &json);
        }
    }
    variants
}

fn parse_variants(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if let Ok(v) = serde_json::from_str::<Vec<String>>(trimmed) {
        return v.into_iter().take(2).collect();
    }
    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if end > start {
            if let Ok(v) = serde_json::from_str::<Vec<String>>(&trimmed[start..=end]) {
                return v.into_iter().take(2).collect();
            }
        }
    }
    trimmed
        .lines()
        .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|l| !l.is_empty())
        .take(2)
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_clean_json_array() {
        let v = parse_variants(r#"["alpha", "beta"]"#);
        assert_eq!(v, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn parses_a_json_array_embedded_in_prose() {
        let v = parse_variants("Sure, here you go: [\"alpha\", \"beta\"] enjoy!");
        assert_eq!(v, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn falls_back_to_lines_when_not_json() {
        let v = parse_variants("- alpha\n- beta\n- gamma");
        assert_eq!(v, vec!["alpha".to_string(), "beta".to_string()]);
    }
}
