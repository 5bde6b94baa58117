/// Classic dynamic-programming edit distance, used only to rank
/// `find_document` suggestions when nothing matches exactly. Corpora here
/// are personal document collections (hundreds to low thousands of
/// files), so the O(n*m) cost per candidate is not worth pulling in a
/// dedicated string-similarity crate for.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0usize; m + 1];

    for i in 1..=n {
        curr[0] = i;
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

/// Rank `candidates` by edit distance to `query`, keeping at most
/// `limit` within `max_distance`.
pub fn nearest(query: &str, candidates: &[String], max_distance: usize, limit: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .map(|c| (levenshtein(query, c), c))
        .filter(|(d, _)| *d <= max_distance)
        .collect();
    scored.sort_by_key(|(d, c)| (*d, c.len()));
    scored.into_iter().take(limit).map(|(_, c)| c.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_zero_distance() {
        assert_eq!(levenshtein("notes/a.md", "notes/a.md"), 0);
    }

    #[test]
    fn single_edit_is_distance_one() {
        assert_eq!(levenshtein("notes/a.md", "notes/b.md"), 1);
    }

    #[test]
    fn nearest_filters_by_max_distance() {
        let candidates = vec!["notes/a.md".to_string(), "notes/ab.md".to_string(), "other/z.md".to_string()];
        let got = nearest("notes/a.md", &candidates, 2, 5);
        assert!(got.contains(&"notes/ab.md".to_string()));
        assert!(!got.contains(&"other/z.md".to_string()));
    }
}
