//! Splits document bodies into fixed-size, overlapping chunks for
//! embedding. Token-based chunking estimates a character window from the
//! corpus-wide chars-per-token ratio rather than re-tokenizing every
//! candidate boundary; see [`ChunkPolicy::TokenBased`].

mod policy;

pub use policy::{ChunkPolicy, TokenCounter};

/// One chunk of a larger body: `pos` is the character offset of the first
/// character of `text` within the original body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedChunk {
    pub pos: usize,
    pub text: String,
}

/// Split `text` per `policy`. Covers the whole input; consecutive chunks
/// overlap by `policy`'s overlap fraction. An empty input yields no
/// chunks; an input shorter than the target size yields exactly one
/// chunk at `pos = 0`.
pub fn chunk(text: &str, policy: &ChunkPolicy) -> Vec<PositionedChunk> {
    if text.is_empty() {
        return Vec::new();
    }
    match policy {
        ChunkPolicy::CharacterBased { target_chars, overlap_fraction } => {
            chunk_by_chars(text, *target_chars, *overlap_fraction)
        }
        ChunkPolicy::TokenBased { target_tokens, overlap_fraction, counter } => {
            let total_tokens = counter.count(text).max(1);
            let total_chars = text.chars().count().max(1);
            let chars_per_token = total_chars as f64 / total_tokens as f64;
            let target_chars = ((*target_tokens as f64) * chars_per_token).round().max(1.0) as usize;
            chunk_by_chars(text, target_chars, *overlap_fraction)
        }
    }
}

fn chunk_by_chars(text: &str, target_chars: usize, overlap_fraction: f32) -> Vec<PositionedChunk> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let target_chars = target_chars.max(1);

    if n <= target_chars {
        return vec![PositionedChunk { pos: 0, text: text.to_string() }];
    }

    let overlap = ((target_chars as f32) * overlap_fraction).round() as usize;
    let step = target_chars.saturating_sub(overlap).max(1);

    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + target_chars).min(n);
        let piece: String = chars[start..end].iter().collect();
        out.push(PositionedChunk { pos: start, text: piece });
        if end >= n {
            break;
        }
        start += step;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_yields_a_single_chunk_at_zero() {
        let chunks = chunk("hello world", &ChunkPolicy::character_based());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].pos, 0);
        assert_eq!(chunks[0].text, "hello world");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", &ChunkPolicy::character_based()).is_empty());
    }

    #[test]
    fn character_based_chunks_cover_the_whole_input_with_overlap() {
        let body = "x".repeat(1000);
        let policy = ChunkPolicy::CharacterBased { target_chars: 300, overlap_fraction: 0.15 };
        let chunks = chunk(&body, &policy);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.last().unwrap().pos + chunks.last().unwrap().text.len(), 1000);
        // consecutive chunks overlap
        let step = chunks[1].pos - chunks[0].pos;
        assert!(step < 300);
    }

    #[test]
    fn token_based_uses_corpus_wide_ratio() {
        let body = "word ".repeat(2000);
        let counter = |t: &str| t.split_whitespace().count();
        let policy = ChunkPolicy::TokenBased { target_tokens: 100, overlap_fraction: 0.15, counter: &counter };
        let chunks = chunk(&body, &policy);
        assert!(chunks.len() > 1);
        // Each chunk should be roughly 100 tokens' worth of characters.
        let avg_len: usize = chunks.iter().map(|c| c.text.chars().count()).sum::<usize>() / chunks.len();
        assert!(avg_len > 200 && avg_len < 800, "avg_len = {avg_len}");
    }

    #[test]
    fn preserves_text_verbatim_without_normalization() {
        let body = "Line one.\n\nLine two with   extra spaces.\n";
        let chunks = chunk(body, &ChunkPolicy::character_based());
        assert_eq!(chunks[0].text, body);
    }
}
