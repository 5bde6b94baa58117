/// Something that can count tokens in a span of text. Implemented by
/// whatever tokenizer an embedding provider carries; the chunker itself
/// never links against a tokenizer crate.
pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Target size and overlap fraction for one chunking pass.
pub enum ChunkPolicy<'a> {
    /// No tokenizer available: split on a fixed character count.
    CharacterBased { target_chars: usize, overlap_fraction: f32 },
    /// Provider advertises `has_tokenizer = true`: split on a token
    /// budget, converted to an equivalent character window via the
    /// corpus-wide chars-per-token ratio. Token boundaries near the
    /// window edge are a hint, not exact — re-tokenizing every candidate
    /// boundary would cost more than the chunk quality it buys here.
    TokenBased {
        target_tokens: usize,
        overlap_fraction: f32,
        counter: &'a dyn TokenCounter,
    },
}

impl<'a> ChunkPolicy<'a> {
    pub const DEFAULT_TOKEN_TARGET: usize = 800;
    pub const DEFAULT_CHAR_TARGET: usize = 3200;
    pub const DEFAULT_OVERLAP_FRACTION: f32 = 0.15;

    pub fn character_based() -> Self {
        ChunkPolicy::CharacterBased {
            target_chars: Self::DEFAULT_CHAR_TARGET,
            overlap_fraction: Self::DEFAULT_OVERLAP_FRACTION,
        }
    }

    pub fn token_based(counter: &'a dyn TokenCounter) -> Self {
        ChunkPolicy::TokenBased {
            target_tokens: Self::DEFAULT_TOKEN_TARGET,
            overlap_fraction: Self::DEFAULT_OVERLAP_FRACTION,
            counter,
        }
    }
}
