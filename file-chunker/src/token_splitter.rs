//! Token accounting and the token-bounded splitter shared by every chunker
//! variant (§4.2). Uses the `cl100k_base` BPE encoding so chunk sizes line up
//! with the embedding model family this pipeline targets.

use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

fn encoder() -> &'static CoreBPE {
    static ENC: OnceLock<CoreBPE> = OnceLock::new();
    ENC.get_or_init(|| tiktoken_rs::cl100k_base().expect("cl100k_base encoding tables"))
}

pub fn count_tokens(text: &str) -> usize {
    encoder().encode_with_special_tokens(text).len()
}

/// Cheap pre-check estimate; not used for the authoritative `token_count` field.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

#[derive(Debug, Clone, Copy)]
pub struct SplitParams {
    pub target_tokens: usize,
    pub max_tokens: usize,
    pub min_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            target_tokens: 500,
            max_tokens: 1000,
            min_tokens: 100,
            overlap_tokens: 50,
        }
    }
}

/// Split `text` into a sequence of substrings, each at most `max_tokens` tokens,
/// with `overlap_tokens` of repeated context between consecutive pieces. If the
/// whole text already fits, returns a single-element vector unchanged.
///
/// The stride loop terminates once the remaining tail is shorter than
/// `overlap_tokens` rather than looping forever on it (Design Notes open question):
/// `start = end - overlap_tokens; if start >= total - 1 { break }`.
pub fn split_text_by_tokens(text: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    let enc = encoder();
    let tokens = enc.encode_with_special_tokens(text);
    let total = tokens.len();

    if total <= max_tokens {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + max_tokens).min(total);
        let piece_tokens = &tokens[start..end];
        let decoded = enc
            .decode(piece_tokens.to_vec())
            .unwrap_or_default();
        let trimmed = decoded.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }

        if end >= total {
            break;
        }

        let next_start = end.saturating_sub(overlap_tokens);
        if next_start <= start || next_start >= total.saturating_sub(1) {
            break;
        }
        start = next_start;
    }

    if parts.is_empty() {
        parts.push(text.to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_not_split() {
        let parts = split_text_by_tokens("hello world", 1000, 50);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], "hello world");
    }

    #[test]
    fn long_text_splits_into_multiple_overlapping_chunks() {
        let sentence = "This is a test sentence. ".repeat(500);
        let parts = split_text_by_tokens(&sentence, 300, 50);
        assert!(parts.len() > 1);
        for part in &parts {
            assert!(count_tokens(part) <= 300);
        }
    }

    #[test]
    fn estimate_is_cheap_and_roughly_tracks_exact_count() {
        let text = "word ".repeat(40);
        let est = estimate_tokens(&text);
        let exact = count_tokens(&text);
        assert!(est > 0 && exact > 0);
    }
}
