//! Unsupervised keyword scoring in the spirit of YAKE (term frequency, casing,
//! position, and span-length features combined into a single score; lower is
//! more important). No YAKE crate exists in the corpus, so this hand-rolls the
//! handful of signals the algorithm is known for rather than porting it whole.

use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "in", "is", "it", "its", "of", "on", "or", "our", "that", "the", "their", "this", "to", "was",
    "we", "were", "will", "with", "you", "your", "i", "not", "can", "all", "if", "so", "do", "did",
];

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word.to_ascii_lowercase().as_str())
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .filter(|w| !w.is_empty())
        .collect()
}

struct Candidate {
    surface: String,
    count: u32,
    capitalized_count: u32,
    first_position: usize,
    span: usize,
}

/// Extracts up to `num_keywords` keywords from a chunk's text, combined from
/// 1..=`max_ngram_size`-word candidate spans, deduplicated above a word-set
/// Jaccard similarity of `dedup_threshold`.
pub struct KeywordExtractor {
    max_ngram_size: usize,
    dedup_threshold: f32,
    num_keywords: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self {
            max_ngram_size: 3,
            dedup_threshold: 0.9,
            num_keywords: 10,
        }
    }
}

impl KeywordExtractor {
    pub fn new(max_ngram_size: usize, dedup_threshold: f32, num_keywords: usize) -> Self {
        Self {
            max_ngram_size: max_ngram_size.max(1),
            dedup_threshold,
            num_keywords,
        }
    }

    pub fn extract(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let words = tokenize(text);
        if words.is_empty() {
            return Vec::new();
        }

        let mut candidates: HashMap<String, Candidate> = HashMap::new();

        for span in 1..=self.max_ngram_size.min(words.len()) {
            for start in 0..=(words.len() - span) {
                let slice = &words[start..start + span];
                if is_stopword(slice[0]) || is_stopword(slice[slice.len() - 1]) {
                    continue;
                }
                let key = slice.iter().map(|w| w.to_ascii_lowercase()).collect::<Vec<_>>().join(" ");
                let entry = candidates.entry(key).or_insert_with(|| Candidate {
                    surface: slice.join(" "),
                    count: 0,
                    capitalized_count: 0,
                    first_position: start,
                    span,
                });
                entry.count += 1;
                if slice[0].chars().next().is_some_and(char::is_uppercase) {
                    entry.capitalized_count += 1;
                }
            }
        }

        if candidates.is_empty() {
            return Vec::new();
        }

        let word_count = words.len() as f32;
        let mut scored: Vec<(String, f32)> = candidates
            .into_values()
            .map(|c| (c.surface, self.score(&c, word_count)))
            .collect();
        // Lower score is more important, matching YAKE's convention.
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut chosen: Vec<String> = Vec::with_capacity(self.num_keywords);
        let mut chosen_word_sets: Vec<Vec<String>> = Vec::with_capacity(self.num_keywords);
        for (surface, _score) in scored {
            let word_set: Vec<String> = surface.split_whitespace().map(str::to_ascii_lowercase).collect();
            let too_similar = chosen_word_sets
                .iter()
                .any(|other| jaccard(&word_set, other) >= self.dedup_threshold);
            if too_similar {
                continue;
            }
            chosen_word_sets.push(word_set);
            chosen.push(surface);
            if chosen.len() >= self.num_keywords {
                break;
            }
        }
        chosen
    }

    fn score(&self, c: &Candidate, word_count: f32) -> f32 {
        let tf_score = 1.0 / (1.0 + c.count as f32);
        let casing_score = 1.0 - (c.capitalized_count as f32 / c.count as f32);
        let position_score = (1.0 + c.first_position as f32) / word_count;
        let span_bonus = 1.0 / c.span as f32;
        (tf_score + casing_score + position_score) * span_bonus
    }
}

fn jaccard(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let set_a: std::collections::HashSet<&String> = a.iter().collect();
    let set_b: std::collections::HashSet<&String> = b.iter().collect();
    let intersection = set_a.intersection(&set_b).count() as f32;
    let union = set_a.union(&set_b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_keywords() {
        let extractor = KeywordExtractor::default();
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("   ").is_empty());
    }

    #[test]
    fn repeated_phrase_outranks_incidental_words() {
        let extractor = KeywordExtractor::new(2, 0.9, 5);
        let text = "Rust ownership is a core concept. Rust ownership prevents data races. \
                    Understanding Rust ownership takes practice.";
        let keywords = extractor.extract(text);
        assert!(!keywords.is_empty());
        assert!(keywords.iter().any(|k| k.to_ascii_lowercase().contains("ownership")));
    }

    #[test]
    fn near_duplicate_ngrams_are_deduplicated() {
        let extractor = KeywordExtractor::new(3, 0.5, 10);
        let text = "machine learning machine learning models machine learning pipelines";
        let keywords = extractor.extract(text);
        let lowered: Vec<String> = keywords.iter().map(|k| k.to_ascii_lowercase()).collect();
        let learning_variants = lowered.iter().filter(|k| k.contains("machine learning")).count();
        assert!(learning_variants <= 2, "expected near-duplicate phrases to be collapsed, got {lowered:?}");
    }
}
