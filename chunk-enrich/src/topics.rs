//! Keyword-frequency topic classification and document-intent inference,
//! mirroring `original_source`'s `TopicClassifier` (same 14 default topics,
//! same intent indicator lists) exactly, since both are plain data tables
//! with no model behind them.

use chunk_model::DocumentIntent;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// The 14 default topic -> keyword-phrase mappings, unchanged from the source.
pub fn default_topic_keywords() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        ("introduction", &["introduction", "overview", "getting started", "basics", "fundamentals"]),
        ("concepts", &["concept", "theory", "principle", "definition", "terminology"]),
        ("tutorial", &["tutorial", "how to", "step by step", "guide", "walkthrough", "example"]),
        ("reference", &["reference", "api", "documentation", "specification", "syntax"]),
        ("best_practices", &["best practice", "recommendation", "tip", "guideline", "pattern"]),
        ("troubleshooting", &["troubleshoot", "debug", "error", "issue", "problem", "fix"]),
        ("architecture", &["architecture", "design", "structure", "component", "system"]),
        ("security", &["security", "authentication", "authorization", "encryption", "vulnerability"]),
        ("performance", &["performance", "optimization", "speed", "efficiency", "scalability"]),
        ("testing", &["test", "testing", "unit test", "integration", "validation"]),
        ("deployment", &["deploy", "deployment", "production", "release", "ci/cd"]),
        ("data", &["data", "database", "storage", "query", "model"]),
        ("networking", &["network", "api", "http", "request", "endpoint"]),
        ("configuration", &["config", "configuration", "setting", "environment", "setup"]),
    ]
}

const TUTORIAL_INDICATORS: &[&str] = &[
    "step 1", "step 2", "how to", "let's", "we will", "follow these", "in this tutorial", "example:",
];
const REFERENCE_INDICATORS: &[&str] = &[
    "api reference", "parameters:", "returns:", "syntax:", "arguments:", "options:", "methods:",
];
const OVERVIEW_INDICATORS: &[&str] = &[
    "introduction", "overview", "in this section", "what is", "this document", "goals:",
];

/// Classifies chunk text into topic tags via whole-word keyword frequency,
/// normalized by word count, against a reverse keyword->topics index built
/// once at construction.
pub struct TopicClassifier {
    keyword_to_topics: HashMap<String, Vec<&'static str>>,
    threshold: f32,
    max_topics: usize,
}

impl Default for TopicClassifier {
    fn default() -> Self {
        Self::new(default_topic_keywords(), 0.01, 5)
    }
}

impl TopicClassifier {
    pub fn new(topic_keywords: Vec<(&'static str, &'static [&'static str])>, threshold: f32, max_topics: usize) -> Self {
        let mut keyword_to_topics: HashMap<String, Vec<&'static str>> = HashMap::new();
        for (topic, keywords) in topic_keywords {
            for keyword in keywords {
                keyword_to_topics
                    .entry(keyword.to_ascii_lowercase())
                    .or_default()
                    .push(topic);
            }
        }
        Self {
            keyword_to_topics,
            threshold,
            max_topics,
        }
    }

    pub fn classify(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let text_lower = text.to_lowercase();
        let word_count = text_lower.split_whitespace().count() as f32;
        if word_count == 0.0 {
            return Vec::new();
        }

        let mut topic_scores: HashMap<&'static str, u32> = HashMap::new();
        for (keyword, topics) in &self.keyword_to_topics {
            let count = whole_word_count(&text_lower, keyword);
            if count > 0 {
                for topic in topics {
                    *topic_scores.entry(topic).or_insert(0) += count;
                }
            }
        }

        if topic_scores.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<(&'static str, u32)> = topic_scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let mut out = Vec::with_capacity(self.max_topics);
        for (topic, count) in ranked {
            let score = count as f32 / word_count;
            if score >= self.threshold {
                out.push(topic.to_string());
            }
            if out.len() >= self.max_topics {
                break;
            }
        }
        out
    }
}

fn whole_word_count(text_lower: &str, keyword: &str) -> u32 {
    static CACHE: OnceLock<std::sync::Mutex<HashMap<String, Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| std::sync::Mutex::new(HashMap::new()));
    let mut guard = cache.lock().unwrap();
    let re = guard.entry(keyword.to_string()).or_insert_with(|| {
        Regex::new(&format!(r"\b{}\b", regex::escape(keyword))).unwrap()
    });
    re.find_iter(text_lower).count() as u32
}

/// Infers a document's overall intent from ordered indicator phrase lists;
/// the first matching class wins.
pub fn infer_document_intent(text: &str) -> DocumentIntent {
    let lower = text.to_lowercase();
    if TUTORIAL_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return DocumentIntent::Tutorial;
    }
    if REFERENCE_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return DocumentIntent::Reference;
    }
    if OVERVIEW_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return DocumentIntent::Overview;
    }
    DocumentIntent::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_tutorial_text() {
        let classifier = TopicClassifier::default();
        let topics = classifier.classify("Follow this tutorial: step by step guide with examples.");
        assert!(topics.contains(&"tutorial".to_string()));
    }

    #[test]
    fn empty_text_yields_no_topics() {
        let classifier = TopicClassifier::default();
        assert!(classifier.classify("").is_empty());
    }

    #[test]
    fn tutorial_indicator_wins_intent() {
        assert_eq!(infer_document_intent("Step 1: install the crate. Step 2: run it."), DocumentIntent::Tutorial);
    }

    #[test]
    fn reference_indicator_wins_when_no_tutorial_markers() {
        assert_eq!(infer_document_intent("API Reference\nParameters: name, value\nReturns: bool"), DocumentIntent::Reference);
    }

    #[test]
    fn overview_indicator_is_lowest_priority() {
        assert_eq!(infer_document_intent("Introduction\nThis document covers the basics."), DocumentIntent::Overview);
    }

    #[test]
    fn no_indicators_yields_unknown() {
        assert_eq!(infer_document_intent("The cat sat on the mat."), DocumentIntent::Unknown);
    }
}
