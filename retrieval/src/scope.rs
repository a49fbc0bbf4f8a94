//! Scope predicate (§4.6 "Scope check"), grounded in `original_source`'s
//! `scope_checker.py`: a keyword blocklist short-circuit followed by a
//! 3-result semantic probe through the same hybrid searcher.

use chunking_store::FilterClause;

use crate::searcher::HybridSearcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedCategory {
    GeneralKnowledge,
    CodingAssistance,
    PersonalAdvice,
    HarmfulContent,
}

impl BlockedCategory {
    fn as_str(self) -> &'static str {
        match self {
            BlockedCategory::GeneralKnowledge => "general_knowledge",
            BlockedCategory::CodingAssistance => "coding_assistance",
            BlockedCategory::PersonalAdvice => "personal_advice",
            BlockedCategory::HarmfulContent => "harmful_content",
        }
    }
}

/// `(keyword, category)`, the same ~40-term blocklist as `original_source`'s
/// `OUT_OF_SCOPE_KEYWORDS` with its `_categorize_blocked` mapping folded in.
const OUT_OF_SCOPE_KEYWORDS: &[(&str, BlockedCategory)] = &[
    ("weather", BlockedCategory::GeneralKnowledge),
    ("temperature", BlockedCategory::GeneralKnowledge),
    ("forecast", BlockedCategory::GeneralKnowledge),
    ("news", BlockedCategory::GeneralKnowledge),
    ("current events", BlockedCategory::GeneralKnowledge),
    ("politics", BlockedCategory::GeneralKnowledge),
    ("sports", BlockedCategory::GeneralKnowledge),
    ("game", BlockedCategory::GeneralKnowledge),
    ("match", BlockedCategory::GeneralKnowledge),
    ("score", BlockedCategory::GeneralKnowledge),
    ("movie", BlockedCategory::GeneralKnowledge),
    ("film", BlockedCategory::GeneralKnowledge),
    ("tv show", BlockedCategory::GeneralKnowledge),
    ("celebrity", BlockedCategory::GeneralKnowledge),
    ("recipe", BlockedCategory::GeneralKnowledge),
    ("cooking", BlockedCategory::GeneralKnowledge),
    ("food", BlockedCategory::GeneralKnowledge),
    ("write code", BlockedCategory::CodingAssistance),
    ("write a program", BlockedCategory::CodingAssistance),
    ("debug", BlockedCategory::CodingAssistance),
    ("fix my code", BlockedCategory::CodingAssistance),
    ("implement", BlockedCategory::CodingAssistance),
    ("coding", BlockedCategory::CodingAssistance),
    ("programming", BlockedCategory::CodingAssistance),
    ("algorithm", BlockedCategory::CodingAssistance),
    ("python code", BlockedCategory::CodingAssistance),
    ("javascript", BlockedCategory::CodingAssistance),
    ("java code", BlockedCategory::CodingAssistance),
    ("relationship", BlockedCategory::PersonalAdvice),
    ("dating", BlockedCategory::PersonalAdvice),
    ("love advice", BlockedCategory::PersonalAdvice),
    ("career advice", BlockedCategory::PersonalAdvice),
    ("job", BlockedCategory::PersonalAdvice),
    ("salary", BlockedCategory::PersonalAdvice),
    ("health advice", BlockedCategory::PersonalAdvice),
    ("medical", BlockedCategory::PersonalAdvice),
    ("symptoms", BlockedCategory::PersonalAdvice),
    ("financial advice", BlockedCategory::PersonalAdvice),
    ("investment", BlockedCategory::PersonalAdvice),
    ("life advice", BlockedCategory::PersonalAdvice),
    ("personal problem", BlockedCategory::PersonalAdvice),
    ("ignore previous", BlockedCategory::HarmfulContent),
    ("ignore instructions", BlockedCategory::HarmfulContent),
    ("pretend", BlockedCategory::HarmfulContent),
    ("roleplay", BlockedCategory::HarmfulContent),
    ("act as", BlockedCategory::HarmfulContent),
    ("bypass", BlockedCategory::HarmfulContent),
    ("hack", BlockedCategory::HarmfulContent),
    ("exploit", BlockedCategory::HarmfulContent),
    ("harmful", BlockedCategory::HarmfulContent),
    ("illegal", BlockedCategory::HarmfulContent),
    ("dangerous", BlockedCategory::HarmfulContent),
];

/// Terms that raise confidence a question is about the indexed materials,
/// lowering the in-scope score threshold from 0.5 to 0.3 when present.
const IN_SCOPE_INDICATORS: &[&str] = &[
    "slide", "page", "lecture", "chapter", "week", "module", "lesson", "topic", "explain", "what is",
    "define", "describe", "example", "concept", "theory", "course", "material", "content",
];

#[derive(Debug, Clone)]
pub struct ScopeResult {
    pub in_scope: bool,
    pub confidence: f32,
    pub reason: String,
    pub related_topics: Vec<String>,
    pub blocked_category: Option<BlockedCategory>,
}

/// Checks whether `question` is in scope of the indexed materials.
///
/// Runs the keyword blocklist first (short-circuits with high confidence),
/// then a 3-result semantic probe through `searcher`. On probe failure the
/// predicate is permissive: `in_scope = true, confidence = 0.5`, matching
/// `original_source`'s except-path ("be permissive and let retrieval
/// handle it").
pub fn check_scope(question: &str, searcher: &HybridSearcher<'_>) -> ScopeResult {
    let lower = question.to_lowercase();

    for &(keyword, category) in OUT_OF_SCOPE_KEYWORDS {
        if lower.contains(keyword) {
            tracing::info!(keyword, "question blocked by out-of-scope keyword");
            return ScopeResult {
                in_scope: false,
                confidence: 0.9,
                reason: format!("Question appears to be about {keyword}, which is outside the course materials."),
                related_topics: Vec::new(),
                blocked_category: Some(category),
            };
        }
    }

    let has_in_scope_indicator = IN_SCOPE_INDICATORS.iter().any(|ind| lower.contains(ind));
    let threshold = if has_in_scope_indicator { 0.3 } else { 0.5 };

    let no_filters: &[FilterClause] = &[];
    match searcher.search(question, no_filters, 3) {
        Ok(response) if response.results.is_empty() => ScopeResult {
            in_scope: false,
            confidence: 0.7,
            reason: "No relevant content found in the course materials for this question.".to_string(),
            related_topics: Vec::new(),
            blocked_category: None,
        },
        Ok(response) => {
            let max_score = response.max_score();
            let mut related_topics = Vec::new();
            for result in &response.results {
                for topic in result.chunk.metadata.topic_tags.iter().take(2) {
                    if !related_topics.contains(topic) {
                        related_topics.push(topic.clone());
                    }
                }
            }
            related_topics.truncate(5);

            if max_score >= threshold {
                ScopeResult {
                    in_scope: true,
                    confidence: max_score.min(1.0),
                    reason: "Question appears to be related to indexed course materials.".to_string(),
                    related_topics,
                    blocked_category: None,
                }
            } else {
                ScopeResult {
                    in_scope: false,
                    confidence: 1.0 - max_score,
                    reason: "Question does not appear to be covered in the available course materials.".to_string(),
                    related_topics,
                    blocked_category: None,
                }
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "scope probe failed, defaulting to permissive");
            ScopeResult {
                in_scope: true,
                confidence: 0.5,
                reason: "Unable to verify scope, proceeding with retrieval.".to_string(),
                related_topics: Vec::new(),
                blocked_category: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_hit_short_circuits_with_category() {
        let found = OUT_OF_SCOPE_KEYWORDS.iter().find(|(k, _)| *k == "recipe");
        assert_eq!(found.unwrap().1, BlockedCategory::GeneralKnowledge);
    }

    #[test]
    fn category_labels_match_original_naming() {
        assert_eq!(BlockedCategory::HarmfulContent.as_str(), "harmful_content");
    }

    #[test]
    fn in_scope_indicator_lowers_threshold_case() {
        let lower = "Can you explain this slide?".to_lowercase();
        assert!(IN_SCOPE_INDICATORS.iter().any(|ind| lower.contains(ind)));
    }
}
