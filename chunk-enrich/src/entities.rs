//! Deliberately approximate named-entity recognition: a capitalized-run
//! heuristic for person/organization plus a date regex, standing in for the
//! original source's spaCy-backed extractor (swappable per spec, callers must
//! tolerate an empty list).

use chunk_model::Entity;
use regex::Regex;
use std::sync::OnceLock;

const ORG_SUFFIXES: &[&str] = &[
    "Inc", "Inc.", "Corp", "Corp.", "Corporation", "LLC", "Ltd", "Ltd.", "Company", "University",
    "Institute", "Foundation", "Association", "Organization", "Group", "Labs", "Systems",
];

const LOCATION_WORDS: &[&str] = &[
    "City", "Street", "Avenue", "County", "State", "Country", "River", "Mountain", "Lake",
    "Island", "Ocean", "Valley", "Province",
];

const KNOWN_PLACES: &[&str] = &[
    "United States", "United Kingdom", "Canada", "Germany", "France", "Japan", "China", "India",
    "Brazil", "Australia", "Europe", "Africa", "Asia", "London", "Paris", "Tokyo", "Berlin",
    "New York",
];

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            \b\d{4}-\d{2}-\d{2}\b
            |\b\d{1,2}/\d{1,2}/\d{2,4}\b
            |\b(?:January|February|March|April|May|June|July|August|September|October|November|December)
              \s+\d{1,2},?\s+\d{4}\b
            |\b\d{1,2}\s+(?:January|February|March|April|May|June|July|August|September|October|November|December)
              \s+\d{4}\b
            ",
        )
        .unwrap()
    })
}

fn capitalized_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-zA-Z'.]*(?:\s+[A-Z][a-zA-Z'.]*)*\b").unwrap())
}

/// Gazetteer + regex entity extractor: approximate by design.
#[derive(Debug, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str, max_entities: usize) -> Vec<Entity> {
        if text.trim().is_empty() || max_entities == 0 {
            return Vec::new();
        }

        let mut found: Vec<Entity> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for m in date_regex().find_iter(text) {
            let value = m.as_str().to_string();
            if seen.insert(("date".to_string(), value.clone())) {
                found.push(Entity {
                    text: value,
                    entity_type: "date".to_string(),
                });
            }
        }

        // Splitting on sentence boundaries avoids treating the first, merely
        // sentence-capitalized word of every sentence as a proper noun.
        for sentence in split_sentences(text) {
            for (offset, run) in find_runs_after_first_word(&sentence) {
                let _ = offset;
                if run.split_whitespace().all(|w| is_known_stopword(w)) {
                    continue;
                }
                let entity_type = classify_run(&run);
                if seen.insert((entity_type.to_string(), run.clone())) {
                    found.push(Entity {
                        text: run,
                        entity_type: entity_type.to_string(),
                    });
                }
            }
        }

        found.truncate(max_entities);
        found
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn find_runs_after_first_word(sentence: &str) -> Vec<(usize, String)> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start_index = 0usize;

    for (idx, word) in words.iter().enumerate() {
        if idx == 0 {
            continue; // sentence-initial capitalization is not a signal
        }
        let cleaned = word.trim_end_matches([',', ';', ':']);
        if capitalized_run_regex().is_match(cleaned) && cleaned.chars().next().is_some_and(char::is_uppercase) {
            if current.is_empty() {
                start_index = idx;
            }
            current.push(cleaned);
        } else if !current.is_empty() {
            runs.push((start_index, current.join(" ")));
            current.clear();
        }
    }
    if !current.is_empty() {
        runs.push((start_index, current.join(" ")));
    }
    runs
}

fn is_known_stopword(word: &str) -> bool {
    matches!(word, "The" | "A" | "An" | "This" | "That" | "These" | "Those")
}

fn classify_run(run: &str) -> &'static str {
    if KNOWN_PLACES.iter().any(|p| run.eq_ignore_ascii_case(p)) {
        return "location";
    }
    let words: Vec<&str> = run.split_whitespace().collect();
    if let Some(last) = words.last() {
        if ORG_SUFFIXES.iter().any(|s| s.eq_ignore_ascii_case(last.trim_end_matches('.'))) {
            return "organization";
        }
    }
    if words.iter().any(|w| LOCATION_WORDS.iter().any(|l| w.eq_ignore_ascii_case(l))) {
        return "location";
    }
    if words.len() == 2 {
        "person"
    } else {
        "organization"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_dates_in_multiple_formats() {
        let extractor = EntityExtractor::new();
        let entities = extractor.extract("The deadline is 2024-03-15, confirmed on 3/15/2024.", 10);
        assert!(entities.iter().any(|e| e.entity_type == "date"));
    }

    #[test]
    fn classifies_organization_suffix() {
        let extractor = EntityExtractor::new();
        let entities = extractor.extract("We partnered with Acme Corp on this rollout.", 10);
        assert!(entities.iter().any(|e| e.entity_type == "organization" && e.text.contains("Acme")));
    }

    #[test]
    fn classifies_two_word_run_as_person() {
        let extractor = EntityExtractor::new();
        let entities = extractor.extract("According to Jane Doe, the results were conclusive.", 10);
        assert!(entities.iter().any(|e| e.entity_type == "person" && e.text == "Jane Doe"));
    }

    #[test]
    fn empty_text_yields_no_entities() {
        let extractor = EntityExtractor::new();
        assert!(extractor.extract("", 10).is_empty());
    }
}
