//! Heuristics for reading a customer question: keywords, person names, and
//! whether it asks about the business in general.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "what", "when", "where",
    "why", "how", "your", "you", "me", "my", "our", "we", "us", "i", "he", "she", "it", "they",
    "them", "this", "that", "these", "those", "to", "for", "with", "by", "at", "on", "in", "of",
    "about", "as", "if", "then", "than", "so", "because", "can", "could", "would", "should",
    "will", "shall", "may", "might",
];

static GENERAL_KEYWORDS: &[&str] = &[
    "what", "when", "where", "why", "how", "can", "could", "would", "should", "hours", "time",
    "open", "close", "location", "address", "contact", "phone", "email", "price", "cost",
    "service", "support", "help", "business", "work", "operating", "available", "hour",
    "schedule", "timing",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("Invalid keyword regex"));

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]+").expect("Invalid token regex"));

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:who is|tell me about|what does|who's|what is)\s+([a-zA-Z\s]+)(?:'s)?",
        r"([a-zA-Z\s]+)(?:'s)?(?:\s+profile|info|bio|other name|role)?$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid name regex"))
    .collect()
});

/// Distinct lowercase words of three or more letters, minus stop words,
/// in sorted order.
pub fn extract_keywords(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Guess which person a question is about.
///
/// Phrase patterns ("who is X", "tell me about X", "X's profile") run over
/// the lowercased question. When none yields a name longer than two
/// characters, capitalized words after the first word are used instead.
pub fn extract_name(question: &str) -> Option<String> {
    let lower = question.trim().to_lowercase();
    let lower = lower.trim_end_matches(['?', '!', '.']);

    for pattern in NAME_PATTERNS.iter() {
        if let Some(name) = pattern
            .captures(lower)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
        {
            if name.len() > 2 {
                return Some(name.to_string());
            }
        }
    }

    let capitalized: Vec<&str> = question
        .split_whitespace()
        .skip(1)
        .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()))
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .collect();
    (!capitalized.is_empty()).then(|| capitalized.join(" "))
}

/// Whether the question is about the business rather than a person.
pub fn is_general_question(question: &str) -> bool {
    let lower = question.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .any(|m| GENERAL_KEYWORDS.contains(&m.as_str()))
}
