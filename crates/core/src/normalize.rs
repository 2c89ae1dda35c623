use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{Nd}\s]+").expect("valid normalizer regex"));

/// Canonical comparable form of free text: lower-cased, punctuation and
/// symbols turned into spaces, whitespace collapsed and trimmed.
pub fn normalize_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let lowered = input.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Same as [`normalize_text`], treating absent input as blank.
pub fn normalize_optional(input: Option<&str>) -> String {
    input.map(normalize_text).unwrap_or_default()
}

/// Distinct words of an already canonical string.
pub fn words_of(canonical: &str) -> HashSet<String> {
    canonical
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn word_set(input: &str) -> HashSet<String> {
    words_of(&normalize_text(input))
}
