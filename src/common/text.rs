//! Text helpers for keyword matching.
//!
//! Every keyword lookup in the pipeline goes through [`normalize_text`] on
//! both sides, so "Full-Stack", "full stack" and "FULL  STACK" all compare
//! equal and "dev" never matches inside "devices".

/// Collapse runs of whitespace into a single space and trim the ends
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-case, turn punctuation into word breaks and collapse whitespace.
///
/// `+`, `#` and inner `.` survive so terms like `c#`, `c++` and `node.js`
/// keep their identity; a trailing or leading `.` is dropped.
pub fn normalize_text(input: &str) -> String {
    let mapped: String = input
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '+' | '#' | '.') {
                c
            } else {
                ' '
            }
        })
        .collect();

    mapped
        .split_whitespace()
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `term` appears in `haystack` on word boundaries.
///
/// Both arguments are normalized first; multi-word terms must appear as a
/// contiguous phrase.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    let term = normalize_text(term);
    if term.is_empty() {
        return false;
    }
    let haystack = normalize_text(haystack);
    format!(" {} ", haystack).contains(&format!(" {} ", term))
}

/// Terms from `vocabulary` found in `haystack`, in vocabulary order and
/// without duplicates
pub fn matched_terms<'a, S: AsRef<str>>(haystack: &str, vocabulary: &'a [S]) -> Vec<&'a str> {
    let padded = format!(" {} ", normalize_text(haystack));
    let mut seen: Vec<String> = Vec::new();
    let mut hits = Vec::new();

    for term in vocabulary {
        let normalized = normalize_text(term.as_ref());
        if normalized.is_empty() || seen.contains(&normalized) {
            continue;
        }
        if padded.contains(&format!(" {} ", normalized)) {
            hits.push(term.as_ref());
        }
        seen.push(normalized);
    }

    hits
}

/// Number of vocabulary terms found in `haystack`
pub fn count_terms<S: AsRef<str>>(haystack: &str, vocabulary: &[S]) -> usize {
    matched_terms(haystack, vocabulary).len()
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
