/// Function words dropped when turning free text into search terms.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "at", "by", "for", "from", "in", "into", "is", "it", "of", "on", "or",
    "the", "to", "was", "with",
];

#[must_use]
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

#[must_use]
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.iter().any(|stop| stop.eq_ignore_ascii_case(word))
}

/// Split on anything that is not alphanumeric, `-`, `_` or `.`, keeping the
/// original case. Trailing dots are trimmed so "pod X." yields "X".
pub fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .map(|word| word.trim_matches('.'))
        .filter(|word| !word.is_empty())
}

/// Lowercased search terms with stopwords removed, in first-seen order and
/// without duplicates.
#[must_use]
pub fn search_terms(s: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in words(s) {
        if is_stopword(word) {
            continue;
        }
        let lowered = word.to_lowercase();
        if !terms.contains(&lowered) {
            terms.push(lowered);
        }
    }
    terms
}
