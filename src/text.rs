//! Title normalization and keyword statistics
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Most common English words, dropped before comparing titles
pub const STOP_WORDS: [&str; 49] = [
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
    "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
    "say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
    "what", "so", "up", "out", "if", "about", "who", "get", "which", "go",
];

const PUNCTUATION: &str = r#"[,.!?;:\-()\[\]{}'"&%$#@*+=/\\|<>~`^_]"#;

lazy_static! {
    static ref PUNCT_RE: Regex = Regex::new(PUNCTUATION).unwrap();
    static ref STOP_RE: Regex =
        Regex::new(&format!(r"(?:by|b|y)? (?:{}) ", STOP_WORDS.join("|"))).unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
}

fn normalize_once(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = PUNCT_RE.replace_all(&lowered, " ");
    let padded = format!(" {spaced} ");
    let stripped = STOP_RE.replace_all(&padded, " ").replace("the", "");
    SPACES_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Canonical comparison key for a title.
///
/// Punctuation becomes whitespace, common function words are removed (together
/// with a directly preceding `b`/`y`/`by`), leftover `the` fragments are deleted,
/// and whitespace is collapsed. The result is lower-case and trimmed, and applying
/// `normalize` again returns it unchanged.
pub fn normalize(text: &str) -> String {
    let mut current = normalize_once(text);
    // A pass that changes the text always shortens it.
    for _ in 0..=current.len() {
        let next = normalize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Count normalized tokens across `values`, most frequent first.
///
/// Ties are ordered alphabetically so the listing is deterministic.
pub fn keyword_counts<'a, I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        for token in normalize(value).split(' ').filter(|t| !t.is_empty()) {
            *counts.entry(token.to_string()).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
