//! Term-to-title similarity scoring
use crate::catalog::Value;
use crate::text::normalize;

/// Default addend when the term occurs verbatim in the normalized value
pub const DEFAULT_LITERAL_MATCH_BONUS: f64 = 0.2;

/// Length of the longest common subsequence of two character slices
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];
    for &lc in long {
        for (j, &sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// Share of matching characters: `2 * LCS / (len(a) + len(b))`, in `[0, 1]`
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * lcs_len(&a, &b) as f64 / total as f64
}

/// Score `term` against an already normalized value.
///
/// `term` must be lower-cased by the caller. The bonus can push the result above 1.
pub fn score_normalized(term: &str, normalized: &str, literal_match_bonus: f64) -> f64 {
    if normalized.is_empty() {
        return 0.0;
    }
    let mut score = ratio(term, normalized);
    if normalized.contains(term) {
        score += literal_match_bonus;
    }
    score
}

/// Score a search term against one catalog cell.
///
/// Nulls, numbers and values with no content left after normalization score 0.
pub fn score(term: &str, value: &Value, literal_match_bonus: f64) -> f64 {
    match value {
        Value::Text(text) => score_normalized(
            &term.trim().to_lowercase(),
            &normalize(text),
            literal_match_bonus,
        ),
        Value::Null | Value::Number(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio("", ""), 0.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("wages", "wages"), 1.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_ratio_matching_characters() {
        // LCS("abcd", "bcde") = "bcd"
        assert!((ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
        assert_eq!(ratio("abcd", "bcde"), ratio("bcde", "abcd"));
    }

    #[test]
    fn test_literal_bonus_exceeds_one() {
        let s = score("Wages", &Value::from("Wages"), DEFAULT_LITERAL_MATCH_BONUS);
        assert!((s - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_substring_gets_bonus() {
        let with_bonus = score("gdp", &Value::from("GDP and main components"), 0.2);
        let without = score("gdp", &Value::from("GDP and main components"), 0.0);
        assert!((with_bonus - without - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_no_signal_values() {
        assert_eq!(score("gdp", &Value::Null, 0.2), 0.0);
        assert_eq!(score("gdp", &Value::Number(2005.0), 0.2), 0.0);
        assert_eq!(score("gdp", &Value::from("the of and"), 0.2), 0.0);
        assert_eq!(score("gdp", &Value::from(""), 0.2), 0.0);
    }
}
