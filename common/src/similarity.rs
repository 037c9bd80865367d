//! Approximate string similarity
//!
//! All scorers return an integer on 0..=100 where 100 means the two inputs are
//! identical. Inputs are expected to be normalized already.

use serde::{Deserialize, Serialize};

/// Similarity metric used by the fuzzy pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Indel ratio: `2 * LCS / (len(a) + len(b))`
    #[default]
    Ratio,
    /// Normalized edit distance: `1 - lev(a, b) / max(len)`
    Levenshtein,
    /// Indel ratio after sorting whitespace-separated tokens
    TokenSortRatio,
}

impl Scorer {
    pub fn score(&self, a: &str, b: &str) -> u8 {
        match self {
            Scorer::Ratio => ratio(a, b),
            Scorer::Levenshtein => levenshtein_ratio(a, b),
            Scorer::TokenSortRatio => token_sort_ratio(a, b),
        }
    }
}

impl std::str::FromStr for Scorer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ratio" | "indel" => Ok(Scorer::Ratio),
            "levenshtein" | "lev" => Ok(Scorer::Levenshtein),
            "token_sort" | "token-sort" | "token_sort_ratio" => Ok(Scorer::TokenSortRatio),
            _ => Err(format!(
                "Unknown scorer: {}. Use ratio, levenshtein, or token_sort",
                s
            )),
        }
    }
}

impl std::fmt::Display for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scorer::Ratio => write!(f, "ratio"),
            Scorer::Levenshtein => write!(f, "levenshtein"),
            Scorer::TokenSortRatio => write!(f, "token_sort"),
        }
    }
}

fn to_percent(value: f64) -> u8 {
    (value * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Indel similarity (same family as the classic `fuzz.ratio`).
pub fn ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0;
    }

    let lcs = lcs_len(&a_chars, &b_chars);
    to_percent(2.0 * lcs as f64 / total as f64)
}

/// Edit-distance similarity.
pub fn levenshtein_ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let distance = levenshtein_distance(a, b);
    let max_len = a.chars().count().max(b.chars().count());

    to_percent(1.0 - distance as f64 / max_len as f64)
}

/// Indel similarity of the token-sorted forms, so word order does not matter.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sort_tokens(a), &sort_tokens(b))
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Longest common subsequence length (two-row DP).
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Levenshtein distance over chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("função", "funcao"), 2);
    }

    #[test]
    fn test_ratio_identical_and_disjoint() {
        assert_eq!(ratio("valor total", "valor total"), 100);
        assert_eq!(ratio("abc", "xyz"), 0);
        assert_eq!(ratio("", "abc"), 0);
        assert_eq!(ratio("", ""), 100);
    }

    #[test]
    fn test_ratio_typo() {
        // LCS 9 over 20 chars
        assert_eq!(ratio("valor total", "valr totl"), 90);
        assert!(ratio("telefone", "data") < 30);
    }

    #[test]
    fn test_levenshtein_ratio() {
        // distance 2 over 11 chars
        assert_eq!(levenshtein_ratio("valor total", "valr totl"), 82);
        assert_eq!(levenshtein_ratio("abc", "abc"), 100);
    }

    #[test]
    fn test_token_sort_ignores_order() {
        assert_eq!(token_sort_ratio("total valor", "valor total"), 100);
        assert!(ratio("total valor", "valor total") < 100);
    }

    #[test]
    fn test_scorer_from_str() {
        assert_eq!("ratio".parse::<Scorer>().unwrap(), Scorer::Ratio);
        assert_eq!("LEV".parse::<Scorer>().unwrap(), Scorer::Levenshtein);
        assert_eq!("token-sort".parse::<Scorer>().unwrap(), Scorer::TokenSortRatio);
        assert!("jaro".parse::<Scorer>().is_err());
        assert_eq!(Scorer::TokenSortRatio.to_string(), "token_sort");
    }
}
