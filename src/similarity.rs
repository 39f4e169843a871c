//! Name similarity scoring on a 0-100 scale.
//!
//! The final score is the best of a whole-string ratio, a substring ratio,
//! and a name-order-invariant comparison that lines up "First Last" with
//! "Last, First" and scores individual name parts.

use serde::Serialize;
use strsim::normalized_levenshtein;

/// Pairwise ratio at which two name parts count as the same part.
pub const PART_MATCH_RATIO: f64 = 80.0;
/// Parts shorter than this never trigger component scoring.
const SUBSTANTIAL_PART_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NameScores {
    pub ratio: f64,
    pub partial: f64,
    pub name_order: f64,
}

impl NameScores {
    pub fn best(&self) -> f64 {
        self.ratio.max(self.partial).max(self.name_order)
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Edit-distance ratio rounded to a whole percentage; 100 means identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    (normalized_levenshtein(a, b) * 100.0).round()
}

/// Best ratio between the shorter string and any equally long window of the
/// longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };
    if shorter.is_empty() {
        return 0.0;
    }
    if shorter.len() == longer.len() {
        return ratio(a, b);
    }
    let needle: String = shorter.iter().collect();
    let mut best = 0.0_f64;
    for window in longer.windows(shorter.len()) {
        let candidate: String = window.iter().collect();
        best = best.max(ratio(&needle, &candidate));
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Order-invariant comparison for multi-part names. Returns 0 when either
/// side has fewer than two whitespace-separated parts.
pub fn name_order_score(a: &str, b: &str) -> f64 {
    let a_parts: Vec<&str> = a.split_whitespace().collect();
    let b_parts: Vec<&str> = b.split_whitespace().collect();
    if a_parts.len() < 2 || b_parts.len() < 2 {
        return 0.0;
    }

    let a_reversed = last_first(&a_parts[..1], &a_parts[a_parts.len() - 1..]);
    let b_reversed = last_first(&b_parts[..1], &b_parts[b_parts.len() - 1..]);
    let mut best = ratio(a, &b_reversed).max(ratio(&a_reversed, b));

    if a_parts.len() >= 3 || b_parts.len() >= 3 {
        for split in 1..a_parts.len().min(b_parts.len()) {
            let (a_first, a_last) = a_parts.split_at(split);
            let (b_first, b_last) = b_parts.split_at(split);
            let a_natural = first_last(a_first, a_last);
            let b_natural = first_last(b_first, b_last);
            best = best
                .max(ratio(&a_natural, &last_first(b_first, b_last)))
                .max(ratio(&last_first(a_first, a_last), &b_natural));
        }
    }

    best.max(component_score(&a_parts, &b_parts))
}

fn first_last(first: &[&str], last: &[&str]) -> String {
    format!("{} {}", first.join(" "), last.join(" "))
}

fn last_first(first: &[&str], last: &[&str]) -> String {
    format!("{}, {}", last.join(" "), first.join(" "))
}

fn component_score(a_parts: &[&str], b_parts: &[&str]) -> f64 {
    let triggered = a_parts.iter().any(|p1| {
        b_parts.iter().any(|p2| {
            p1.chars().count() >= SUBSTANTIAL_PART_LEN
                && p2.chars().count() >= SUBSTANTIAL_PART_LEN
                && ratio(p1, p2) >= PART_MATCH_RATIO
        })
    });
    if !triggered {
        return 0.0;
    }
    let matching = a_parts
        .iter()
        .filter(|p1| b_parts.iter().any(|p2| ratio(p1, p2) >= PART_MATCH_RATIO))
        .count();
    if matching < 2 {
        return 0.0;
    }
    let total = a_parts.len().max(b_parts.len());
    (matching as f64 / total as f64) * 100.0
}

pub fn score_breakdown(a: &str, b: &str) -> NameScores {
    let a = normalize_name(a);
    let b = normalize_name(b);
    NameScores {
        ratio: ratio(&a, &b),
        partial: partial_ratio(&a, &b),
        name_order: name_order_score(&a, &b),
    }
}

pub fn similarity(a: &str, b: &str) -> f64 {
    score_breakdown(a, b).best()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names_score_full() {
        assert_eq!(similarity("Jared Ranjo", "  jared ranjo "), 100.0);
    }

    #[test]
    fn reversed_comma_form_matches() {
        assert_eq!(name_order_score("jared ranjo", "ranjo, jared"), 100.0);
        assert!(similarity("Ranjo, Jared", "Jared Ranjo") >= 90.0);
    }

    #[test]
    fn single_token_names_skip_order_scoring() {
        assert_eq!(name_order_score("madonna", "madonna ciccone"), 0.0);
    }

    #[test]
    fn partial_ratio_finds_embedded_name() {
        assert_eq!(partial_ratio("ana cruz", "maria ana cruz"), 100.0);
        assert_eq!(partial_ratio("", "anything"), 0.0);
    }

    #[test]
    fn three_part_names_try_every_split() {
        let score = name_order_score("john michael smith", "smith, john michael");
        assert_eq!(score, 100.0);
    }

    #[test]
    fn scores_stay_in_range() {
        for (a, b) in [("a", "zzzz"), ("x y", "q r s t"), ("", "")] {
            let s = similarity(a, b);
            assert!((0.0..=100.0).contains(&s), "{a} vs {b} -> {s}");
        }
    }
}
