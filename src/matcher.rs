//! Label → canonical key resolution.
//!
//! Matching runs three passes in a fixed order and stops at the first hit:
//!
//! 1. **Regex** - every taxonomy entry's patterns, in taxonomy order, searched against
//!    the lower-cased label. Authoritative.
//! 2. **Fuzzy** - best token-sort similarity against the pool of synonyms (and regex
//!    sources). Accepted at or above the threshold, and only when the winning
//!    candidate is a synonym.
//! 3. **Derived** - substring rules for cash-flow "change in X" lines.

use crate::taxonomy::Taxonomy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MatchPass {
    Regex,
    Fuzzy { score: f64 },
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalMatch<'a> {
    pub key: &'a str,
    pub pass: MatchPass,
}

/// Similarity in `[0, 100]` that ignores token order and case.
///
/// Both strings are split on whitespace, lower-cased, sorted and re-joined, then
/// compared with the insertion/deletion (Indel) ratio `2 * lcs / (len_a + len_b)`.
/// Substitutions cost two edits, so a reworded token such as `&` for `and` still
/// scores on the characters the two labels share.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    indel_ratio(&sorted_tokens(a), &sorted_tokens(b)) * 100.0
}

fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    (2 * longest_common_subsequence(&a, &b)) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<String> = s.split_whitespace().map(str::to_lowercase).collect();
    tokens.sort();
    tokens.join(" ")
}

pub struct CanonicalMatcher<'a> {
    taxonomy: &'a Taxonomy,
    threshold: f64,
}

impl<'a> CanonicalMatcher<'a> {
    pub fn new(taxonomy: &'a Taxonomy, threshold: f64) -> Self {
        Self {
            taxonomy,
            threshold,
        }
    }

    pub fn match_label(&self, label: &str) -> Option<CanonicalMatch<'a>> {
        let lower = label.to_lowercase();

        self.regex_pass(&lower)
            .or_else(|| self.fuzzy_pass(&lower))
            .or_else(|| self.derived_pass(&lower))
    }

    fn regex_pass(&self, label: &str) -> Option<CanonicalMatch<'a>> {
        let taxonomy: &'a Taxonomy = self.taxonomy;

        taxonomy
            .patterns()
            .find(|(_, regexes)| regexes.iter().any(|regex| regex.is_match(label)))
            .map(|(key, _)| CanonicalMatch {
                key,
                pass: MatchPass::Regex,
            })
    }

    fn fuzzy_pass(&self, label: &str) -> Option<CanonicalMatch<'a>> {
        let taxonomy: &'a Taxonomy = self.taxonomy;
        let mut best: Option<(&'a str, f64)> = None;

        for candidate in taxonomy.fuzzy_pool() {
            let score = token_sort_ratio(label, candidate);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate.as_str(), score));
            }
        }

        let (candidate, score) = best?;
        if score < self.threshold {
            return None;
        }

        taxonomy.synonym_owner(candidate).map(|key| CanonicalMatch {
            key,
            pass: MatchPass::Fuzzy { score },
        })
    }

    fn derived_pass(&self, label: &str) -> Option<CanonicalMatch<'a>> {
        let taxonomy: &'a Taxonomy = self.taxonomy;

        taxonomy
            .derived_rules()
            .iter()
            .find(|rule| label.contains(rule.phrase.as_str()))
            .map(|rule| CanonicalMatch {
                key: rule.key.as_str(),
                pass: MatchPass::Derived,
            })
    }
}
