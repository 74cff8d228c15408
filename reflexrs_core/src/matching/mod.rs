//! Ranking of stored patterns against free-text input.
//!
//! Each candidate is scored by the first strategy that applies, in order:
//!
//! - **exact**: case-folded trigger equals the input, confidence 100
//! - **keyword**: shared word tokens with trigger/response, capped at 90
//! - **fuzzy**: best of edit distance, bigram Jaccard and containment
//!   against the trigger, capped at 70
//!
//! Keyword and fuzzy are both computed and the higher one wins; on a tie the
//! keyword branch is reported. Candidates no strategy applies to are dropped.
//! Matching never mutates a pattern.

pub mod scoring;

use std::collections::HashSet;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;
use scoring::{fold_case, fuzzy_similarity, keyword_overlap, tokenize};

pub const EXACT_CONFIDENCE: f64 = 100.0;
pub const KEYWORD_CEILING: f64 = 90.0;
pub const FUZZY_CEILING: f64 = 70.0;

/// Candidate sets at least this large are scored on the rayon pool.
const PARALLEL_MIN_CANDIDATES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Exact,
    Keyword,
    Fuzzy,
}

impl Branch {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Keyword => "keyword",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match options. A `threshold` of 0 keeps everything that scored, a
/// `limit` of 0 means no cap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchOptions {
    #[serde(default = "MatchOptions::default_threshold")]
    pub threshold: f64,
    #[serde(default = "MatchOptions::default_limit")]
    pub limit: usize,
    #[serde(default = "MatchOptions::default_exact_first")]
    pub exact_first: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            limit: Self::default_limit(),
            exact_first: Self::default_exact_first(),
        }
    }
}

impl MatchOptions {
    const fn default_threshold() -> f64 {
        30.0
    }

    const fn default_limit() -> usize {
        10
    }

    const fn default_exact_first() -> bool {
        true
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn with_exact_first(mut self, exact_first: bool) -> Self {
        self.exact_first = exact_first;
        self
    }
}

/// A scored candidate. Borrows the pattern from the caller's slice.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub pattern: &'a Pattern,
    pub confidence: f64,
    pub branch: Branch,
}

/// Input prepared once and reused across candidates.
struct Query {
    folded: String,
    chars: Vec<char>,
    tokens: HashSet<String>,
}

impl Query {
    fn new(input: &str) -> Self {
        let folded = fold_case(input);
        Self {
            chars: folded.chars().collect(),
            tokens: tokenize(&folded),
            folded,
        }
    }

    fn score(&self, pattern: &Pattern) -> Option<(Branch, f64)> {
        let trigger = fold_case(&pattern.trigger);
        if trigger.is_empty() {
            return None;
        }
        if trigger == self.folded {
            return Some((Branch::Exact, EXACT_CONFIDENCE));
        }

        let keyword = keyword_overlap(
            &self.tokens,
            &tokenize(&trigger),
            &tokenize(&pattern.response),
        ) * KEYWORD_CEILING;

        let trigger_chars: Vec<char> = trigger.chars().collect();
        let fuzzy =
            fuzzy_similarity(&self.folded, &self.chars, &trigger, &trigger_chars) * FUZZY_CEILING;

        if keyword <= 0.0 && fuzzy <= 0.0 {
            None
        } else if keyword >= fuzzy {
            Some((Branch::Keyword, keyword))
        } else {
            Some((Branch::Fuzzy, fuzzy))
        }
    }
}

/// Score a single pattern against `input` with the best applicable branch.
#[must_use]
pub fn score(input: &str, pattern: &Pattern) -> Option<(Branch, f64)> {
    if input.trim().is_empty() {
        return None;
    }
    Query::new(input).score(pattern)
}

/// Rank `candidates` against `input`.
///
/// Results are ordered by confidence descending; ties keep candidate order.
/// With `exact_first`, exact hits are moved ahead of everything else.
#[must_use]
pub fn match_patterns<'a>(
    input: &str,
    candidates: &'a [Pattern],
    options: &MatchOptions,
) -> Vec<MatchResult<'a>> {
    if input.trim().is_empty() || candidates.is_empty() {
        return Vec::new();
    }

    let query = Query::new(input);
    let to_result = |pattern: &'a Pattern| {
        query.score(pattern).map(|(branch, confidence)| MatchResult {
            pattern,
            confidence,
            branch,
        })
    };

    let mut results: Vec<MatchResult<'a>> = if candidates.len() >= PARALLEL_MIN_CANDIDATES {
        candidates.par_iter().filter_map(to_result).collect()
    } else {
        candidates.iter().filter_map(to_result).collect()
    };

    if options.threshold > 0.0 {
        results.retain(|r| r.confidence >= options.threshold);
    }

    results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    if options.exact_first {
        let (mut exact, rest): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| r.branch == Branch::Exact);
        exact.extend(rest);
        results = exact;
    }

    if options.limit > 0 {
        results.truncate(options.limit);
    }

    results
}

/// Top result under default options, if any.
#[must_use]
pub fn match_one<'a>(input: &str, candidates: &'a [Pattern]) -> Option<MatchResult<'a>> {
    match_patterns(input, candidates, &MatchOptions::default().with_limit(1))
        .into_iter()
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(trigger: &str, response: &str) -> Pattern {
        Pattern::new(trigger, response)
    }

    fn all() -> MatchOptions {
        MatchOptions::default().with_threshold(0.0).with_limit(0)
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let candidates = vec![pattern("hello", "Hi there!")];
        let results = match_patterns("HELLO", &candidates, &all());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].branch, Branch::Exact);
        assert!((results[0].confidence - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_candidates_or_input() {
        assert!(match_patterns("xyz123", &[], &MatchOptions::default()).is_empty());
        let candidates = vec![pattern("hello", "hi")];
        assert!(match_patterns("", &candidates, &all()).is_empty());
        assert!(match_patterns("   ", &candidates, &all()).is_empty());
    }

    #[test]
    fn keyword_beats_fuzzy_for_word_overlap() {
        let candidates = vec![pattern("deploy the app", "run make deploy")];
        let results = match_patterns("please deploy app", &candidates, &all());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].branch, Branch::Keyword);
        assert!(results[0].confidence <= KEYWORD_CEILING);
    }

    #[test]
    fn fuzzy_catches_typos() {
        let candidates = vec![pattern("goodnight", "sleep well")];
        let results = match_patterns("goodnite", &candidates, &all());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].branch, Branch::Fuzzy);
        assert!(results[0].confidence > 0.0 && results[0].confidence <= FUZZY_CEILING);
    }

    #[test]
    fn unrelated_candidates_drop_out() {
        let candidates = vec![pattern("abc", "def")];
        assert!(match_patterns("xyz", &candidates, &all()).is_empty());
    }

    #[test]
    fn threshold_filters_low_scores() {
        let candidates = vec![pattern("hello", "hi"), pattern("goodnight", "bye")];
        let results = match_patterns(
            "hello",
            &candidates,
            &MatchOptions::default().with_threshold(95.0),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pattern.trigger, "hello");
    }

    #[test]
    fn sorted_descending_and_limited() {
        let candidates = vec![
            pattern("turn on the lights", "ok"),
            pattern("lights", "ok"),
            pattern("turn on lights", "ok"),
        ];
        let results = match_patterns("turn on lights", &candidates, &all());
        assert_eq!(results[0].branch, Branch::Exact);
        assert_eq!(results[0].pattern.trigger, "turn on lights");
        for pair in results.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }

        let limited = match_patterns("turn on lights", &candidates, &all().with_limit(2));
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn ties_keep_candidate_order() {
        let candidates = vec![
            pattern("coffee please", "a"),
            pattern("coffee now", "b"),
            pattern("coffee later", "c"),
        ];
        let results = match_patterns("coffee", &candidates, &all());
        let order: Vec<&str> = results.iter().map(|r| r.pattern.response.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn exact_first_moves_exact_hits_forward() {
        let candidates = vec![pattern("status report", "x"), pattern("Status", "y")];
        let results = match_patterns("status", &candidates, &all().with_exact_first(true));
        assert_eq!(results[0].branch, Branch::Exact);
        assert_eq!(results[0].pattern.response, "y");
    }

    #[test]
    fn deterministic_across_calls() {
        let candidates: Vec<Pattern> = (0..300)
            .map(|i| pattern(&format!("command number {i}"), "r"))
            .collect();
        let first: Vec<String> = match_patterns("command number 7", &candidates, &all())
            .iter()
            .map(|r| r.pattern.id.clone())
            .collect();
        for _ in 0..3 {
            let again: Vec<String> = match_patterns("command number 7", &candidates, &all())
                .iter()
                .map(|r| r.pattern.id.clone())
                .collect();
            assert_eq!(first, again);
        }
        assert!(!first.is_empty());
    }

    #[test]
    fn multibyte_and_degenerate_input_does_not_panic() {
        let candidates = vec![
            pattern("你好", "hi"),
            pattern("🚀 launch", "go"),
            pattern(&"x".repeat(500), "long"),
        ];
        let long = "y".repeat(10_000);
        let inputs = ["你好", "🚀", "é", long.as_str(), "\u{0}", "a🚀b你"];
        for input in inputs {
            let _ = match_patterns(input, &candidates, &all());
        }
        let results = match_patterns("你好", &candidates, &all());
        assert_eq!(results[0].branch, Branch::Exact);
    }

    #[test]
    fn match_one_returns_top() {
        let candidates = vec![pattern("hello there", "a"), pattern("hello", "b")];
        let top = match_one("hello", &candidates).unwrap();
        assert_eq!(top.pattern.response, "b");
        assert!(match_one("zzzz", &candidates).is_none());
    }
}
