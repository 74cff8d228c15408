use std::collections::HashSet;

/// Strings longer than this (in chars) skip edit distance and fall back to
/// the bigram and containment measures.
pub const MAX_EDIT_DISTANCE_CHARS: usize = 256;

/// Case-fold for comparison. Upper-then-lower maps `ß` and `SS` together,
/// which plain lowercasing does not.
#[must_use]
pub fn fold_case(s: &str) -> String {
    s.trim().to_uppercase().to_lowercase()
}

/// Split on anything that is not alphanumeric and case-fold each token.
#[must_use]
pub fn tokenize(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(fold_case)
        .collect()
}

/// Token overlap in `[0, 1]`.
///
/// Shared trigger tokens count against the larger of the two token sets, so a
/// short input that hits one word of a long trigger scores low. Response hits
/// count at half weight, measured against the input alone.
#[must_use]
pub fn keyword_overlap(
    input: &HashSet<String>,
    trigger: &HashSet<String>,
    response: &HashSet<String>,
) -> f64 {
    if input.is_empty() {
        return 0.0;
    }

    let trigger_score = if trigger.is_empty() {
        0.0
    } else {
        let shared = input.intersection(trigger).count();
        shared as f64 / input.len().max(trigger.len()) as f64
    };

    let response_score = if response.is_empty() {
        0.0
    } else {
        let shared = input.intersection(response).count();
        0.5 * shared as f64 / input.len() as f64
    };

    trigger_score.max(response_score)
}

/// Jaccard similarity over character bigrams.
///
/// Returns 0.0 if either string has fewer than two characters.
#[must_use]
pub fn bigram_similarity(a: &[char], b: &[char]) -> f64 {
    let bigrams_a: HashSet<(char, char)> = a.windows(2).map(|w| (w[0], w[1])).collect();
    let bigrams_b: HashSet<(char, char)> = b.windows(2).map(|w| (w[0], w[1])).collect();

    if bigrams_a.is_empty() || bigrams_b.is_empty() {
        return 0.0;
    }

    let intersection = bigrams_a.intersection(&bigrams_b).count();
    let union = bigrams_a.union(&bigrams_b).count();

    intersection as f64 / union as f64
}

/// `1 - levenshtein / max_len`, or `None` when either side is too long.
#[must_use]
pub fn edit_similarity(a: &[char], b: &[char]) -> Option<f64> {
    if a.len() > MAX_EDIT_DISTANCE_CHARS || b.len() > MAX_EDIT_DISTANCE_CHARS {
        return None;
    }
    let longest = a.len().max(b.len());
    if longest == 0 {
        return Some(1.0);
    }
    Some(1.0 - levenshtein(a, b) as f64 / longest as f64)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Length ratio when one string contains the other, else 0.
#[must_use]
pub fn containment(a: &str, b: &str) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() || !long.contains(short) {
        return 0.0;
    }
    short.chars().count() as f64 / long.chars().count() as f64
}

/// Best of edit, bigram and containment similarity, in `[0, 1]`.
#[must_use]
pub fn fuzzy_similarity(a: &str, a_chars: &[char], b: &str, b_chars: &[char]) -> f64 {
    let edit = edit_similarity(a_chars, b_chars).unwrap_or(0.0);
    edit.max(bigram_similarity(a_chars, b_chars))
        .max(containment(a, b))
        .clamp(0.0, 1.0)
}
