//! Token-level Jaccard similarity, used both as a re-ranking signal in
//! candidate retrieval and as a hard gate in rollup.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-z0-9_]+").expect("static token pattern is valid"))
}

/// Lowercase, extract `[A-Za-z0-9_]+` runs, collect as a set.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    token_pattern().find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// Jaccard similarity over two token sets: `|intersection| / |union|`.
/// Two empty sets are defined as identical (similarity 1.0) rather than
/// dividing by zero.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}
