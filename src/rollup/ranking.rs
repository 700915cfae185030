//! Canonical ordering helpers used by rollup's deduplication step.

use crate::model::types::{CandidateMatch, SnippetKind, SnippetRef};

/// `(function identity, start_line, end_line)` — a snippet's position for
/// dedup purposes.
pub type Endpoint = (String, usize, usize);

pub fn endpoint(snippet: &SnippetRef) -> Endpoint {
    (snippet.function.identity(), snippet.start_line, snippet.end_line)
}

/// `FUNC/FUNC = 3 > any-FUNC = 2 > WIN/WIN = 1 > else = 0`, the tie-break
/// rollup's dedup step uses when two matches land on the same canonical key
/// with equal similarity.
pub fn kind_rank(kind_a: SnippetKind, kind_b: SnippetKind) -> u8 {
    match (kind_a, kind_b) {
        (SnippetKind::Func, SnippetKind::Func) => 3,
        (SnippetKind::Func, _) | (_, SnippetKind::Func) => 2,
        (SnippetKind::Win, SnippetKind::Win) => 1,
        _ => 0,
    }
}

/// Order a match's two endpoints so `(min, max)` is stable regardless of
/// which side retrieval happened to put in `snippet_a`.
pub fn canonical_key(m: &CandidateMatch) -> (Endpoint, Endpoint) {
    let a = endpoint(&m.snippet_a);
    let b = endpoint(&m.snippet_b);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
