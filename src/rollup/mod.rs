//! Rollup (§4.9): filters candidate matches down to per-function-pair
//! findings with evidence, scores, and reasons.
//!
//! Order of operations matters for the testable properties in §8: overlap
//! suppression and the lexical gate run before dedup so a kept match's
//! canonical key is never contaminated by a match that should never have
//! survived; dedup runs before grouping so a group's evidence list never
//! contains two matches for the same endpoint pair.

pub mod ranking;

use crate::config::Thresholds;
use crate::model::types::{CandidateMatch, Finding, FunctionRef, SnippetKind};
use crate::retrieval::lexical::{jaccard, tokenize};
use ranking::{canonical_key, kind_rank, Endpoint};
use std::collections::BTreeMap;
use std::collections::HashMap;

fn spans_overlap(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// Step 1: same file, different functions, overlapping spans (the
/// nested/enclosing case — an inner function's FUNC snippet trivially
/// resembles its outer function's).
fn is_cross_function_same_file_overlap(m: &CandidateMatch) -> bool {
    let fa = &m.snippet_a.function;
    let fb = &m.snippet_b.function;
    if fa.file.path != fb.file.path || fa.identity() == fb.identity() {
        return false;
    }
    spans_overlap(fa.start_line, fa.end_line, fb.start_line, fb.end_line)
}

/// Step 2: both snippets belong to the same function. Drop identical spans,
/// overlapping spans of different kinds, and overlapping WIN/WIN spans —
/// exactly §4.9 step 2, the Open Question's authoritative contract.
fn is_same_function_overlap(m: &CandidateMatch) -> bool {
    if m.snippet_a.function.identity() != m.snippet_b.function.identity() {
        return false;
    }
    let identical = m.snippet_a.start_line == m.snippet_b.start_line && m.snippet_a.end_line == m.snippet_b.end_line;
    if identical {
        return true;
    }
    let overlapping = spans_overlap(
        m.snippet_a.start_line,
        m.snippet_a.end_line,
        m.snippet_b.start_line,
        m.snippet_b.end_line,
    );
    if !overlapping {
        return false;
    }
    if m.snippet_a.kind != m.snippet_b.kind {
        return true;
    }
    m.snippet_a.kind == SnippetKind::Win
}

/// §3's self-match suppression invariant ("no Finding has
/// `function_a.identity == function_b.identity`") must hold even for a
/// non-overlapping same-function WIN pair that step 2 has no rule to drop —
/// such a pair is intra-function repetition, not a clone *pair*, so it never
/// becomes a finding regardless of overlap.
fn is_same_function_pair(m: &CandidateMatch) -> bool {
    m.snippet_a.function.identity() == m.snippet_b.function.identity()
}

fn passes_lexical_gate(m: &CandidateMatch, thresholds: &Thresholds) -> bool {
    if thresholds.lexical_min_ratio <= 0.0 {
        return true;
    }
    let a = tokenize(&m.snippet_a.text);
    let b = tokenize(&m.snippet_b.text);
    jaccard(&a, &b) >= thresholds.lexical_min_ratio
}

fn dedup(matches: Vec<CandidateMatch>) -> Vec<CandidateMatch> {
    let mut order: Vec<(Endpoint, Endpoint)> = Vec::new();
    let mut best: HashMap<(Endpoint, Endpoint), CandidateMatch> = HashMap::new();

    for m in matches {
        let key = canonical_key(&m);
        match best.get(&key) {
            None => {
                order.push(key.clone());
                best.insert(key, m);
            }
            Some(existing) => {
                let replace = if m.similarity != existing.similarity {
                    m.similarity > existing.similarity
                } else {
                    kind_rank(m.snippet_a.kind, m.snippet_b.kind) > kind_rank(existing.snippet_a.kind, existing.snippet_b.kind)
                };
                if replace {
                    best.insert(key, m);
                }
            }
        }
    }

    order.into_iter().filter_map(|key| best.remove(&key)).collect()
}

fn covered_lines(spans: &[(usize, usize)]) -> usize {
    if spans.is_empty() {
        return 0;
    }
    let mut sorted = spans.to_vec();
    sorted.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in sorted {
        match merged.last_mut() {
            Some(last) if start <= last.1 + 1 => {
                last.1 = last.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged.iter().map(|(s, e)| e - s + 1).sum()
}

fn find_function_ref(evidence: &[CandidateMatch], identity: &str) -> Option<FunctionRef> {
    for m in evidence {
        if m.snippet_a.function.identity() == identity {
            return Some(m.snippet_a.function.clone());
        }
        if m.snippet_b.function.identity() == identity {
            return Some(m.snippet_b.function.clone());
        }
    }
    None
}

fn function_side_spans(evidence: &[CandidateMatch], identity: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    for m in evidence {
        if m.snippet_a.function.identity() == identity {
            spans.push((m.snippet_a.start_line, m.snippet_a.end_line));
        }
        if m.snippet_b.function.identity() == identity {
            spans.push((m.snippet_b.start_line, m.snippet_b.end_line));
        }
    }
    spans
}

fn build_finding(key: &(String, String), evidence: Vec<CandidateMatch>, thresholds: &Thresholds) -> Option<Finding> {
    let func_hits: Vec<&CandidateMatch> = evidence
        .iter()
        .filter(|m| m.snippet_a.kind == SnippetKind::Func || m.snippet_b.kind == SnippetKind::Func)
        .collect();
    let win_hits: Vec<&CandidateMatch> = evidence
        .iter()
        .filter(|m| m.snippet_a.kind == SnippetKind::Win || m.snippet_b.kind == SnippetKind::Win)
        .collect();
    let exp_hits: Vec<&CandidateMatch> = evidence
        .iter()
        .filter(|m| m.snippet_a.kind == SnippetKind::Exp || m.snippet_b.kind == SnippetKind::Exp)
        .collect();

    let mut reasons = Vec::new();
    if let Some(max_sim) = func_hits.iter().map(|m| m.similarity).reduce(f32::max) {
        if max_sim >= thresholds.func {
            reasons.push("func_threshold".to_string());
        }
    }
    if let Some(max_sim) = exp_hits.iter().map(|m| m.similarity).reduce(f32::max) {
        if max_sim >= thresholds.exp {
            reasons.push("exp_threshold".to_string());
        }
    }
    if win_hits.len() >= thresholds.min_window_hits {
        reasons.push("min_window_hits".to_string());
    }
    if reasons.is_empty() {
        return None;
    }

    let score = evidence.iter().map(|m| m.similarity).reduce(f32::max)?;
    let function_a = find_function_ref(&evidence, &key.0)?;
    let function_b = find_function_ref(&evidence, &key.1)?;
    let spans_a = function_side_spans(&evidence, &key.0);
    let spans_b = function_side_spans(&evidence, &key.1);
    let duplicated_lines = covered_lines(&spans_a).min(covered_lines(&spans_b));

    Some(Finding {
        function_a,
        function_b,
        score,
        duplicated_lines,
        evidence,
        reasons,
        metadata: BTreeMap::new(),
    })
}

/// Run the full rollup pipeline (§4.9 steps 1-7) over a flat list of
/// candidate matches, producing the final list of findings in
/// group-first-seen order.
pub fn rollup_findings(matches: Vec<CandidateMatch>, thresholds: &Thresholds) -> Vec<Finding> {
    let filtered: Vec<CandidateMatch> = matches
        .into_iter()
        .filter(|m| !is_cross_function_same_file_overlap(m))
        .filter(|m| !is_same_function_overlap(m))
        .filter(|m| !is_same_function_pair(m))
        .filter(|m| passes_lexical_gate(m, thresholds))
        .collect();

    let deduped = dedup(filtered);

    let mut group_order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<CandidateMatch>> = HashMap::new();
    for m in deduped {
        let ident_a = m.snippet_a.function.identity();
        let ident_b = m.snippet_b.function.identity();
        let key = if ident_a <= ident_b {
            (ident_a, ident_b)
        } else {
            (ident_b, ident_a)
        };
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(m);
    }

    group_order
        .into_iter()
        .filter_map(|key| {
            let evidence = groups.remove(&key)?;
            build_finding(&key, evidence, thresholds)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::hash_text;
    use crate::model::types::{FileRef, FunctionRef, Language, SnippetRef};

    fn func(path: &str, name: &str, start: usize, end: usize) -> FunctionRef {
        let code = format!("line{}", start);
        FunctionRef {
            file: FileRef {
                path: path.to_string(),
                content_hash: "h".to_string(),
                language: Language::Python,
            },
            qualified_name: name.to_string(),
            start_line: start,
            end_line: end,
            code_hash: hash_text(&code),
            code,
        }
    }

    fn snippet(function: &FunctionRef, kind: SnippetKind, start: usize, end: usize, text: &str) -> SnippetRef {
        SnippetRef {
            kind,
            function: function.clone(),
            start_line: start,
            end_line: end,
            text: text.to_string(),
            snippet_hash: hash_text(&format!("{}:{}:{}:{}", function.identity(), start, end, text)),
        }
    }

    fn candidate_match(a: SnippetRef, b: SnippetRef, similarity: f32) -> CandidateMatch {
        CandidateMatch {
            snippet_a: a,
            snippet_b: b,
            similarity,
            evidence: "test".to_string(),
        }
    }

    #[test]
    fn func_func_match_across_files_produces_finding_with_func_threshold() {
        let fa = func("a.py", "add", 1, 3);
        let fb = func("b.py", "add", 1, 3);
        let sa = snippet(&fa, SnippetKind::Func, 1, 3, "def add(xs): return sum(xs)");
        let sb = snippet(&fb, SnippetKind::Func, 1, 3, "def add(ys): return sum(ys)");
        let m = candidate_match(sa, sb, 0.95);

        let thresholds = Thresholds {
            lexical_min_ratio: 0.0,
            ..Thresholds::default()
        };
        let findings = rollup_findings(vec![m], &thresholds);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].reasons.contains(&"func_threshold".to_string()));
        assert!(findings[0].function_a.identity() <= findings[0].function_b.identity());
    }

    #[test]
    fn same_function_win_pairs_never_produce_a_finding() {
        let fa = func("a.py", "f", 1, 30);
        let s1 = snippet(&fa, SnippetKind::Win, 1, 20, "body one");
        let s2 = snippet(&fa, SnippetKind::Win, 10, 29, "body two");
        let m = candidate_match(s1, s2, 0.95);
        let thresholds = Thresholds {
            lexical_min_ratio: 0.0,
            win: 0.9,
            min_window_hits: 1,
            ..Thresholds::default()
        };
        let findings = rollup_findings(vec![m], &thresholds);
        assert!(findings.is_empty());
    }

    #[test]
    fn enclosing_function_match_is_suppressed() {
        let outer = func("a.py", "outer", 1, 40);
        let inner = func("a.py", "outer.inner", 10, 20);
        let s_outer = snippet(&outer, SnippetKind::Func, 1, 40, "outer body");
        let s_inner = snippet(&inner, SnippetKind::Func, 10, 20, "inner body");
        let m = candidate_match(s_outer, s_inner, 0.99);
        let thresholds = Thresholds {
            lexical_min_ratio: 0.0,
            ..Thresholds::default()
        };
        assert!(rollup_findings(vec![m], &thresholds).is_empty());
    }

    #[test]
    fn min_window_hits_edge() {
        let fa = func("a.py", "f", 1, 10);
        let fb = func("b.py", "g", 1, 10);
        let s1 = snippet(&fa, SnippetKind::Win, 1, 5, "win one a");
        let s2 = snippet(&fb, SnippetKind::Win, 1, 5, "win one b");
        let m1 = candidate_match(s1.clone(), s2.clone(), 0.9);

        let thresholds = Thresholds {
            lexical_min_ratio: 0.0,
            win: 0.9,
            min_window_hits: 2,
            ..Thresholds::default()
        };
        assert!(rollup_findings(vec![m1.clone()], &thresholds).is_empty());

        let s3 = snippet(&fa, SnippetKind::Win, 6, 10, "win two a");
        let s4 = snippet(&fb, SnippetKind::Win, 6, 10, "win two b");
        let m2 = candidate_match(s3, s4, 0.9);
        let findings = rollup_findings(vec![m1, m2], &thresholds);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reasons, vec!["min_window_hits".to_string()]);
    }

    #[test]
    fn duplicated_lines_uses_merged_span_union() {
        let fa = func("a.py", "f", 1, 20);
        let fb = func("b.py", "g", 1, 20);
        let s1 = snippet(&fa, SnippetKind::Win, 1, 10, "chunk a1");
        let s2 = snippet(&fb, SnippetKind::Win, 1, 10, "chunk b1");
        let s3 = snippet(&fa, SnippetKind::Win, 8, 15, "chunk a2");
        let s4 = snippet(&fb, SnippetKind::Win, 8, 15, "chunk b2");
        let thresholds = Thresholds {
            lexical_min_ratio: 0.0,
            win: 0.9,
            min_window_hits: 2,
            ..Thresholds::default()
        };
        let findings = rollup_findings(
            vec![candidate_match(s1, s2, 0.9), candidate_match(s3, s4, 0.9)],
            &thresholds,
        );
        assert_eq!(findings.len(), 1);
        // union of [1,10] and [8,15] is [1,15] = 15 lines on both sides.
        assert_eq!(findings[0].duplicated_lines, 15);
    }
}
