//! Candidate retrieval (§4.8): partition snippets into worker chunks, have
//! each worker build its own index over the *full* snippet/embedding arrays
//! and query only its chunk, re-rank with lexical Jaccard, and gate by
//! per-kind threshold.
//!
//! Workers are plain scoped OS threads (`std::thread::scope`): no shared
//! mutable state, each returns its own `Vec<CandidateMatch>` which is
//! concatenated in chunk order to keep retrieval deterministic (§5).

use crate::config::{IndexConfig, IndexKind, Thresholds};
use crate::errors::CloneHunterError;
use crate::index::{ApproxIndex, BruteIndex, VectorIndex};
use crate::model::types::{CandidateMatch, Embedding, SnippetKind, SnippetRef};
use crate::retrieval::lexical::{jaccard, tokenize};
use std::collections::HashMap;

fn kind_str(kind: SnippetKind) -> &'static str {
    match kind {
        SnippetKind::Func => "FUNC",
        SnippetKind::Win => "WIN",
        SnippetKind::Exp => "EXP",
    }
}

fn build_index(kind: IndexKind, cfg: &IndexConfig) -> Box<dyn VectorIndex + Send> {
    match kind {
        IndexKind::Brute => Box::new(BruteIndex::new()),
        IndexKind::Approx => Box::new(ApproxIndex::new(cfg.nlist, cfg.nprobe)),
    }
}

fn threshold_for(thresholds: &Thresholds, kind: SnippetKind) -> f32 {
    match kind {
        SnippetKind::Func => thresholds.func,
        SnippetKind::Win => thresholds.win,
        SnippetKind::Exp => thresholds.exp,
    }
}

/// Run the parallel top-k search described in §4.8 over `snippets`/`embeddings`
/// (parallel arrays, same order). `worker_count` is clamped to
/// `min(worker_count, snippets.len())`. A panicking worker aborts the whole
/// run (§5: "errors in a worker propagate by aborting the pipeline run")
/// rather than silently dropping that chunk's matches.
pub fn retrieve_candidates(
    snippets: &[SnippetRef],
    embeddings: &[Embedding],
    index_kind: IndexKind,
    index_config: &IndexConfig,
    thresholds: &Thresholds,
    worker_count: usize,
) -> Result<Vec<CandidateMatch>, CloneHunterError> {
    assert_eq!(snippets.len(), embeddings.len());
    if snippets.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = snippets.iter().map(|s| s.snippet_hash.clone()).collect();
    let by_id: HashMap<&str, &SnippetRef> = snippets.iter().map(|s| (s.snippet_hash.as_str(), s)).collect();

    let worker_count = worker_count.max(1).min(snippets.len());
    let chunk_size = snippets.len().div_ceil(worker_count);
    let chunk_bounds: Vec<(usize, usize)> = (0..snippets.len())
        .step_by(chunk_size)
        .map(|start| (start, (start + chunk_size).min(snippets.len())))
        .collect();

    let results: Result<Vec<Vec<CandidateMatch>>, CloneHunterError> = std::thread::scope(|scope| {
        let handles: Vec<_> = chunk_bounds
            .iter()
            .map(|&(start, end)| {
                let ids = &ids;
                let by_id = &by_id;
                scope.spawn(move || {
                    let mut index = build_index(index_kind, index_config);
                    index.build(embeddings, ids);

                    let mut out = Vec::new();
                    for i in start..end {
                        let query = &snippets[i];
                        let hits = index.query(&embeddings[i], index_config.top_k);
                        let query_tokens = tokenize(&query.text);
                        for (id, emb_score) in hits {
                            if id == query.snippet_hash {
                                continue;
                            }
                            let Some(&candidate) = by_id.get(id.as_str()) else {
                                continue;
                            };
                            let candidate_tokens = tokenize(&candidate.text);
                            let lex = jaccard(&query_tokens, &candidate_tokens);
                            if thresholds.lexical_min_ratio > 0.0 && lex < thresholds.lexical_min_ratio {
                                continue;
                            }
                            let composite = (1.0 - thresholds.lexical_weight) * emb_score
                                + thresholds.lexical_weight * lex;
                            let gate = threshold_for(thresholds, candidate.kind);
                            if composite < gate {
                                continue;
                            }
                            let evidence = format!(
                                "{}->{}|emb={:.3}|lex={:.3}|comp={:.3}",
                                kind_str(query.kind),
                                kind_str(candidate.kind),
                                emb_score,
                                lex,
                                composite
                            );
                            out.push(CandidateMatch {
                                snippet_a: query.clone(),
                                snippet_b: candidate.clone(),
                                similarity: composite,
                                evidence,
                            });
                        }
                    }
                    out
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| CloneHunterError::Worker("retrieval worker panicked".to_string())))
            .collect()
    });

    Ok(results?.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, IndexKind, Thresholds};
    use crate::core::ids::hash_text;
    use crate::model::types::{FileRef, FunctionRef, Language, SnippetKind};

    fn snippet(path: &str, text: &str, kind: SnippetKind) -> SnippetRef {
        let file = FileRef {
            path: path.to_string(),
            content_hash: "h".to_string(),
            language: Language::Python,
        };
        let function = FunctionRef {
            file,
            qualified_name: "f".to_string(),
            start_line: 1,
            end_line: 1,
            code: text.to_string(),
            code_hash: hash_text(text),
        };
        SnippetRef {
            kind,
            function,
            start_line: 1,
            end_line: 1,
            text: text.to_string(),
            snippet_hash: hash_text(&format!("{path}:{text}")),
        }
    }

    fn emb(v: &[f32]) -> Embedding {
        Embedding {
            vector: v.to_vec(),
            dim: v.len(),
        }
    }

    #[test]
    fn self_match_is_excluded() {
        let snippets = vec![snippet("a.py", "def f(): return 1", SnippetKind::Func)];
        let embeddings = vec![emb(&[1.0, 0.0])];
        let thresholds = Thresholds {
            lexical_min_ratio: 0.0,
            ..Thresholds::default()
        };
        let matches = retrieve_candidates(
            &snippets,
            &embeddings,
            IndexKind::Brute,
            &IndexConfig::default(),
            &thresholds,
            2,
        )
        .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn near_identical_snippets_across_files_match() {
        let snippets = vec![
            snippet("a.py", "def add(xs): total=0\nfor x in xs: total+=x\nreturn total", SnippetKind::Func),
            snippet("b.py", "def add(ys): total=0\nfor y in ys: total+=y\nreturn total", SnippetKind::Func),
        ];
        let embeddings = vec![emb(&[1.0, 0.0, 0.0]), emb(&[0.99, 0.01, 0.0])];
        let thresholds = Thresholds {
            func: 0.9,
            lexical_min_ratio: 0.1,
            lexical_weight: 0.1,
            ..Thresholds::default()
        };
        let matches = retrieve_candidates(
            &snippets,
            &embeddings,
            IndexKind::Brute,
            &IndexConfig::default(),
            &thresholds,
            1,
        )
        .unwrap();
        assert_eq!(matches.len(), 2); // symmetric: a queries b, b queries a
    }

    #[test]
    fn lexical_gate_drops_disjoint_text_even_with_high_embedding_similarity() {
        let snippets = vec![
            snippet("a.py", "alpha beta gamma delta", SnippetKind::Func),
            snippet("b.py", "zeta eta theta iota", SnippetKind::Func),
        ];
        let embeddings = vec![emb(&[1.0, 0.0]), emb(&[0.999, 0.001])];
        let thresholds = Thresholds {
            func: 0.0,
            lexical_min_ratio: 0.6,
            lexical_weight: 0.3,
            ..Thresholds::default()
        };
        let matches = retrieve_candidates(
            &snippets,
            &embeddings,
            IndexKind::Brute,
            &IndexConfig::default(),
            &thresholds,
            1,
        )
        .unwrap();
        assert!(matches.is_empty());
    }
}
