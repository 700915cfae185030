//! Clustering (§4.10): union-find over function identities so findings that
//! transitively share a function collapse into one cluster, tagged on each
//! finding's `metadata["cluster_id"]`.

use crate::model::types::Finding;
use std::collections::HashMap;

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Union every finding's two function identities, then tag each finding with
/// a sequential cluster id assigned in first-appearance order of its root.
pub fn cluster_findings(findings: &mut [Finding]) {
    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut next_index = 0usize;
    for finding in findings.iter() {
        for identity in [finding.function_a.identity(), finding.function_b.identity()] {
            index_of.entry(identity).or_insert_with(|| {
                let idx = next_index;
                next_index += 1;
                idx
            });
        }
    }

    let mut uf = UnionFind::new(next_index);
    for finding in findings.iter() {
        let a = index_of[&finding.function_a.identity()];
        let b = index_of[&finding.function_b.identity()];
        uf.union(a, b);
    }

    let mut cluster_ids: HashMap<usize, usize> = HashMap::new();
    let mut next_cluster_id = 0usize;
    for finding in findings.iter_mut() {
        let root = uf.find(index_of[&finding.function_a.identity()]);
        let cluster_id = *cluster_ids.entry(root).or_insert_with(|| {
            let id = next_cluster_id;
            next_cluster_id += 1;
            id
        });
        finding.metadata.insert("cluster_id".to_string(), cluster_id.to_string());
    }
}

/// Retain only findings whose cluster has at least `min_size` members. A
/// `min_size` of 0 or 1 is a no-op (every finding trivially satisfies it).
pub fn filter_clusters(findings: Vec<Finding>, min_size: usize) -> Vec<Finding> {
    if min_size <= 1 {
        return findings;
    }
    let mut counts: HashMap<String, usize> = HashMap::new();
    for finding in &findings {
        if let Some(id) = finding.metadata.get("cluster_id") {
            *counts.entry(id.clone()).or_insert(0) += 1;
        }
    }
    findings
        .into_iter()
        .filter(|f| {
            f.metadata
                .get("cluster_id")
                .and_then(|id| counts.get(id))
                .is_some_and(|&count| count >= min_size)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::hash_text;
    use crate::model::types::{CandidateMatch, FileRef, FunctionRef, Language, SnippetKind, SnippetRef};

    fn func(path: &str, name: &str) -> FunctionRef {
        FunctionRef {
            file: FileRef {
                path: path.to_string(),
                content_hash: "h".to_string(),
                language: Language::Python,
            },
            qualified_name: name.to_string(),
            start_line: 1,
            end_line: 5,
            code_hash: hash_text(name),
            code: name.to_string(),
        }
    }

    fn finding(a: &FunctionRef, b: &FunctionRef) -> Finding {
        let snippet = |f: &FunctionRef| SnippetRef {
            kind: SnippetKind::Func,
            function: f.clone(),
            start_line: f.start_line,
            end_line: f.end_line,
            text: f.code.clone(),
            snippet_hash: hash_text(&f.identity()),
        };
        Finding {
            function_a: a.clone(),
            function_b: b.clone(),
            score: 0.95,
            duplicated_lines: 5,
            evidence: vec![CandidateMatch {
                snippet_a: snippet(a),
                snippet_b: snippet(b),
                similarity: 0.95,
                evidence: "test".to_string(),
            }],
            reasons: vec!["func_threshold".to_string()],
            metadata: Default::default(),
        }
    }

    #[test]
    fn findings_sharing_a_function_share_a_cluster() {
        let a = func("a.py", "f1");
        let b = func("b.py", "f2");
        let c = func("c.py", "f3");
        let mut findings = vec![finding(&a, &b), finding(&b, &c)];
        cluster_findings(&mut findings);
        assert_eq!(findings[0].metadata["cluster_id"], findings[1].metadata["cluster_id"]);
    }

    #[test]
    fn disjoint_findings_get_different_clusters() {
        let a = func("a.py", "f1");
        let b = func("b.py", "f2");
        let c = func("c.py", "f3");
        let d = func("d.py", "f4");
        let mut findings = vec![finding(&a, &b), finding(&c, &d)];
        cluster_findings(&mut findings);
        assert_ne!(findings[0].metadata["cluster_id"], findings[1].metadata["cluster_id"]);
    }

    #[test]
    fn filter_clusters_drops_small_clusters() {
        let a = func("a.py", "f1");
        let b = func("b.py", "f2");
        let c = func("c.py", "f3");
        let d = func("d.py", "f4");
        let e = func("e.py", "f5");
        // {a,b,c} forms a cluster with 3 findings; {d,e} forms a cluster with 1 finding.
        let mut findings = vec![finding(&a, &b), finding(&b, &c), finding(&a, &c), finding(&d, &e)];
        cluster_findings(&mut findings);
        let filtered = filter_clusters(findings, 3);
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|f| f.function_a.file.path != "d.py"));
    }
}
