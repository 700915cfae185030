//! Core value types shared by every pipeline stage.
//!
//! These mirror the data model a clone scan is built from: a [`FileRef`]
//! owns zero or more [`FunctionRef`]s, each of which yields one or more
//! [`SnippetRef`]s, which are embedded and compared to produce
//! [`CandidateMatch`]es that roll up into [`Finding`]s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse file classification. Only `.py` files are parsed as source; every
/// other file is a whole-file `Text` unit (see `languages::python::extract_text_unit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Text,
}

/// The three snippet flavors a function can contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnippetKind {
    /// The function body verbatim.
    Func,
    /// A fixed-size sliding window over the function body.
    Win,
    /// The function body plus the bodies of functions it calls, BFS-expanded.
    Exp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub content_hash: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRef {
    pub file: FileRef,
    pub qualified_name: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub code: String,
    pub code_hash: String,
}

impl FunctionRef {
    /// Stable key identifying this function across a scan:
    /// `"{path}:{qualified_name}:{start_line}:{end_line}"`.
    pub fn identity(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.file.path, self.qualified_name, self.start_line, self.end_line
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetRef {
    pub kind: SnippetKind,
    pub function: FunctionRef,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub snippet_hash: String,
}

impl SnippetRef {
    /// Key used for self-match exclusion and dedup: identity of the owning
    /// function plus the snippet's own line range (two WIN snippets of the
    /// same function have the same identity but different ranges).
    pub fn identity(&self) -> String {
        format!(
            "{}:{}:{}",
            self.function.identity(),
            self.start_line,
            self.end_line
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub dim: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub snippet_a: SnippetRef,
    pub snippet_b: SnippetRef,
    pub similarity: f32,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub function_a: FunctionRef,
    pub function_b: FunctionRef,
    pub score: f32,
    pub duplicated_lines: usize,
    pub evidence: Vec<CandidateMatch>,
    pub reasons: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub file_count: usize,
    pub function_count: usize,
    pub snippet_count: usize,
    pub candidate_count: usize,
    pub finding_count: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub findings: Vec<Finding>,
    pub stats: ScanStats,
    pub config_snapshot: BTreeMap<String, String>,
    pub timing: BTreeMap<String, f64>,
}
