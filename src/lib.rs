//! Semantic clone detection core: ingest a source tree, decompose it into
//! multi-granularity snippets, embed and retrieve nearest neighbors, and roll
//! the retained pairs up into per-function-pair findings with evidence,
//! scores, and cluster assignments.
//!
//! The pipeline is a straight-line dataflow (`pipeline::run_pipeline`) with
//! parallelism confined to candidate retrieval (`retrieval::candidates`).
//! Everything upstream of it — the config loader, CLI, reporters, git-diff
//! driver, external report importer, and any real ML embedder backend — is
//! an external collaborator; this crate only models the trait seams those
//! collaborators fill.

pub mod clustering;
pub mod config;
pub mod core;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod languages;
pub mod model;
pub mod pipeline;
pub mod retrieval;
pub mod rollup;
pub mod snippets;

pub use config::CloneHunterConfig;
pub use errors::CloneHunterError;
pub use model::types::{
    CandidateMatch, Embedding, FileRef, Finding, FunctionRef, Language, ScanResult, ScanStats, SnippetKind, SnippetRef,
};
pub use pipeline::run_pipeline;
