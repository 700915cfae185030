//! The embedder contract. A concrete, in-core [`crate::embedding::StubEmbedder`]
//! implements it deterministically; an external ML model (tokenize,
//! forward-pass, mean-pool) is an out-of-scope collaborator that would
//! implement the same trait — only its shape is modeled here, mirroring how
//! `rag-store::embed::EmbeddingsProvider` is a trait a concrete backend
//! fulfills elsewhere in the workspace.

use crate::errors::CloneHunterError;
use crate::model::types::{Embedding, SnippetRef};

pub trait Embedder {
    /// Fixed dimension of every vector this embedder returns.
    fn dim(&self) -> usize;

    /// Embed `snippets` in input order. A failure here is fatal to the run
    /// (§7 "Embedder failure"): callers should abort rather than skip.
    fn embed(&self, snippets: &[SnippetRef]) -> Result<Vec<Embedding>, CloneHunterError>;
}
