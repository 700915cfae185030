//! Deterministic stub embedder.
//!
//! No model weights, no network: every vector is derived purely from the
//! SHA-256 digest of the snippet's normalized text. This is what makes the
//! pipeline's testable properties (§8 determinism) checkable without a real
//! embedding backend, and is the embedder every seed scenario in this crate's
//! test suite runs against.

use crate::embedding::traits::Embedder;
use crate::errors::CloneHunterError;
use crate::model::types::{Embedding, SnippetRef};
use sha2::{Digest, Sha256};

pub struct StubEmbedder {
    dim: usize,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Embedder for StubEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, snippets: &[SnippetRef]) -> Result<Vec<Embedding>, CloneHunterError> {
        Ok(snippets.iter().map(|s| embed_one(&s.text, self.dim)).collect())
    }
}

/// SHA-256(text) → first `dim` bytes (re-hashing the digest as needed to
/// stretch past 32 bytes) → byte/255.0 in `[0, 1]` → L2-normalized.
fn embed_one(text: &str, dim: usize) -> Embedding {
    let mut bytes = Vec::with_capacity(dim.max(32));
    let mut block = Sha256::digest(text.as_bytes()).to_vec();
    while bytes.len() < dim {
        bytes.extend_from_slice(&block);
        block = Sha256::digest(&block).to_vec();
    }
    bytes.truncate(dim);

    let mut vector: Vec<f32> = bytes.iter().map(|b| *b as f32 / 255.0).collect();
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    Embedding { vector, dim }
}
