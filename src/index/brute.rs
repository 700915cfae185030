//! Brute-force cosine index: a flat id→vector map, exact full scan on query.
//! Always correct, used as the approximate index's fallback when there
//! aren't enough vectors to train a quantizer.

use crate::index::traits::VectorIndex;
use crate::model::types::Embedding;

#[derive(Default)]
pub struct BruteIndex {
    entries: Vec<(String, Embedding)>,
}

impl BruteIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity between two vectors. Callers supply unit-length
/// vectors (the embedder/consumer's job per §3), but this computes the full
/// formula rather than assuming normalization so a non-unit input still
/// yields a sane score instead of a silently wrong one.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

impl VectorIndex for BruteIndex {
    fn build(&mut self, vectors: &[Embedding], ids: &[String]) {
        self.entries = ids
            .iter()
            .cloned()
            .zip(vectors.iter().cloned())
            .collect();
    }

    fn query(&self, vector: &Embedding, k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .entries
            .iter()
            .map(|(id, emb)| (id.clone(), cosine(&vector.vector, &emb.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}
