//! The nearest-neighbor search contract both index backends implement.

use crate::model::types::Embedding;

pub trait VectorIndex {
    /// `vectors` and `ids` are parallel arrays of equal length; `ids` are
    /// unique. Rebuilds any prior state.
    fn build(&mut self, vectors: &[Embedding], ids: &[String]);

    /// Top-`k` nearest neighbors by cosine similarity, sorted descending,
    /// length at most `k`. The caller is responsible for filtering out the
    /// query's own id from the results.
    fn query(&self, vector: &Embedding, k: usize) -> Vec<(String, f32)>;
}
