//! Candidate retrieval: parallel top-k vector search with lexical re-ranking
//! and per-kind threshold gating.

pub mod candidates;
pub mod lexical;

pub use candidates::retrieve_candidates;
