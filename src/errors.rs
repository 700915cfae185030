//! Error taxonomy for the clone-detection pipeline.
//!
//! Only conditions that must abort a run are modeled as variants here.
//! Per-file I/O failures, parse failures, and vector-index backend
//! unavailability are intentionally *not* error variants: the pipeline
//! treats them as local, non-fatal conditions (skip the file, fall back to
//! brute-force indexing) and only logs a warning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloneHunterError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedder failed: {0}")]
    Embedder(String),

    #[error("worker thread panicked: {0}")]
    Worker(String),
}
