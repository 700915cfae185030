//! Pipeline configuration.
//!
//! A single immutable [`CloneHunterConfig`] carries every tunable of the
//! pipeline, split into sub-structs the way `codegraph-prep`'s `GraphConfig`
//! is split into `Filters`/`Limits`/etc. Defaults mirror what a semantic clone
//! scan ships with out of the box; callers that need to load these from a
//! file or environment own that concern themselves (serde derives are
//! provided for that, but no loader lives in this crate).

use crate::errors::CloneHunterError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub window_lines: usize,
    pub stride_lines: usize,
    pub min_nonempty: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_lines: 40,
            stride_lines: 6,
            min_nonempty: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    pub enabled: bool,
    pub depth: usize,
    pub max_chars: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            depth: 1,
            max_chars: 4000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub func: f32,
    pub win: f32,
    pub exp: f32,
    pub min_window_hits: usize,
    pub lexical_min_ratio: f32,
    pub lexical_weight: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            func: 0.92,
            win: 0.90,
            exp: 0.90,
            min_window_hits: 2,
            lexical_min_ratio: 0.5,
            lexical_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Brute,
    Approx,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: IndexKind,
    pub top_k: usize,
    pub nlist: usize,
    pub nprobe: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: IndexKind::Brute,
            top_k: 25,
            nlist: 128,
            nprobe: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "~/.cache/clonehunter".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    Stub,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    pub name: EmbedderKind,
    pub model_name: String,
    pub revision: String,
    pub max_length: usize,
    pub batch_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            name: EmbedderKind::Stub,
            model_name: "stub".to_string(),
            revision: "main".to_string(),
            max_length: 256,
            batch_size: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneHunterConfig {
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub windows: WindowConfig,
    pub expansion: ExpansionConfig,
    pub thresholds: Thresholds,
    pub index: IndexConfig,
    pub cache: CacheConfig,
    pub embedder: EmbedderConfig,
    pub cluster_findings: bool,
    pub cluster_min_size: usize,
    /// Number of worker threads the candidate retriever partitions work
    /// across. Defaults to the number of available CPUs.
    pub retrieval_workers: usize,
}

impl Default for CloneHunterConfig {
    fn default() -> Self {
        Self {
            include_globs: vec!["**/*.py".to_string()],
            exclude_globs: vec![
                "**/.venv/**".to_string(),
                "**/venv/**".to_string(),
                "**/__pycache__/**".to_string(),
                "**/site-packages/**".to_string(),
            ],
            windows: WindowConfig::default(),
            expansion: ExpansionConfig::default(),
            thresholds: Thresholds::default(),
            index: IndexConfig::default(),
            cache: CacheConfig::default(),
            embedder: EmbedderConfig::default(),
            cluster_findings: false,
            cluster_min_size: 2,
            retrieval_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl CloneHunterConfig {
    /// Reject configurations the pipeline cannot run with. Mirrors the
    /// original's `_validate_config`: this is the only place a bad config
    /// surfaces as an error, and it happens before any stage runs.
    pub fn validate(&self) -> Result<(), CloneHunterError> {
        if self.windows.window_lines == 0 {
            return Err(CloneHunterError::Config(
                "windows.window_lines must be > 0".to_string(),
            ));
        }
        if self.windows.stride_lines == 0 {
            return Err(CloneHunterError::Config(
                "windows.stride_lines must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.lexical_weight) {
            return Err(CloneHunterError::Config(
                "thresholds.lexical_weight must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.lexical_min_ratio) {
            return Err(CloneHunterError::Config(
                "thresholds.lexical_min_ratio must be within [0, 1]".to_string(),
            ));
        }
        if self.retrieval_workers == 0 {
            return Err(CloneHunterError::Config(
                "retrieval_workers must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        CloneHunterConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_window() {
        let mut cfg = CloneHunterConfig::default();
        cfg.windows.window_lines = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_lexical_weight() {
        let mut cfg = CloneHunterConfig::default();
        cfg.thresholds.lexical_weight = 1.5;
        assert!(cfg.validate().is_err());
    }
}
