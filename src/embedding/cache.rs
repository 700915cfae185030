//! Content-addressed embedding cache.
//!
//! One JSON file per key under a configured root directory:
//! `{root}/{key}.json` with schema `{"vector": [...], "dim": n}`. The key
//! itself is `sha256("{model_name}:{model_revision}:{max_length}:{snippet_hash}")`,
//! so any change to the model identity or the snippet's own content
//! invalidates the cache entry automatically — no explicit version bump is
//! needed.
//!
//! Writes go to a `.tmp` sibling and are renamed into place (grounded on
//! `mr-reviewer::cache::maybe_store_bundle`'s single-`fs::write` shape,
//! extended with the rename step §5 requires for concurrent writers sharing
//! one cache root).

use crate::core::ids::hash_text;
use crate::model::types::Embedding;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct EmbeddingCache {
    root: PathBuf,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CacheEntry {
    vector: Vec<f32>,
    dim: usize,
}

impl EmbeddingCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `sha256("{model_name}:{model_revision}:{max_length}:{snippet_hash}")`.
    pub fn key(model_name: &str, model_revision: &str, max_length: usize, snippet_hash: &str) -> String {
        hash_text(&format!("{model_name}:{model_revision}:{max_length}:{snippet_hash}"))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Load every key present on disk; keys with no cached entry are simply
    /// absent from the returned map (a cache miss is not an error).
    pub fn get_many(&self, keys: &[String]) -> HashMap<String, Embedding> {
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(embedding) = self.get_one(key) {
                out.insert(key.clone(), embedding);
            }
        }
        out
    }

    fn get_one(&self, key: &str) -> Option<Embedding> {
        let path = self.entry_path(key);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Some(Embedding {
                vector: entry.vector,
                dim: entry.dim,
            }),
            Err(err) => {
                warn!("embedding cache: corrupt entry {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Persist every entry, one JSON file per key, written atomically.
    pub fn set_many(&self, entries: &HashMap<String, Embedding>) -> std::io::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.root)?;
        for (key, embedding) in entries {
            self.set_one(key, embedding)?;
        }
        debug!("embedding cache: wrote {} entries", entries.len());
        Ok(())
    }

    fn set_one(&self, key: &str, embedding: &Embedding) -> std::io::Result<()> {
        let entry = CacheEntry {
            vector: embedding.vector.clone(),
            dim: embedding.dim,
        };
        let json = serde_json::to_vec(&entry)?;
        let final_path = self.entry_path(key);
        let tmp_path = self.root.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        let key = EmbeddingCache::key("stub", "main", 256, "deadbeef");
        let embedding = Embedding {
            vector: vec![0.1, 0.2, 0.3],
            dim: 3,
        };
        let mut entries = HashMap::new();
        entries.insert(key.clone(), embedding.clone());
        cache.set_many(&entries).unwrap();

        let fetched = cache.get_many(std::slice::from_ref(&key));
        assert_eq!(fetched.get(&key), Some(&embedding));
    }

    #[test]
    fn missing_keys_are_simply_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::new(dir.path());
        let fetched = cache.get_many(&["nonexistent".to_string()]);
        assert!(fetched.is_empty());
    }

    #[test]
    fn key_changes_with_model_identity() {
        let a = EmbeddingCache::key("stub", "main", 256, "hash");
        let b = EmbeddingCache::key("stub", "v2", 256, "hash");
        assert_ne!(a, b);
    }
}
