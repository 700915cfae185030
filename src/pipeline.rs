//! Pipeline Orchestrator (§4.11): sequences collection through clustering,
//! validates configuration up front, and records stage timings and counts.

use crate::clustering::{cluster_findings, filter_clusters};
use crate::config::CloneHunterConfig;
use crate::core::fs_scan::collect_files;
use crate::embedding::{Embedder, EmbeddingCache};
use crate::errors::CloneHunterError;
use crate::languages::python::extract;
use crate::model::types::{Embedding, FileRef, FunctionRef, ScanResult, ScanStats, SnippetRef};
use crate::retrieval::retrieve_candidates;
use crate::rollup::rollup_findings;
use crate::snippets::expansion::expand_calls;
use crate::snippets::generators::{generate_function_snippets, generate_window_snippets};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Run the full pipeline over `roots` using `embedder` to fill cache misses.
/// Configuration is validated first (§7 "Configuration invalid" — fatal,
/// nothing runs on a bad config); an embedder failure aborts the whole run
/// (§7 "Embedder failure").
#[tracing::instrument(level = "info", skip(config, embedder), fields(roots = ?roots))]
pub fn run_pipeline(
    roots: &[String],
    config: &CloneHunterConfig,
    embedder: &dyn Embedder,
) -> Result<ScanResult, CloneHunterError> {
    config.validate()?;

    let mut timing: BTreeMap<String, f64> = BTreeMap::new();

    // --- C1: collect ---
    let stage_start = Instant::now();
    let files = collect_files(roots, &config.include_globs, &config.exclude_globs);
    timing.insert("collect".to_string(), stage_start.elapsed().as_secs_f64());
    info!(file_count = files.len(), "collected files");

    // --- C2: extract ---
    let stage_start = Instant::now();
    let sources = read_sources(roots, &files);
    let mut functions: Vec<FunctionRef> = Vec::new();
    for file in &files {
        let Some(source) = sources.get(&file.path) else {
            continue;
        };
        functions.extend(extract(file, source));
    }
    timing.insert("extract".to_string(), stage_start.elapsed().as_secs_f64());
    info!(function_count = functions.len(), "extracted functions");

    // --- C3/C4: generate snippets (FUNC, WIN, EXP) ---
    let stage_start = Instant::now();
    let mut snippets: Vec<SnippetRef> = generate_function_snippets(&functions);
    snippets.extend(generate_window_snippets(&functions, &config.windows));
    if config.expansion.enabled {
        snippets.extend(expand_calls(&functions, &sources, &config.expansion));
    }
    timing.insert("generate_snippets".to_string(), stage_start.elapsed().as_secs_f64());
    info!(snippet_count = snippets.len(), "generated snippets");

    // --- C5/C6: embed (cache-miss only) ---
    let stage_start = Instant::now();
    let (embeddings, cache_hits, cache_misses) = embed_snippets(&snippets, config, embedder)?;
    timing.insert("embed".to_string(), stage_start.elapsed().as_secs_f64());
    info!(cache_hits, cache_misses, "embedded snippets");

    // --- C7/C8/C9/C10: similarity (retrieval, rollup, clustering) ---
    let stage_start = Instant::now();
    let matches = retrieve_candidates(
        &snippets,
        &embeddings,
        config.index.name,
        &config.index,
        &config.thresholds,
        config.retrieval_workers,
    )?;
    let candidate_count = matches.len();
    let mut findings = rollup_findings(matches, &config.thresholds);
    if config.cluster_findings {
        cluster_findings(&mut findings);
        findings = filter_clusters(findings, config.cluster_min_size);
    }
    timing.insert("similarity".to_string(), stage_start.elapsed().as_secs_f64());
    info!(candidate_count, finding_count = findings.len(), "rolled up findings");

    let stats = ScanStats {
        file_count: files.len(),
        function_count: functions.len(),
        snippet_count: snippets.len(),
        candidate_count,
        finding_count: findings.len(),
        cache_hits,
        cache_misses,
    };

    Ok(ScanResult {
        findings,
        stats,
        config_snapshot: config_snapshot(config),
        timing,
    })
}

/// Read every collected file's content back from disk, trying each root in
/// turn (a `FileRef`'s path is root-relative, and several roots may have
/// been scanned). Unreadable files are skipped (already logged by collection
/// when non-UTF-8; a file that vanished between collect and read is simply
/// dropped here too).
fn read_sources(roots: &[String], files: &[FileRef]) -> HashMap<String, String> {
    let mut sources = HashMap::with_capacity(files.len());
    for file in files {
        let content = roots
            .iter()
            .map(|root| Path::new(root).join(&file.path))
            .find_map(|candidate| std::fs::read_to_string(&candidate).ok())
            .or_else(|| std::fs::read_to_string(&file.path).ok());
        match content {
            Some(content) => {
                sources.insert(file.path.clone(), content);
            }
            None => warn!("pipeline: could not re-read {} for extraction", file.path),
        }
    }
    sources
}

fn embed_snippets(
    snippets: &[SnippetRef],
    config: &CloneHunterConfig,
    embedder: &dyn Embedder,
) -> Result<(Vec<Embedding>, usize, usize), CloneHunterError> {
    let cache = EmbeddingCache::new(shellexpand_tilde(&config.cache.path));
    let keys: Vec<String> = snippets
        .iter()
        .map(|s| {
            EmbeddingCache::key(
                &config.embedder.model_name,
                &config.embedder.revision,
                config.embedder.max_length,
                &s.snippet_hash,
            )
        })
        .collect();

    let cached = cache.get_many(&keys);
    let cache_hits = cached.len();

    let miss_indices: Vec<usize> = (0..snippets.len()).filter(|i| !cached.contains_key(&keys[*i])).collect();
    let cache_misses = miss_indices.len();

    let mut fresh: HashMap<String, Embedding> = HashMap::with_capacity(miss_indices.len());
    for batch in miss_indices.chunks(config.embedder.batch_size.max(1)) {
        let batch_snippets: Vec<SnippetRef> = batch.iter().map(|&i| snippets[i].clone()).collect();
        let batch_embeddings = embedder.embed(&batch_snippets)?;
        for (offset, embedding) in batch.iter().zip(batch_embeddings) {
            fresh.insert(keys[*offset].clone(), embedding);
        }
    }
    cache.set_many(&fresh).map_err(CloneHunterError::Io)?;

    let embeddings: Vec<Embedding> = keys
        .iter()
        .map(|key| cached.get(key).or_else(|| fresh.get(key)).expect("embedded or cached").clone())
        .collect();

    Ok((embeddings, cache_hits, cache_misses))
}

fn shellexpand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{home}/{rest}");
        }
    }
    path.to_string()
}

fn config_snapshot(config: &CloneHunterConfig) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Ok(value) = serde_json::to_value(config) {
        flatten_json(&value, "", &mut out);
    }
    out
}

fn flatten_json(value: &serde_json::Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                flatten_json(v, &key, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_json(v, &format!("{prefix}[{i}]"), out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CloneHunterConfig;
    use crate::embedding::StubEmbedder;
    use std::fs;

    #[test]
    fn near_duplicate_functions_across_files_produce_one_finding() {
        // The stub embedder hashes snippet text directly (§4.6), so it is not
        // similarity-preserving for near-but-not-identical text; a hash-based
        // embedder only reliably crosses the embedding half of the composite
        // score on byte-identical normalized bodies, exactly as the original
        // implementation's own pipeline smoke test relies on for its stub-backed
        // cross-file duplicate scenario.
        let dir = tempfile::tempdir().unwrap();
        let body = "def add(xs):\n    total = 0\n    for x in xs:\n        total += x\n    return total\n";
        fs::write(dir.path().join("a.py"), body).unwrap();
        fs::write(dir.path().join("b.py"), body).unwrap();

        let mut config = CloneHunterConfig::default();
        config.cache.path = dir.path().join("cache").to_string_lossy().to_string();
        config.retrieval_workers = 1;

        let embedder = StubEmbedder::new(32);
        let root = dir.path().to_string_lossy().to_string();
        let result = run_pipeline(&[root], &config, &embedder).unwrap();

        assert_eq!(result.findings.len(), 1);
        assert!(result.findings[0].score >= 0.9);
        assert!(result.findings[0].reasons.contains(&"func_threshold".to_string()));
        assert_eq!(result.stats.file_count, 2);
    }

    #[test]
    fn invalid_config_is_rejected_before_any_stage_runs() {
        let mut config = CloneHunterConfig::default();
        config.windows.window_lines = 0;
        let embedder = StubEmbedder::default();
        let err = run_pipeline(&[".".to_string()], &config, &embedder).unwrap_err();
        assert!(matches!(err, CloneHunterError::Config(_)));
    }

    #[test]
    fn single_function_self_overlap_yields_no_finding() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = (0..30).map(|i| format!("    x{i} = {i}\n")).collect();
        fs::write(dir.path().join("a.py"), format!("def f():\n{body}    return x0\n")).unwrap();

        let mut config = CloneHunterConfig::default();
        config.cache.path = dir.path().join("cache").to_string_lossy().to_string();
        config.retrieval_workers = 1;
        config.windows.window_lines = 10;
        config.windows.stride_lines = 5;
        config.windows.min_nonempty = 1;

        let embedder = StubEmbedder::new(32);
        let root = dir.path().to_string_lossy().to_string();
        let result = run_pipeline(&[root], &config, &embedder).unwrap();
        assert!(result.findings.is_empty());
    }
}
