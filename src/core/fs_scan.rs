//! File Collector: walks one or more root paths, applies include/exclude
//! globs, and returns a [`FileRef`] per surviving file with its content hash.
//!
//! Directories are pruned as soon as they match an exclude glob so the walk
//! never descends into e.g. `.venv/` or `__pycache__/`. Unreadable files
//! (permission errors, non-UTF-8 content) are skipped with a `warn!` —
//! collection never aborts a run over a single bad file.

use crate::model::types::{FileRef, Language};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Build a [`GlobSet`] from glob patterns, skipping (and warning on) any
/// pattern that fails to parse rather than aborting the whole scan.
pub fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => warn!("fs_scan: invalid glob {:?}: {}", pattern, err),
        }
    }
    builder.build().unwrap_or_else(|_| {
        GlobSetBuilder::new()
            .build()
            .expect("empty globset always builds")
    })
}

fn detect_language(path: &Path) -> Language {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") => Language::Python,
        _ => Language::Text,
    }
}

/// Collect every file under `roots` whose path matches `include_globs` and
/// does not match `exclude_globs`, relative to each root.
#[tracing::instrument(level = "info", skip(include_globs, exclude_globs))]
pub fn collect_files(roots: &[String], include_globs: &[String], exclude_globs: &[String]) -> Vec<FileRef> {
    let include = build_globset(include_globs);
    let exclude = build_globset(exclude_globs);

    let mut results = Vec::new();
    let mut skipped_unreadable = 0usize;

    for raw_root in roots {
        let root_path = Path::new(raw_root);
        if root_path.is_file() {
            if let Some(rel) = relative_to_cwd(root_path) {
                if include.is_match(&rel) && !exclude.is_match(&rel) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if let Some(file_ref) = read_file_ref(root_path, &rel_str) {
                        results.push(file_ref);
                    } else {
                        skipped_unreadable += 1;
                    }
                }
            }
            continue;
        }

        let walker = WalkDir::new(root_path).into_iter().filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            let rel = entry.path().strip_prefix(root_path).unwrap_or(entry.path());
            let rel = rel.to_string_lossy().replace('\\', "/");
            !exclude.is_match(rel)
        });

        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let rel = match path.strip_prefix(root_path) {
                Ok(r) => r.to_string_lossy().replace('\\', "/"),
                Err(_) => path.to_string_lossy().replace('\\', "/"),
            };

            if !include.is_match(&rel) || exclude.is_match(&rel) {
                continue;
            }

            if let Some(file_ref) = read_file_ref(path, &rel) {
                results.push(file_ref);
            } else {
                skipped_unreadable += 1;
            }
        }
    }

    debug!(
        "fs_scan: collected={} skipped_unreadable={}",
        results.len(),
        skipped_unreadable
    );
    results
}

fn relative_to_cwd(path: &Path) -> Option<std::path::PathBuf> {
    if path.is_absolute() {
        let cwd = std::env::current_dir().ok()?;
        path.strip_prefix(&cwd).map(|p| p.to_path_buf()).ok()
    } else {
        Some(path.to_path_buf())
    }
}

fn read_file_ref(path: &Path, rel: &str) -> Option<FileRef> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(err) => {
            warn!("fs_scan: unreadable {}: {}", path.display(), err);
            return None;
        }
    };
    let content = String::from_utf8_lossy(&bytes).into_owned();
    Some(FileRef {
        path: rel.to_string(),
        content_hash: crate::core::ids::hash_text(&content),
        language: detect_language(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn collects_python_files_and_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::create_dir_all(dir.path().join(".venv")).unwrap();
        fs::write(dir.path().join("pkg/a.py"), "def f():\n    pass\n").unwrap();
        fs::write(dir.path().join(".venv/vendored.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("README.md"), "not python").unwrap();

        let root = dir.path().to_string_lossy().to_string();
        let include = vec!["**/*.py".to_string()];
        let exclude = vec!["**/.venv/**".to_string()];

        let files = collect_files(&[root], &include, &exclude);
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("pkg/a.py"));
        assert_eq!(files[0].language, Language::Python);
    }
}
