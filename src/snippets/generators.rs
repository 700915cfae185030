//! FUNC and WIN snippet generation.

use crate::config::WindowConfig;
use crate::core::ids::hash_text;
use crate::core::normalize::normalize_source;
use crate::model::types::{FunctionRef, SnippetKind, SnippetRef};

/// One snippet per function: its whole (normalized) body.
pub fn generate_function_snippets(functions: &[FunctionRef]) -> Vec<SnippetRef> {
    functions
        .iter()
        .map(|function| {
            let snippet_hash = hash_text(&format!(
                "FUNC:{}:{}:{}:{}",
                function.file.path, function.start_line, function.end_line, function.code_hash
            ));
            SnippetRef {
                kind: SnippetKind::Func,
                function: function.clone(),
                start_line: function.start_line,
                end_line: function.end_line,
                text: normalize_source(&function.code),
                snippet_hash,
            }
        })
        .collect()
}

/// A sliding window of `window_lines` over each function's body, stepped by
/// `stride_lines`, skipping windows with fewer than `min_nonempty`
/// non-blank lines.
pub fn generate_window_snippets(functions: &[FunctionRef], params: &WindowConfig) -> Vec<SnippetRef> {
    let mut snippets = Vec::new();
    for function in functions {
        let lines: Vec<&str> = function.code.lines().collect();
        if lines.is_empty() {
            continue;
        }
        let mut idx = 0usize;
        while idx < lines.len() {
            let start = idx + 1;
            let end = (idx + params.window_lines).min(lines.len());
            let window = &lines[start - 1..end];
            let nonempty = window.iter().filter(|l| !l.trim().is_empty()).count();
            if nonempty >= params.min_nonempty {
                snippets.push(make_window_snippet(function, start, end));
            }
            idx += params.stride_lines;
        }
    }
    snippets
}

fn make_window_snippet(function: &FunctionRef, start: usize, end: usize) -> SnippetRef {
    let lines: Vec<&str> = function.code.lines().collect();
    let slice_end = end.min(lines.len());
    let snippet_text = lines[start - 1..slice_end].join("\n");
    let normalized = normalize_source(&snippet_text);
    let snippet_hash = hash_text(&format!(
        "WIN:{}:{}:{}:{}:{}:{}:{}",
        function.file.path, function.start_line, function.end_line, function.code_hash, start, end, normalized
    ));
    SnippetRef {
        kind: SnippetKind::Win,
        function: function.clone(),
        start_line: function.start_line + start - 1,
        end_line: function.start_line + end - 1,
        text: normalized,
        snippet_hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{FileRef, Language};

    fn function(code: &str) -> FunctionRef {
        FunctionRef {
            file: FileRef {
                path: "a.py".to_string(),
                content_hash: "h".to_string(),
                language: Language::Python,
            },
            qualified_name: "f".to_string(),
            start_line: 10,
            end_line: 10 + code.lines().count() - 1,
            code_hash: hash_text(code),
            code: code.to_string(),
        }
    }

    #[test]
    fn func_snippet_covers_whole_function() {
        let fn_ref = function("def f():\n    return 1\n");
        let snippets = generate_function_snippets(std::slice::from_ref(&fn_ref));
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].start_line, fn_ref.start_line);
        assert_eq!(snippets[0].end_line, fn_ref.end_line);
    }

    #[test]
    fn window_snippets_skip_sparse_windows() {
        let code = "x = 1\n\n\n\n\n\n\n\n".to_string();
        let fn_ref = function(&code);
        let params = WindowConfig {
            window_lines: 3,
            stride_lines: 3,
            min_nonempty: 2,
        };
        let snippets = generate_window_snippets(&[fn_ref], &params);
        assert!(snippets.is_empty());
    }

    #[test]
    fn window_snippet_line_offsets_are_function_relative() {
        let code = "a = 1\nb = 2\nc = 3\nd = 4\n";
        let fn_ref = function(code);
        let params = WindowConfig {
            window_lines: 2,
            stride_lines: 2,
            min_nonempty: 1,
        };
        let snippets = generate_window_snippets(std::slice::from_ref(&fn_ref), &params);
        assert_eq!(snippets[0].start_line, fn_ref.start_line);
        assert_eq!(snippets[0].end_line, fn_ref.start_line + 1);
    }
}
