//! Function/class extraction for Python sources, plus the whole-file
//! fallback used for non-Python (`text`) files.
//!
//! The walk is a stack of `(node, owner_path)` pairs, the same shape
//! `languages::dart::decls::collect_decls` uses: each `class_definition` or
//! `function_definition` pushes its own name onto the owner chain before its
//! children are queued, so a nested `def inner()` inside `class Foo` becomes
//! `Foo.inner`.

use crate::core::ids::hash_text;
use crate::model::types::{FileRef, FunctionRef, Language};
use tracing::warn;
use tree_sitter::{Node, Parser};

/// Parse `source` as Python and extract one [`FunctionRef`] per function,
/// method, nested function, and async function definition. A parse failure
/// (including a tree full of error nodes) yields an empty list rather than
/// an error — a single unparsable file must not abort a scan.
pub fn extract_functions(file: &FileRef, source: &str) -> Vec<FunctionRef> {
    let mut parser = Parser::new();
    if parser.set_language(&tree_sitter_python::LANGUAGE.into()).is_err() {
        warn!("python extractor: failed to load grammar");
        return Vec::new();
    }
    let Some(tree) = parser.parse(source, None) else {
        warn!("python extractor: parse failed for {}", file.path);
        return Vec::new();
    };
    if tree.root_node().has_error() {
        warn!("python extractor: syntax errors in {}, skipping extraction", file.path);
        return Vec::new();
    }

    let lines: Vec<&str> = source.lines().collect();
    let mut functions = Vec::new();
    let mut stack: Vec<(Node, Vec<String>)> = vec![(tree.root_node(), Vec::new())];

    while let Some((node, owner)) = stack.pop() {
        let mut owner_for_children = owner.clone();

        match node.kind() {
            "class_definition" => {
                if let Some(name) = def_name(&node, source) {
                    owner_for_children.push(name);
                }
            }
            "function_definition" => {
                if let Some(name) = def_name(&node, source) {
                    let start_line = node.start_position().row + 1;
                    let end_line = node.end_position().row + 1;
                    let code = slice_lines(&lines, start_line, end_line);
                    let qualified_name = owner
                        .iter()
                        .cloned()
                        .chain(std::iter::once(name.clone()))
                        .collect::<Vec<_>>()
                        .join(".");
                    functions.push(FunctionRef {
                        file: file.clone(),
                        qualified_name,
                        start_line,
                        end_line,
                        code_hash: hash_text(&code),
                        code,
                    });
                    owner_for_children.push(name);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push((child, owner_for_children.clone()));
        }
    }

    functions
}

/// A non-Python file contributes exactly one `FunctionRef` spanning its
/// whole body, so the rest of the pipeline can treat source and text files
/// uniformly.
pub fn extract_text_unit(file: &FileRef, source: &str) -> Vec<FunctionRef> {
    let line_count = source.lines().count().max(1);
    let name = file
        .path
        .rsplit('/')
        .next()
        .unwrap_or(file.path.as_str())
        .to_string();
    vec![FunctionRef {
        file: file.clone(),
        qualified_name: name,
        start_line: 1,
        end_line: line_count,
        code_hash: hash_text(source),
        code: source.to_string(),
    }]
}

/// Extract functions for a file according to its detected language.
pub fn extract(file: &FileRef, source: &str) -> Vec<FunctionRef> {
    match file.language {
        Language::Python => extract_functions(file, source),
        Language::Text => extract_text_unit(file, source),
    }
}

fn def_name(node: &Node, source: &str) -> Option<String> {
    let name_node = node.child_by_field_name("name")?;
    name_node.utf8_text(source.as_bytes()).ok().map(str::to_string)
}

fn slice_lines(lines: &[&str], start_line: usize, end_line: usize) -> String {
    let start = start_line.saturating_sub(1).min(lines.len());
    let end = end_line.min(lines.len());
    if start >= end {
        return String::new();
    }
    lines[start..end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::FileRef;

    fn file() -> FileRef {
        FileRef {
            path: "sample.py".to_string(),
            content_hash: "deadbeef".to_string(),
            language: Language::Python,
        }
    }

    #[test]
    fn extracts_top_level_and_nested_functions() {
        let source = "def outer():\n    def inner():\n        pass\n    return inner\n";
        let functions = extract_functions(&file(), source);
        let names: Vec<_> = functions.iter().map(|f| f.qualified_name.as_str()).collect();
        assert!(names.contains(&"outer"));
        assert!(names.contains(&"outer.inner"));
    }

    #[test]
    fn qualifies_methods_by_class_name() {
        let source = "class Foo:\n    def bar(self):\n        pass\n";
        let functions = extract_functions(&file(), source);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].qualified_name, "Foo.bar");
    }

    #[test]
    fn async_functions_are_extracted() {
        let source = "async def fetch():\n    pass\n";
        let functions = extract_functions(&file(), source);
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].qualified_name, "fetch");
    }

    #[test]
    fn malformed_source_yields_no_functions() {
        let source = "def broken(:\n    pass\n";
        assert!(extract_functions(&file(), source).is_empty());
    }

    #[test]
    fn text_file_yields_single_whole_file_unit() {
        let mut f = file();
        f.language = Language::Text;
        f.path = "notes.md".to_string();
        let units = extract_text_unit(&f, "line one\nline two\n");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].start_line, 1);
        assert_eq!(units[0].end_line, 2);
    }
}
