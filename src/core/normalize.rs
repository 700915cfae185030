//! Docstring-stripping and whitespace normalizer.
//!
//! Snippet text is normalized before it is hashed and embedded so that two
//! functions differing only in their docstring, or only in incidental
//! whitespace, still compare as identical. The original re-emits a
//! canonical form via `ast.unparse` after rewriting the AST, which
//! normalizes *all* formatting, not just docstrings. Rust has no stable
//! unparser, so this crate edits source text directly instead of
//! re-serializing a rewritten tree: every bare string-literal expression
//! that is the first statement of a module or function body is replaced
//! in place with `pass`, trailing whitespace is trimmed from every line,
//! and line endings are normalized to `\n`. This recovers the two
//! formatting differences the pipeline actually produces snippets with
//! (docstrings, and inconsistent line endings/trailing spaces from
//! window-slicing), but unlike a full unparse it leaves other formatting —
//! indentation style, blank-line placement, quote style — unnormalized;
//! two functions differing only in those respects will still hash and
//! embed as distinct. A snippet that fails to parse (most `WIN` snippets,
//! being mid-function slices, do — they lack an enclosing `def`) only
//! gets the whitespace pass, exactly like the original's
//! `except SyntaxError: return source` (which still runs the original's
//! own line-ending/whitespace cleanup before attempting the parse).

use tree_sitter::{Node, Parser};

pub fn normalize_source(source: &str) -> String {
    let whitespace_normalized = normalize_whitespace(source);

    let mut parser = Parser::new();
    if parser.set_language(&tree_sitter_python::LANGUAGE.into()).is_err() {
        return whitespace_normalized;
    }
    let Some(tree) = parser.parse(&whitespace_normalized, None) else {
        return whitespace_normalized;
    };
    if tree.root_node().has_error() {
        return whitespace_normalized;
    }

    let mut replacements: Vec<(usize, usize)> = Vec::new();
    collect_docstring_ranges(&tree.root_node(), &whitespace_normalized, &mut replacements);
    if replacements.is_empty() {
        return whitespace_normalized;
    }

    replacements.sort_by_key(|(start, _)| std::cmp::Reverse(*start));
    let mut out = whitespace_normalized;
    for (start, end) in replacements {
        out.replace_range(start..end, "pass");
    }
    out
}

/// Normalize line endings to `\n` and trim trailing whitespace from every
/// line; this is the subset of `ast.unparse`'s formatting normalization
/// that is safe to apply without a full parse/re-emit round trip.
fn normalize_whitespace(source: &str) -> String {
    let mut out: String = source.lines().map(|line| line.trim_end()).collect::<Vec<_>>().join("\n");
    if source.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn collect_docstring_ranges(node: &Node, source: &str, out: &mut Vec<(usize, usize)>) {
    if let Some(body) = body_block_of(node) {
        if let Some(first) = first_statement(&body) {
            if let Some(range) = docstring_range(&first, source) {
                out.push(range);
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_docstring_ranges(&child, source, out);
    }
}

/// A module's body is the set of top-level statement children of the root
/// node; a function's body is its `body` field (a `block` node).
fn body_block_of<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    match node.kind() {
        "module" => Some(*node),
        "function_definition" => node.child_by_field_name("body"),
        _ => None,
    }
}

fn first_statement<'a>(body: &Node<'a>) -> Option<Node<'a>> {
    let mut cursor = body.walk();
    body.children(&mut cursor).find(|c| c.is_named())
}

/// If `stmt` is an `expression_statement` whose sole child is a bare
/// string literal, return its byte range.
fn docstring_range(stmt: &Node, _source: &str) -> Option<(usize, usize)> {
    if stmt.kind() != "expression_statement" {
        return None;
    }
    let expr = stmt.named_child(0)?;
    if expr.kind() == "string" {
        Some((stmt.start_byte(), stmt.end_byte()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_module_docstring() {
        let source = "\"\"\"module doc.\"\"\"\nx = 1\n";
        let normalized = normalize_source(source);
        assert!(!normalized.contains("module doc"));
        assert!(normalized.contains("pass"));
    }

    #[test]
    fn strips_function_docstring_only() {
        let source = "def f():\n    \"\"\"doc.\"\"\"\n    return 1\n";
        let normalized = normalize_source(source);
        assert!(!normalized.contains("doc."));
        assert!(normalized.contains("return 1"));
    }

    #[test]
    fn leaves_non_docstring_code_untouched() {
        let source = "def f():\n    return 1\n";
        assert_eq!(normalize_source(source), source);
    }

    #[test]
    fn falls_back_on_unparsable_fragment() {
        let source = "    return 1\n    x = 2\n";
        assert_eq!(normalize_source(source), source);
    }
}
