//! EXP snippet generation: call-expansion via static, best-effort resolution
//! of a function's callees within the same scan.
//!
//! This is a line-for-line port of the original's resolver: it distinguishes
//! `name(...)`, `obj.method(...)`, and `Ctor(...).method(...)` call shapes,
//! resolves `self`/`cls` against the enclosing class, infers local
//! variable-to-class bindings from simple assignments, and follows
//! same-repository imports (including relative imports) one module hop.
//! Anything it cannot resolve is silently dropped — EXP is a best-effort
//! enrichment, never a correctness-critical path.

use crate::config::ExpansionConfig;
use crate::core::ids::hash_text;
use crate::core::normalize::normalize_source;
use crate::model::types::{FunctionRef, SnippetKind, SnippetRef};
use std::collections::{HashMap, HashSet};
use tree_sitter::{Node, Parser};

pub fn expand_calls(
    functions: &[FunctionRef],
    sources: &HashMap<String, String>,
    params: &ExpansionConfig,
) -> Vec<SnippetRef> {
    if !params.enabled || params.depth == 0 {
        return Vec::new();
    }

    let mut by_file: HashMap<String, Vec<&FunctionRef>> = HashMap::new();
    for function in functions {
        by_file.entry(function.file.path.clone()).or_default().push(function);
    }

    let module_name_map = module_name_map(&by_file);
    let local_files: HashSet<String> = by_file.keys().cloned().collect();

    let module_functions: HashMap<String, HashMap<String, &FunctionRef>> = by_file
        .iter()
        .map(|(path, fns)| (path.clone(), name_map(fns)))
        .collect();
    let module_qualified: HashMap<String, HashMap<String, &FunctionRef>> = by_file
        .iter()
        .map(|(path, fns)| (path.clone(), qualified_map(fns)))
        .collect();
    let module_classes: HashMap<String, HashSet<String>> = by_file
        .iter()
        .map(|(path, fns)| (path.clone(), class_names(&qualified_map(fns))))
        .collect();
    let mut snippets = Vec::new();
    for (file_path, fns) in &by_file {
        let name_map = name_map(fns);
        let qualified_map = qualified_map(fns);
        let class_names = class_names(&qualified_map);
        let source = sources.get(file_path).map(String::as_str).unwrap_or("");
        let imports = collect_imports(file_path, source, &local_files);
        let factory_map = factory_map_for_functions(fns);

        for function in fns {
            let (expanded, helpers) = expand_for_function(
                function,
                &name_map,
                &qualified_map,
                &class_names,
                &imports,
                &module_name_map,
                &module_functions,
                &module_qualified,
                &module_classes,
                &factory_map,
                params,
            );
            if helpers.is_empty() {
                continue;
            }
            let normalized = normalize_source(&expanded);
            let snippet_hash = hash_text(&format!(
                "EXP:{}:{}:{}:{}:{}:{}:{}:{}",
                function.file.path,
                function.start_line,
                function.end_line,
                function.code_hash,
                helpers.join(","),
                params.depth,
                params.max_chars,
                normalized
            ));
            snippets.push(SnippetRef {
                kind: SnippetKind::Exp,
                function: (*function).clone(),
                start_line: function.start_line,
                end_line: function.end_line,
                text: normalized,
                snippet_hash,
            });
        }
    }
    snippets
}

fn name_map<'a>(functions: &[&'a FunctionRef]) -> HashMap<String, &'a FunctionRef> {
    functions
        .iter()
        .map(|f| (short_name(&f.qualified_name), *f))
        .collect()
}

fn qualified_map<'a>(functions: &[&'a FunctionRef]) -> HashMap<String, &'a FunctionRef> {
    functions.iter().map(|f| (f.qualified_name.clone(), *f)).collect()
}

fn short_name(qualified_name: &str) -> String {
    qualified_name.rsplit('.').next().unwrap_or(qualified_name).to_string()
}

fn class_name_of(function: &FunctionRef) -> Option<String> {
    let parts: Vec<&str> = function.qualified_name.split('.').collect();
    if parts.len() >= 2 {
        Some(parts[parts.len() - 2].to_string())
    } else {
        None
    }
}

fn class_names(qualified_map: &HashMap<String, &FunctionRef>) -> HashSet<String> {
    qualified_map
        .keys()
        .filter_map(|qname| {
            let parts: Vec<&str> = qname.split('.').collect();
            (parts.len() >= 2).then(|| parts[parts.len() - 2].to_string())
        })
        .collect()
}

fn module_name_map(by_file: &HashMap<String, Vec<&FunctionRef>>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for file_path in by_file.keys() {
        let name = file_path.rsplit('/').next().unwrap_or(file_path);
        map.insert(name.to_string(), file_path.clone());
        let stem = name.strip_suffix(".py").unwrap_or(name);
        map.insert(stem.to_string(), file_path.clone());
    }
    map
}

fn resolve_module_path(module_path: &str, module_name_map: &HashMap<String, String>) -> Option<String> {
    let name = module_path.rsplit('/').next().unwrap_or(module_path);
    let stem = name.strip_suffix(".py").unwrap_or(name);
    module_name_map.get(name).or_else(|| module_name_map.get(stem)).cloned()
}

fn resolve_from_module<'a, V>(
    module_path: &str,
    key: &str,
    module_name_map: &HashMap<String, String>,
    module_values: &'a HashMap<String, HashMap<String, V>>,
) -> Option<&'a V> {
    let file_path = resolve_module_path(module_path, module_name_map)?;
    module_values.get(&file_path)?.get(key)
}

fn class_exists_in_module(
    module_path: &str,
    class_name: &str,
    module_name_map: &HashMap<String, String>,
    module_classes: &HashMap<String, HashSet<String>>,
) -> bool {
    let Some(file_path) = resolve_module_path(module_path, module_name_map) else {
        return false;
    };
    module_classes.get(&file_path).is_some_and(|set| set.contains(class_name))
}

fn factory_map_for_functions(functions: &[&FunctionRef]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for function in functions {
        if let Some(class_name) = infer_return_class(&function.code) {
            map.insert(short_name(&function.qualified_name), class_name);
        }
    }
    map
}

/// If the function's body returns a bare `SomeClass(...)` constructor call,
/// return `SomeClass`.
fn infer_return_class(source: &str) -> Option<String> {
    let tree = parse_python(source)?;
    let mut found = None;
    walk_find_returns(&tree.root_node(), source, &mut found);
    found
}

fn walk_find_returns(node: &Node, source: &str, found: &mut Option<String>) {
    if node.kind() == "return_statement" {
        if let Some(expr) = node.named_child(0) {
            if expr.kind() == "call" {
                if let Some(func) = expr.child_by_field_name("function") {
                    if func.kind() == "identifier" {
                        *found = node_text(&func, source);
                    }
                }
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_find_returns(&child, source, found);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CallKind {
    Name,
    Attr,
    Ctor,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CallRef {
    kind: CallKind,
    base: Option<String>,
    name: String,
}

/// Calls in AST-traversal order, deduplicated keeping each call's first
/// occurrence — order feeds the `# expanded:` block order, the `helpers`
/// list, and the EXP snippet hash, so it must be stable across runs
/// (a `HashSet` iteration order is per-process random and would leak into
/// all three).
fn collect_calls(source: &str) -> Vec<CallRef> {
    let Some(tree) = parse_python(source) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut calls = Vec::new();
    walk_find_calls(&tree.root_node(), source, &mut seen, &mut calls);
    calls
}

fn walk_find_calls(node: &Node, source: &str, seen: &mut HashSet<CallRef>, calls: &mut Vec<CallRef>) {
    if node.kind() == "call" {
        if let Some(func) = node.child_by_field_name("function") {
            if let Some(call_ref) = call_from_node(&func, source) {
                if seen.insert(call_ref.clone()) {
                    calls.push(call_ref);
                }
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_find_calls(&child, source, seen, calls);
    }
}

fn call_from_node(node: &Node, source: &str) -> Option<CallRef> {
    match node.kind() {
        "identifier" => Some(CallRef {
            kind: CallKind::Name,
            base: None,
            name: node_text(node, source)?,
        }),
        "attribute" => {
            let attr_name = node_text(&node.child_by_field_name("attribute")?, source)?;
            let base = node.child_by_field_name("object")?;
            match base.kind() {
                "identifier" => Some(CallRef {
                    kind: CallKind::Attr,
                    base: node_text(&base, source),
                    name: attr_name,
                }),
                "call" => {
                    let inner_func = base.child_by_field_name("function")?;
                    if inner_func.kind() == "identifier" {
                        Some(CallRef {
                            kind: CallKind::Ctor,
                            base: node_text(&inner_func, source),
                            name: attr_name,
                        })
                    } else {
                        None
                    }
                }
                _ => None,
            }
        }
        _ => None,
    }
}

#[derive(Debug, Default, Clone)]
struct ImportMap {
    module_aliases: HashMap<String, String>,
    function_aliases: HashMap<String, (String, String)>,
    class_aliases: HashMap<String, (String, String)>,
}

fn collect_imports(file_path: &str, source: &str, local_files: &HashSet<String>) -> ImportMap {
    let mut imports = ImportMap::default();
    let Some(tree) = parse_python(source) else {
        return imports;
    };
    let base_dir = dirname(file_path);

    let mut cursor = tree.root_node().walk();
    for node in tree.root_node().children(&mut cursor) {
        match node.kind() {
            "import_statement" => {
                for i in 0..node.child_count() {
                    let Some(child) = node.child(i) else { continue };
                    let (dotted, alias) = match child.kind() {
                        "dotted_name" => (Some(child), None),
                        "aliased_import" => (
                            child.child_by_field_name("name"),
                            child.child_by_field_name("alias"),
                        ),
                        _ => continue,
                    };
                    let Some(dotted) = dotted else { continue };
                    let Some(module_name) = node_text(&dotted, source) else { continue };
                    if let Some(module_path) = resolve_local_module(&base_dir, &module_name, local_files) {
                        let key = alias
                            .and_then(|a| node_text(&a, source))
                            .unwrap_or_else(|| module_name.split('.').next_back().unwrap_or(&module_name).to_string());
                        imports.module_aliases.insert(key, module_path);
                    }
                }
            }
            "import_from_statement" => {
                let Some(module_node) = node.child_by_field_name("module_name") else { continue };
                let (module_name, resolve_base) = match module_node.kind() {
                    "dotted_name" => (node_text(&module_node, source), base_dir.clone()),
                    "relative_import" => {
                        let level = module_node
                            .children(&mut module_node.walk())
                            .filter(|c| c.kind() == "import_prefix")
                            .map(|c| node_text(&c, source).unwrap_or_default().len())
                            .sum::<usize>();
                        let rest = module_node
                            .children(&mut module_node.walk())
                            .find(|c| c.kind() == "dotted_name")
                            .and_then(|c| node_text(&c, source));
                        (rest, apply_relative(&base_dir, level))
                    }
                    _ => continue,
                };
                let Some(module_name) = module_name else { continue };
                let Some(module_path) = resolve_local_module(&resolve_base, &module_name, local_files) else {
                    continue;
                };
                let mut names_cursor = node.walk();
                for name_node in node.children_by_field_name("name", &mut names_cursor) {
                    let (item_name, alias) = match name_node.kind() {
                        "dotted_name" => (node_text(&name_node, source), None),
                        "aliased_import" => (
                            name_node.child_by_field_name("name").and_then(|n| node_text(&n, source)),
                            name_node.child_by_field_name("alias").and_then(|n| node_text(&n, source)),
                        ),
                        _ => continue,
                    };
                    let Some(item_name) = item_name else { continue };
                    let key = alias.unwrap_or_else(|| item_name.clone());
                    imports
                        .function_aliases
                        .insert(key.clone(), (module_path.clone(), item_name.clone()));
                    imports.class_aliases.insert(key, (module_path.clone(), item_name));
                }
            }
            _ => {}
        }
    }
    imports
}

fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

fn apply_relative(base_dir: &str, level: usize) -> String {
    let mut parts: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for _ in 0..level {
        if parts.pop().is_none() {
            break;
        }
    }
    parts.join("/")
}

fn resolve_local_module(base_dir: &str, module_name: &str, local_files: &HashSet<String>) -> Option<String> {
    let parts: Vec<&str> = module_name.split('.').collect();
    let joined = parts.join("/");
    let candidate_module = normalize_path(&join_path(base_dir, &format!("{}.py", joined)));
    let candidate_package = normalize_path(&join_path(base_dir, &format!("{}/__init__.py", joined)));
    if local_files.contains(&candidate_module) {
        return Some(candidate_module);
    }
    if local_files.contains(&candidate_package) {
        return Some(candidate_package);
    }
    local_files
        .iter()
        .find(|file_path| matches_module_path(file_path, &parts))
        .cloned()
}

fn matches_module_path(file_path: &str, parts: &[&str]) -> bool {
    let path_parts: Vec<&str> = file_path.split('/').collect();
    let module_parts: Vec<String> = if file_path.ends_with("__init__.py") {
        parts.iter().map(|s| s.to_string()).chain(std::iter::once("__init__.py".to_string())).collect()
    } else if let Some((last, rest)) = parts.split_last() {
        rest.iter().map(|s| s.to_string()).chain(std::iter::once(format!("{}.py", last))).collect()
    } else {
        return false;
    };
    if path_parts.len() < module_parts.len() {
        return false;
    }
    path_parts[path_parts.len() - module_parts.len()..] == module_parts[..]
}

fn join_path(base: &str, rel: &str) -> String {
    if base.is_empty() {
        rel.to_string()
    } else {
        format!("{}/{}", base, rel)
    }
}

fn normalize_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

#[allow(clippy::too_many_arguments)]
fn expand_for_function<'a>(
    function: &'a FunctionRef,
    name_map: &HashMap<String, &'a FunctionRef>,
    qualified_map: &HashMap<String, &'a FunctionRef>,
    class_names: &HashSet<String>,
    imports: &ImportMap,
    module_name_map: &HashMap<String, String>,
    module_functions: &HashMap<String, HashMap<String, &'a FunctionRef>>,
    module_qualified: &HashMap<String, HashMap<String, &'a FunctionRef>>,
    module_classes: &HashMap<String, HashSet<String>>,
    factory_map: &HashMap<String, String>,
    params: &ExpansionConfig,
) -> (String, Vec<String>) {
    let mut helpers = Vec::new();
    let mut expanded = function.code.clone();
    let mut frontier: Vec<&FunctionRef> = vec![function];
    let mut visited: HashSet<String> = HashSet::from([function.identity()]);
    let class_name = class_name_of(function);
    let local_class_map = local_class_map(
        function,
        class_names,
        factory_map,
        imports,
        module_name_map,
        module_classes,
    );

    for _ in 0..params.depth {
        let mut next_frontier = Vec::new();
        for current in &frontier {
            for call in collect_calls(&current.code) {
                let Some(helper) = resolve_call(
                    &call,
                    name_map,
                    qualified_map,
                    class_names,
                    imports,
                    module_name_map,
                    module_functions,
                    module_qualified,
                    class_name.as_deref(),
                    &local_class_map,
                ) else {
                    continue;
                };
                if visited.contains(&helper.identity()) {
                    continue;
                }
                let addition = format!("\n\n# expanded:{}\n{}", helper.qualified_name, helper.code);
                if expanded.len() + addition.len() > params.max_chars {
                    continue;
                }
                visited.insert(helper.identity());
                helpers.push(helper.qualified_name.clone());
                expanded.push_str(&addition);
                next_frontier.push(helper);
            }
        }
        frontier = next_frontier;
    }
    (expanded, helpers)
}

#[allow(clippy::too_many_arguments)]
fn resolve_call<'a>(
    call: &CallRef,
    name_map: &HashMap<String, &'a FunctionRef>,
    qualified_map: &HashMap<String, &'a FunctionRef>,
    class_names: &HashSet<String>,
    imports: &ImportMap,
    module_name_map: &HashMap<String, String>,
    module_functions: &HashMap<String, HashMap<String, &'a FunctionRef>>,
    module_qualified: &HashMap<String, HashMap<String, &'a FunctionRef>>,
    class_name: Option<&str>,
    local_class_map: &HashMap<String, (Option<String>, String)>,
) -> Option<&'a FunctionRef> {
    match call.kind {
        CallKind::Name => {
            if let Some(f) = name_map.get(&call.name) {
                return Some(*f);
            }
            if let Some((module_path, func_name)) = imports.function_aliases.get(&call.name) {
                return resolve_from_module(module_path, func_name, module_name_map, module_functions).copied();
            }
            None
        }
        CallKind::Attr => {
            let base = call.base.as_deref()?;
            if matches!(base, "self" | "cls") {
                if let Some(class_name) = class_name {
                    return qualified_map.get(&format!("{}.{}", class_name, call.name)).copied();
                }
            }
            if let Some((module_path, cls_name)) = local_class_map.get(base) {
                return match module_path {
                    None => qualified_map.get(&format!("{}.{}", cls_name, call.name)).copied(),
                    Some(module_path) => resolve_from_module(
                        module_path,
                        &format!("{}.{}", cls_name, call.name),
                        module_name_map,
                        module_qualified,
                    )
                    .copied(),
                };
            }
            if let Some(module_path) = imports.module_aliases.get(base) {
                return resolve_from_module(module_path, &call.name, module_name_map, module_functions).copied();
            }
            None
        }
        CallKind::Ctor => {
            let cls_name = call.base.clone().unwrap_or_default();
            if class_names.contains(&cls_name) {
                if let Some(f) = qualified_map.get(&format!("{}.{}", cls_name, call.name)) {
                    return Some(*f);
                }
            }
            if let Some((module_path, imported_class)) = imports.class_aliases.get(&cls_name) {
                return resolve_from_module(
                    module_path,
                    &format!("{}.{}", imported_class, call.name),
                    module_name_map,
                    module_qualified,
                )
                .copied();
            }
            None
        }
    }
}

fn local_class_map(
    function: &FunctionRef,
    class_names: &HashSet<String>,
    factory_map: &HashMap<String, String>,
    imports: &ImportMap,
    module_name_map: &HashMap<String, String>,
    module_classes: &HashMap<String, HashSet<String>>,
) -> HashMap<String, (Option<String>, String)> {
    let mut class_map: HashMap<String, (Option<String>, String)> = HashMap::new();
    let Some(tree) = parse_python(&function.code) else {
        return class_map;
    };
    walk_local_assignments(
        &tree.root_node(),
        &function.code,
        class_names,
        factory_map,
        imports,
        module_name_map,
        module_classes,
        &mut class_map,
    );
    class_map
}

#[allow(clippy::too_many_arguments)]
fn walk_local_assignments(
    node: &Node,
    source: &str,
    class_names: &HashSet<String>,
    factory_map: &HashMap<String, String>,
    imports: &ImportMap,
    module_name_map: &HashMap<String, String>,
    module_classes: &HashMap<String, HashSet<String>>,
    class_map: &mut HashMap<String, (Option<String>, String)>,
) {
    if node.kind() == "assignment" {
        if let Some(left) = node.child_by_field_name("left") {
            if left.kind() == "identifier" {
                if let Some(target) = node_text(&left, source) {
                    if let Some(type_node) = node.child_by_field_name("type") {
                        if let Some(resolved) = resolve_annotation_class(&type_node, source, imports) {
                            class_map.insert(target.clone(), resolved);
                        }
                    } else if let Some(right) = node.child_by_field_name("right") {
                        if let Some(resolved) = resolve_value_class(
                            &right,
                            source,
                            class_names,
                            factory_map,
                            imports,
                            module_name_map,
                            module_classes,
                        ) {
                            class_map.insert(target.clone(), resolved);
                        } else if right.kind() == "identifier" {
                            if let Some(rhs_name) = node_text(&right, source) {
                                if let Some(existing) = class_map.get(&rhs_name).cloned() {
                                    class_map.insert(target, existing);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_local_assignments(
            &child,
            source,
            class_names,
            factory_map,
            imports,
            module_name_map,
            module_classes,
            class_map,
        );
    }
}

fn resolve_value_class(
    node: &Node,
    source: &str,
    class_names: &HashSet<String>,
    factory_map: &HashMap<String, String>,
    imports: &ImportMap,
    module_name_map: &HashMap<String, String>,
    module_classes: &HashMap<String, HashSet<String>>,
) -> Option<(Option<String>, String)> {
    if node.kind() != "call" {
        return None;
    }
    let func = node.child_by_field_name("function")?;
    match func.kind() {
        "identifier" => {
            let name = node_text(&func, source)?;
            if class_names.contains(&name) {
                return Some((None, name));
            }
            if let Some((module_path, imported_class)) = imports.class_aliases.get(&name) {
                if class_exists_in_module(module_path, imported_class, module_name_map, module_classes) {
                    return Some((Some(module_path.clone()), imported_class.clone()));
                }
                return None;
            }
            if let Some(cls) = factory_map.get(&name) {
                return Some((None, cls.clone()));
            }
            None
        }
        "attribute" => {
            let base = func.child_by_field_name("object")?;
            if base.kind() != "identifier" {
                return None;
            }
            let base_name = node_text(&base, source)?;
            let module_path = imports.module_aliases.get(&base_name)?;
            let attr_name = node_text(&func.child_by_field_name("attribute")?, source)?;
            // factory functions in the aliased module are resolved lazily by
            // the caller via module_factories; here we only know the local
            // file's factory_map, so cross-module factory inference for
            // `module.factory()` is intentionally not attempted.
            let _ = (module_path, attr_name);
            None
        }
        _ => None,
    }
}

fn resolve_annotation_class(node: &Node, source: &str, imports: &ImportMap) -> Option<(Option<String>, String)> {
    match node.kind() {
        "identifier" => {
            let name = node_text(node, source)?;
            if let Some((module_path, imported_class)) = imports.class_aliases.get(&name) {
                Some((Some(module_path.clone()), imported_class.clone()))
            } else {
                Some((None, name))
            }
        }
        "attribute" => {
            let base = node.child_by_field_name("object")?;
            let attr = node_text(&node.child_by_field_name("attribute")?, source)?;
            if base.kind() == "identifier" {
                let base_name = node_text(&base, source)?;
                if let Some(module_path) = imports.module_aliases.get(&base_name) {
                    return Some((Some(module_path.clone()), attr));
                }
            }
            Some((None, attr))
        }
        _ => None,
    }
}

fn parse_python(source: &str) -> Option<tree_sitter::Tree> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_python::LANGUAGE.into()).ok()?;
    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        return None;
    }
    Some(tree)
}

fn node_text(node: &Node, source: &str) -> Option<String> {
    node.utf8_text(source.as_bytes()).ok().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{FileRef, Language};

    fn fn_ref(path: &str, qualified_name: &str, code: &str) -> FunctionRef {
        FunctionRef {
            file: FileRef {
                path: path.to_string(),
                content_hash: "h".to_string(),
                language: Language::Python,
            },
            qualified_name: qualified_name.to_string(),
            start_line: 1,
            end_line: code.lines().count().max(1),
            code_hash: hash_text(code),
            code: code.to_string(),
        }
    }

    #[test]
    fn expands_same_file_name_call() {
        let helper = fn_ref("a.py", "helper", "def helper():\n    return 1\n");
        let caller = fn_ref("a.py", "caller", "def caller():\n    return helper()\n");
        let functions = vec![helper, caller];
        let mut sources = HashMap::new();
        sources.insert("a.py".to_string(), String::new());
        let params = ExpansionConfig {
            enabled: true,
            depth: 1,
            max_chars: 4000,
        };
        let snippets = expand_calls(&functions, &sources, &params);
        let caller_snippet = snippets.iter().find(|s| s.function.qualified_name == "caller");
        assert!(caller_snippet.is_some());
        assert!(caller_snippet.unwrap().text.contains("expanded"));
    }

    #[test]
    fn resolves_self_method_call() {
        let method_a = fn_ref("a.py", "Foo.a", "def a(self):\n    return self.b()\n");
        let method_b = fn_ref("a.py", "Foo.b", "def b(self):\n    return 2\n");
        let functions = vec![method_a, method_b];
        let mut sources = HashMap::new();
        sources.insert("a.py".to_string(), String::new());
        let params = ExpansionConfig {
            enabled: true,
            depth: 1,
            max_chars: 4000,
        };
        let snippets = expand_calls(&functions, &sources, &params);
        let a_snippet = snippets.iter().find(|s| s.function.qualified_name == "Foo.a").unwrap();
        assert!(a_snippet.text.contains("expanded:Foo.b"));
    }

    #[test]
    fn disabled_expansion_yields_nothing() {
        let functions = vec![fn_ref("a.py", "f", "def f():\n    return 1\n")];
        let sources = HashMap::new();
        let params = ExpansionConfig {
            enabled: false,
            depth: 1,
            max_chars: 4000,
        };
        assert!(expand_calls(&functions, &sources, &params).is_empty());
    }

    #[test]
    fn collect_calls_is_ordered_by_first_occurrence() {
        let source = "def caller():\n    third()\n    first()\n    second()\n    first()\n";
        let calls = collect_calls(source);
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[test]
    fn call_expansion_order_is_stable_across_repeated_runs() {
        let helper_first = fn_ref("a.py", "first", "def first():\n    return 1\n");
        let helper_second = fn_ref("a.py", "second", "def second():\n    return 2\n");
        let caller = fn_ref(
            "a.py",
            "caller",
            "def caller():\n    second()\n    first()\n    return first() + second()\n",
        );
        let functions = vec![helper_first, helper_second, caller];
        let mut sources = HashMap::new();
        sources.insert("a.py".to_string(), String::new());
        let params = ExpansionConfig {
            enabled: true,
            depth: 1,
            max_chars: 4000,
        };
        let first_run = expand_calls(&functions, &sources, &params);
        for _ in 0..20 {
            let repeat_run = expand_calls(&functions, &sources, &params);
            assert_eq!(first_run, repeat_run);
        }
    }
}
