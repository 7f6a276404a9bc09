use log::debug;
use serde::Serialize;
use std::collections::HashSet;

use oxidep_core::{
    GlobMatcher, MinimalDependencyTree, create_glob_matchers, create_module_matchers, get_node_module_name,
    matches_any,
};

use crate::graph::{DependencyGraph, build_graph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestrictedImportKind {
    File,
    Module,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictedImportViolation {
    pub violation_type: RestrictedImportKind,
    pub importer_file: String,
    pub entry_point: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_request: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RestrictedImportsOptions {
    /// Globs relative to the rule root; the graph is walked from matching files.
    pub entry_points: Vec<String>,
    /// Globs of files that must not be reachable.
    pub deny_files: Vec<String>,
    /// Module name globs, matched against the package name and the full request.
    pub deny_modules: Vec<String>,
    /// Files, module names or requests exempt from both deny lists.
    pub ignore_matches: Vec<String>,
    pub ignore_type_imports: bool,
}

fn is_ignored(candidate: &str, ignore: &[GlobMatcher]) -> bool {
    !ignore.is_empty() && matches_any(candidate, ignore)
}

fn entry_point_of(graph: &DependencyGraph, file: &str) -> String {
    graph.entry_point_of(file).unwrap_or_default().to_string()
}

/// Denied files and modules reachable from the configured entry points.
pub fn find_restricted_imports(
    tree: &MinimalDependencyTree,
    options: &RestrictedImportsOptions,
    root: &str,
) -> Vec<RestrictedImportViolation> {
    if options.entry_points.is_empty() || (options.deny_files.is_empty() && options.deny_modules.is_empty()) {
        return Vec::new();
    }

    let entry_matchers = create_glob_matchers(&options.entry_points, root);
    let mut entry_points: Vec<String> =
        tree.keys().filter(|file| matches_any(file, &entry_matchers)).cloned().collect();
    if entry_points.is_empty() {
        return Vec::new();
    }
    entry_points.sort();
    let entry_set: HashSet<&str> = entry_points.iter().map(String::as_str).collect();

    let graph = build_graph(tree, &entry_points, options.ignore_type_imports);

    let deny_files = create_glob_matchers(&options.deny_files, root);
    let deny_modules = create_module_matchers(&options.deny_modules);
    let ignore = create_glob_matchers(&options.ignore_matches, root);

    let mut violations = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for file in graph.files() {
        let vertex = &graph.vertices[&file];

        if !deny_files.is_empty()
            && !entry_set.contains(file.as_str())
            && matches_any(&file, &deny_files)
            && !is_ignored(&file, &ignore)
        {
            let entry_point = entry_point_of(&graph, &file);
            if seen.insert(format!("file|{entry_point}|{file}")) {
                violations.push(RestrictedImportViolation {
                    violation_type: RestrictedImportKind::File,
                    importer_file: vertex.parents.first().cloned().unwrap_or_default(),
                    entry_point,
                    denied_file: Some(file.clone()),
                    denied_module: None,
                    import_request: None,
                });
            }
        }

        if deny_modules.is_empty() {
            continue;
        }
        for request in &vertex.module_requests {
            let module = get_node_module_name(request);
            if module.is_empty() || module.starts_with('.') {
                continue;
            }
            if !deny_modules.iter().any(|m| m.is_match(module) || m.is_match(request)) {
                continue;
            }
            if is_ignored(module, &ignore) || is_ignored(request, &ignore) {
                continue;
            }
            let entry_point = entry_point_of(&graph, &file);
            if seen.insert(format!("module|{entry_point}|{request}")) {
                violations.push(RestrictedImportViolation {
                    violation_type: RestrictedImportKind::Module,
                    importer_file: file.clone(),
                    entry_point,
                    denied_file: None,
                    denied_module: Some(module.to_string()),
                    import_request: Some(request.clone()),
                });
            }
        }
    }

    violations.sort_by(|a, b| {
        a.violation_type
            .cmp(&b.violation_type)
            .then_with(|| a.importer_file.cmp(&b.importer_file))
            .then_with(|| a.denied_file.cmp(&b.denied_file))
            .then_with(|| a.denied_module.cmp(&b.denied_module))
            .then_with(|| a.import_request.cmp(&b.import_request))
    });
    debug!("Found {} restricted imports", violations.len());
    violations
}
