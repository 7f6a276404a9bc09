use serde::Serialize;
use std::collections::{HashMap, HashSet};

use oxidep_core::{
    MinimalDependencyTree, ResolvedKind, create_glob_matchers, get_node_module_name, matches_any,
    normalize_path, relative_to,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedImport {
    pub file_path: String,
    pub request: String,
}

#[derive(Debug, Clone, Default)]
pub struct UnresolvedImportsOptions {
    /// Relative file path -> request ignored in that file.
    pub ignore: HashMap<String, String>,
    /// Globs of files whose unresolved imports are not reported.
    pub ignore_files: Vec<String>,
    /// Requests ignored everywhere.
    pub ignore_imports: Vec<String>,
}

/// Unresolved, non-empty requests in path order, skipping packages named in `declared_modules`.
pub fn detect_unresolved_imports(
    tree: &MinimalDependencyTree,
    declared_modules: &HashSet<String>,
) -> Vec<UnresolvedImport> {
    let mut files: Vec<&String> = tree.keys().collect();
    files.sort();

    let mut unresolved = Vec::new();
    for file in files {
        for dep in &tree[file] {
            if dep.resolved_type == ResolvedKind::NotResolvedModule
                && !dep.request.is_empty()
                && !declared_modules.contains(get_node_module_name(&dep.request))
            {
                unresolved.push(UnresolvedImport { file_path: file.clone(), request: dep.request.clone() });
            }
        }
    }
    unresolved
}

fn normalize_for_matching(path: &str) -> String {
    let normalized = normalize_path(path.trim());
    normalized.strip_prefix("./").unwrap_or(&normalized).to_string()
}

pub fn filter_unresolved_imports(
    unresolved: Vec<UnresolvedImport>,
    options: &UnresolvedImportsOptions,
    root: &str,
) -> Vec<UnresolvedImport> {
    let ignore_files = create_glob_matchers(&options.ignore_files, root);
    let ignore_imports: HashSet<&str> = options.ignore_imports.iter().map(String::as_str).collect();

    let mut ignored_by_file: HashMap<String, HashSet<&str>> = HashMap::new();
    for (file, request) in &options.ignore {
        ignored_by_file.entry(normalize_for_matching(file)).or_default().insert(request.as_str());
    }

    unresolved
        .into_iter()
        .filter(|u| !ignore_imports.contains(u.request.as_str()))
        .filter(|u| !matches_any(&u.file_path, &ignore_files))
        .filter(|u| {
            let relative = normalize_for_matching(&relative_to(&u.file_path, root));
            !ignored_by_file.get(&relative).is_some_and(|reqs| reqs.contains(u.request.as_str()))
        })
        .collect()
}
