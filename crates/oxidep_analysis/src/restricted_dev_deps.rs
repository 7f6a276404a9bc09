use serde::Serialize;
use std::collections::HashSet;

use oxidep_core::{MinimalDependencyTree, create_glob_matchers, get_node_module_name, matches_any};

use crate::graph::build_graph;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevDependencyUsage {
    pub dev_dependency: String,
    pub file_path: String,
    pub entry_point: String,
}

/// `devDependencies` imported at runtime by files reachable from production entry points.
///
/// Type-only imports are erased at build time and never count. Results are sorted by file,
/// then dependency.
pub fn find_dev_dependencies_in_production(
    tree: &MinimalDependencyTree,
    prod_entry_points: &[String],
    dev_dependencies: &HashSet<String>,
    ignore_type_imports: bool,
    root: &str,
) -> Vec<DevDependencyUsage> {
    if prod_entry_points.is_empty() || dev_dependencies.is_empty() {
        return Vec::new();
    }

    let matchers = create_glob_matchers(prod_entry_points, root);
    let mut entries: Vec<String> = tree.keys().filter(|file| matches_any(file, &matchers)).cloned().collect();
    entries.sort();

    let graph = build_graph(tree, &entries, ignore_type_imports);

    let mut usages = Vec::new();
    for file in graph.files() {
        let Some(deps) = tree.get(&file) else {
            continue;
        };
        let mut reported: HashSet<&str> = HashSet::new();
        for dep in deps {
            if dep.import_kind.is_type_only() {
                continue;
            }
            let module = get_node_module_name(&dep.request);
            if module.is_empty() || !dev_dependencies.contains(module) || !reported.insert(module) {
                continue;
            }
            usages.push(DevDependencyUsage {
                dev_dependency: module.to_string(),
                file_path: file.clone(),
                entry_point: graph.entry_point_of(&file).unwrap_or_default().to_string(),
            });
        }
    }

    usages.sort_by(|a, b| a.file_path.cmp(&b.file_path).then_with(|| a.dev_dependency.cmp(&b.dev_dependency)));
    usages
}
