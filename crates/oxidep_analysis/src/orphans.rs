use log::debug;
use std::collections::HashSet;

use oxidep_core::{MinimalDependencyTree, create_glob_matchers, matches_any};

#[derive(Debug, Clone, Default)]
pub struct OrphanFilesOptions {
    /// Globs relative to the rule root for files allowed to have no importer.
    pub valid_entry_points: Vec<String>,
    /// Globs of files that are never reported and whose imports do not count.
    pub graph_exclude: Vec<String>,
    pub ignore_type_imports: bool,
}

/// Files of `tree` no other file imports, sorted.
pub fn find_orphan_files(
    tree: &MinimalDependencyTree,
    options: &OrphanFilesOptions,
    root: &str,
    module_suffix_variants: &HashSet<String>,
) -> Vec<String> {
    let entry_points = create_glob_matchers(&options.valid_entry_points, root);
    let graph_exclude = create_glob_matchers(&options.graph_exclude, root);

    let mut referenced: HashSet<&str> = HashSet::new();
    for (file, deps) in tree {
        if matches_any(file, &graph_exclude) {
            continue;
        }
        for dep in deps {
            if options.ignore_type_imports && dep.import_kind.is_type_only() {
                continue;
            }
            let Some(id) = dep.id.as_deref() else {
                continue;
            };
            if tree.contains_key(id) && !matches_any(id, &graph_exclude) {
                referenced.insert(id);
            }
        }
    }

    let mut orphans: Vec<String> = tree
        .keys()
        .filter(|file| !matches_any(file, &graph_exclude))
        .filter(|file| !referenced.contains(file.as_str()))
        .filter(|file| !matches_any(file, &entry_points))
        .filter(|file| !module_suffix_variants.contains(*file))
        .cloned()
        .collect();
    orphans.sort();
    debug!("Found {} orphan files", orphans.len());
    orphans
}
