use std::collections::HashSet;

use oxidep_core::{MinimalDependencyTree, create_glob_matchers, matches_any};

/// Files of `tree` that no record points at, sorted.
///
/// `include` keeps only matching files when non-empty; `exclude` drops matches. Both are globs
/// relative to `root`.
pub fn get_entry_points(
    tree: &MinimalDependencyTree,
    include: &[String],
    exclude: &[String],
    root: &str,
) -> Vec<String> {
    let referenced: HashSet<&str> =
        tree.values().flatten().filter_map(|dep| dep.id.as_deref()).collect();

    let include = create_glob_matchers(include, root);
    let exclude = create_glob_matchers(exclude, root);

    let mut entry_points: Vec<String> = tree
        .keys()
        .filter(|file| !referenced.contains(file.as_str()))
        .filter(|file| include.is_empty() || matches_any(file, &include))
        .filter(|file| !matches_any(file, &exclude))
        .cloned()
        .collect();
    entry_points.sort();
    entry_points
}
