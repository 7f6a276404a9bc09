use log::debug;
use std::collections::HashSet;

use oxidep_core::MinimalDependencyTree;

fn followed_ids<'a>(tree: &'a MinimalDependencyTree, node: &str, ignore_type_imports: bool) -> Vec<&'a str> {
    tree.get(node)
        .map(|deps| {
            deps.iter()
                .filter(|d| !(ignore_type_imports && d.import_kind.is_type_only()))
                .filter_map(|d| d.project_file())
                .filter(|id| !id.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Import cycles found by a depth-first walk over `sorted_files`.
///
/// Each cycle starts and ends with the same file. Identical cycles are reported once.
pub fn find_circular_dependencies(
    tree: &MinimalDependencyTree,
    sorted_files: &[String],
    ignore_type_imports: bool,
) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = Vec::with_capacity(64);

    for start in sorted_files {
        let start = start.as_str();
        if visited.contains(start) {
            continue;
        }

        // (node, its dependencies, next dependency to look at)
        let mut stack: Vec<(&str, Vec<&str>, usize)> = Vec::new();
        visited.insert(start);
        on_stack.insert(start);
        path.push(start);
        stack.push((start, followed_ids(tree, start, ignore_type_imports), 0));

        while let Some((node, deps, next)) = stack.last_mut() {
            let Some(&dep) = deps.get(*next) else {
                on_stack.remove(*node);
                path.pop();
                stack.pop();
                continue;
            };
            *next += 1;

            if on_stack.contains(dep) {
                if let Some(cycle_start) = path.iter().rposition(|p| *p == dep) {
                    let mut cycle: Vec<String> = path[cycle_start..].iter().map(|p| p.to_string()).collect();
                    cycle.push(dep.to_string());
                    cycles.push(cycle);
                }
                continue;
            }

            if visited.insert(dep) {
                on_stack.insert(dep);
                path.push(dep);
                stack.push((dep, followed_ids(tree, dep, ignore_type_imports), 0));
            }
        }
    }

    let mut seen = HashSet::new();
    cycles.retain(|cycle| seen.insert(cycle.join(",")));
    debug!("Found {} circular dependencies", cycles.len());
    cycles
}
