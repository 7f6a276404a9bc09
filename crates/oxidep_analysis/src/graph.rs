//! Dependency graph materialized from entry points, with parent links for walking back up.

use log::{debug, trace, warn};
use std::collections::{HashMap, HashSet};

use oxidep_core::{MinimalDependency, MinimalDependencyTree};

/// Enumerating every path in a dense graph is exponential; stop after this many.
pub const MAX_RESOLVED_PATHS: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphNode {
    pub path: String,
    /// Project files imported by this node.
    pub children: Vec<String>,
    /// Importers, in the order they reached this node. The first one created it.
    pub parents: Vec<String>,
    /// Requests of records that do not point at a project file.
    pub module_requests: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub vertices: HashMap<String, GraphNode>,
}

fn followed_children(deps: &[MinimalDependency], ignore_type_imports: bool) -> Vec<String> {
    deps.iter()
        .filter(|d| !(ignore_type_imports && d.import_kind.is_type_only()))
        .filter_map(|d| d.project_file())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

struct Frame {
    node: GraphNode,
    pending: Vec<String>,
    next: usize,
}

impl Frame {
    fn new(path: &str, parent: Option<&str>, deps: &[MinimalDependency], ignore_type_imports: bool) -> Self {
        let module_requests = deps
            .iter()
            .filter(|d| d.project_file().is_none() && !d.request.is_empty())
            .map(|d| d.request.clone())
            .collect();
        Frame {
            node: GraphNode {
                path: path.to_string(),
                children: Vec::new(),
                parents: parent.map(str::to_string).into_iter().collect(),
                module_requests,
            },
            pending: followed_children(deps, ignore_type_imports),
            next: 0,
        }
    }
}

/// Depth-first materialization from each entry point.
///
/// Reaching an already materialized node only records the extra parent. Edges back into the
/// current branch are dropped so the walk terminates on cycles.
pub fn build_graph(
    tree: &MinimalDependencyTree,
    entry_points: &[String],
    ignore_type_imports: bool,
) -> DependencyGraph {
    let mut graph = DependencyGraph::default();
    let mut in_progress: HashSet<String> = HashSet::new();

    for entry in entry_points {
        if graph.vertices.contains_key(entry) {
            continue;
        }
        let Some(deps) = tree.get(entry) else {
            trace!("Entry point {} is not in the tree", entry);
            continue;
        };

        in_progress.insert(entry.clone());
        let mut stack = vec![Frame::new(entry, None, deps, ignore_type_imports)];

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.pending.len() {
                if let Some(done) = stack.pop() {
                    in_progress.remove(&done.node.path);
                    graph.vertices.insert(done.node.path.clone(), done.node);
                }
                continue;
            }

            let child = frame.pending[frame.next].clone();
            frame.next += 1;

            if let Some(existing) = graph.vertices.get_mut(&child) {
                existing.parents.push(frame.node.path.clone());
                frame.node.children.push(child);
                continue;
            }
            if in_progress.contains(&child) {
                continue;
            }
            let Some(child_deps) = tree.get(&child) else {
                trace!("Dependency {} of {} is not in the tree", child, frame.node.path);
                continue;
            };

            frame.node.children.push(child.clone());
            let next = Frame::new(&child, Some(&frame.node.path), child_deps, ignore_type_imports);
            in_progress.insert(child);
            stack.push(next);
        }
    }

    debug!("Graph built from {} entry points with {} vertices", entry_points.len(), graph.vertices.len());
    graph
}

impl DependencyGraph {
    pub fn contains(&self, path: &str) -> bool {
        self.vertices.contains_key(path)
    }

    /// Materialized files, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.vertices.keys().cloned().collect();
        files.sort();
        files
    }

    /// Entry point reached by following first parents up from `path`.
    pub fn entry_point_of(&self, path: &str) -> Option<&str> {
        let mut current = self.vertices.get(path)?;
        while let Some(parent) = current.parents.first() {
            current = self.vertices.get(parent)?;
        }
        Some(current.path.as_str())
    }

    /// Import chains from an entry point down to `target`, entry point first.
    ///
    /// Without `all` only the first-parent chain is returned. A target that is itself an
    /// entry point with no importers yields nothing.
    pub fn resolve_paths_to_root(&self, target: &str, all: bool) -> Vec<Vec<String>> {
        let Some(node) = self.vertices.get(target) else {
            return Vec::new();
        };
        let mut paths = self.paths_from(node, all, vec![Vec::new()]);
        for path in &mut paths {
            path.reverse();
        }
        paths
    }

    fn paths_from(&self, node: &GraphNode, all: bool, resolved: Vec<Vec<String>>) -> Vec<Vec<String>> {
        let extended: Vec<Vec<String>> = resolved
            .into_iter()
            .map(|mut path| {
                path.push(node.path.clone());
                path
            })
            .collect();

        if node.parents.is_empty() {
            if extended.len() == 1 && extended[0].len() == 1 {
                return Vec::new();
            }
            return extended;
        }

        if !all {
            return match self.vertices.get(&node.parents[0]) {
                Some(parent) => self.paths_from(parent, false, extended),
                None => extended,
            };
        }

        let mut collected = Vec::new();
        for parent in &node.parents {
            let Some(parent) = self.vertices.get(parent) else {
                continue;
            };
            collected.extend(self.paths_from(parent, true, extended.clone()));
            if collected.len() > MAX_RESOLVED_PATHS {
                warn!("Stopped resolving paths to {} after {} paths", node.path, MAX_RESOLVED_PATHS);
                break;
            }
        }
        collected
    }
}

/// Files reachable from `entry_point`, sorted, the entry point included.
pub fn files_reachable_from(
    tree: &MinimalDependencyTree,
    entry_point: &str,
    ignore_type_imports: bool,
) -> Vec<String> {
    build_graph(tree, &[entry_point.to_string()], ignore_type_imports).files()
}

/// Chains from each entry point that reaches `target`, entry points processed in order.
pub fn resolve_paths(
    tree: &MinimalDependencyTree,
    entry_points: &[String],
    target: &str,
    all: bool,
    ignore_type_imports: bool,
) -> Vec<Vec<String>> {
    let mut result = Vec::new();
    for entry in entry_points {
        let graph = build_graph(tree, std::slice::from_ref(entry), ignore_type_imports);
        if graph.contains(target) {
            result.extend(graph.resolve_paths_to_root(target, all));
        }
    }
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    use oxidep_core::{ImportKind, MinimalDependency, MinimalDependencyTree, ResolvedKind};

    pub(crate) fn user_dep(id: &str) -> MinimalDependency {
        MinimalDependency {
            id: Some(id.to_string()),
            request: format!("./{}", id.trim_start_matches('/')),
            resolved_type: ResolvedKind::UserModule,
            ..Default::default()
        }
    }

    pub(crate) fn type_dep(id: &str) -> MinimalDependency {
        MinimalDependency { import_kind: ImportKind::OnlyType, ..user_dep(id) }
    }

    pub(crate) fn module_dep(request: &str, kind: ResolvedKind) -> MinimalDependency {
        let id = match kind {
            ResolvedKind::NotResolvedModule => None,
            _ => Some(request.to_string()),
        };
        MinimalDependency { id, request: request.to_string(), resolved_type: kind, ..Default::default() }
    }

    pub(crate) fn tree_of(entries: Vec<(&str, Vec<MinimalDependency>)>) -> MinimalDependencyTree {
        entries.into_iter().map(|(path, deps)| (path.to_string(), deps)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use oxidep_core::ResolvedKind;
    use pretty_assertions::assert_eq;

    fn diamond() -> MinimalDependencyTree {
        tree_of(vec![
            ("/p/index.ts", vec![user_dep("/p/a.ts"), user_dep("/p/b.ts")]),
            ("/p/a.ts", vec![user_dep("/p/shared.ts"), module_dep("react", ResolvedKind::NodeModule)]),
            ("/p/b.ts", vec![user_dep("/p/shared.ts")]),
            ("/p/shared.ts", vec![]),
        ])
    }

    #[test]
    fn test_build_graph_records_parents_and_modules() {
        let graph = build_graph(&diamond(), &["/p/index.ts".to_string()], false);

        assert_eq!(graph.vertices.len(), 4);
        assert_eq!(graph.vertices["/p/shared.ts"].parents, vec!["/p/a.ts", "/p/b.ts"]);
        assert_eq!(graph.vertices["/p/index.ts"].children, vec!["/p/a.ts", "/p/b.ts"]);
        assert_eq!(graph.vertices["/p/a.ts"].module_requests, vec!["react"]);
        assert!(graph.vertices["/p/index.ts"].parents.is_empty());
    }

    #[test]
    fn test_build_graph_terminates_on_cycles() {
        let tree = tree_of(vec![
            ("/p/a.ts", vec![user_dep("/p/b.ts")]),
            ("/p/b.ts", vec![user_dep("/p/a.ts")]),
        ]);
        let graph = build_graph(&tree, &["/p/a.ts".to_string()], false);

        assert_eq!(graph.files(), vec!["/p/a.ts", "/p/b.ts"]);
        assert!(graph.vertices["/p/a.ts"].parents.is_empty());
        assert!(graph.vertices["/p/b.ts"].children.is_empty());
    }

    #[test]
    fn test_build_graph_ignores_type_imports() {
        let tree = tree_of(vec![
            ("/p/a.ts", vec![type_dep("/p/types.ts"), user_dep("/p/b.ts")]),
            ("/p/b.ts", vec![]),
            ("/p/types.ts", vec![]),
        ]);
        let graph = build_graph(&tree, &["/p/a.ts".to_string()], true);
        assert_eq!(graph.files(), vec!["/p/a.ts", "/p/b.ts"]);
    }

    #[test]
    fn test_resolve_paths_to_root() {
        let graph = build_graph(&diamond(), &["/p/index.ts".to_string()], false);

        assert_eq!(
            graph.resolve_paths_to_root("/p/shared.ts", false),
            vec![vec!["/p/index.ts", "/p/a.ts", "/p/shared.ts"]]
        );
        assert_eq!(
            graph.resolve_paths_to_root("/p/shared.ts", true),
            vec![
                vec!["/p/index.ts", "/p/a.ts", "/p/shared.ts"],
                vec!["/p/index.ts", "/p/b.ts", "/p/shared.ts"],
            ]
        );
        assert!(graph.resolve_paths_to_root("/p/index.ts", true).is_empty());
        assert!(graph.resolve_paths_to_root("/p/missing.ts", true).is_empty());
    }

    #[test]
    fn test_entry_point_of_follows_first_parent() {
        let tree = tree_of(vec![
            ("/p/main.ts", vec![user_dep("/p/lib.ts")]),
            ("/p/worker.ts", vec![user_dep("/p/lib.ts")]),
            ("/p/lib.ts", vec![]),
        ]);
        let graph = build_graph(&tree, &["/p/main.ts".to_string(), "/p/worker.ts".to_string()], false);

        assert_eq!(graph.entry_point_of("/p/lib.ts"), Some("/p/main.ts"));
        assert_eq!(graph.entry_point_of("/p/worker.ts"), Some("/p/worker.ts"));
        assert_eq!(graph.entry_point_of("/p/nope.ts"), None);
    }

    #[test]
    fn test_resolve_paths_across_entry_points() {
        let tree = tree_of(vec![
            ("/p/main.ts", vec![user_dep("/p/lib.ts")]),
            ("/p/worker.ts", vec![user_dep("/p/lib.ts")]),
            ("/p/other.ts", vec![]),
            ("/p/lib.ts", vec![]),
        ]);
        let entries = vec!["/p/main.ts".to_string(), "/p/other.ts".to_string(), "/p/worker.ts".to_string()];

        assert_eq!(
            resolve_paths(&tree, &entries, "/p/lib.ts", false, false),
            vec![vec!["/p/main.ts", "/p/lib.ts"], vec!["/p/worker.ts", "/p/lib.ts"]]
        );
        assert_eq!(files_reachable_from(&tree, "/p/main.ts", false), vec!["/p/lib.ts", "/p/main.ts"]);
    }
}
