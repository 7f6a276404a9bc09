//! Analyses over the dependency tree built by `oxidep_core`.
//!
//! Every check takes a [`MinimalDependencyTree`](oxidep_core::MinimalDependencyTree) (usually
//! the sub-tree of one config rule) and returns plain, sorted results. Checks that can repair
//! the sources attach a [`Change`] which [`apply_file_changes`] writes back to disk.
//!
//! ```no_run
//! use oxidep_analysis::find_circular_dependencies;
//! use oxidep_core::{AnalyzeOptions, analyze};
//!
//! # fn main() -> anyhow::Result<()> {
//! let tree = analyze("/path/to/project", &AnalyzeOptions::default())?;
//! for cycle in find_circular_dependencies(&tree.tree, &tree.files, true) {
//!     println!("{}", cycle.join(" -> "));
//! }
//! # Ok(())
//! # }
//! ```

mod cycles;
mod entry_points;
mod graph;
mod import_conventions;
mod module_boundaries;
mod node_modules;
mod orphans;
mod restricted_dev_deps;
mod restricted_imports;
mod source_modifier;
mod unresolved;
mod unused_exports;

// Re-export public API
pub use cycles::find_circular_dependencies;
pub use entry_points::get_entry_points;
pub use graph::{DependencyGraph, GraphNode, MAX_RESOLVED_PATHS, build_graph, files_reachable_from, resolve_paths};
pub use import_conventions::{
    AliasSources, CompiledDomain, ImportConventionDomain, ImportConventionViolation,
    ImportConventionViolationKind, check_import_conventions, compile_domains, is_relative_import,
};
pub use module_boundaries::{BoundaryRule, BoundaryViolation, BoundaryViolationKind, check_module_boundaries};
pub use node_modules::{
    ModuleFilter, ModuleUsages, UsedNodeModulesOptions, find_node_module_binaries, get_missing_node_modules,
    get_unused_node_modules, get_used_node_modules, used_node_module_names,
};
pub use orphans::{OrphanFilesOptions, find_orphan_files};
pub use restricted_dev_deps::{DevDependencyUsage, find_dev_dependencies_in_production};
pub use restricted_imports::{
    RestrictedImportKind, RestrictedImportViolation, RestrictedImportsOptions, find_restricted_imports,
};
pub use source_modifier::{Change, apply_changes_to_bytes, apply_changes_to_content, apply_file_changes};
pub use unresolved::{UnresolvedImport, UnresolvedImportsOptions, detect_unresolved_imports, filter_unresolved_imports};
pub use unused_exports::{UnusedExport, UnusedExportsOptions, find_unused_exports};
