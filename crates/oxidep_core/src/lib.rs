//! Core pipeline of oxidep, a dependency analyzer for JavaScript/TypeScript projects.
//!
//! The pipeline discovers source files, extracts import/export records with a byte-level
//! scanner, resolves every specifier (relative paths, package.json `imports`, tsconfig
//! `paths`, workspace packages) and produces a [`MinimalDependencyTree`] for the analyses.

mod config;
mod constants;
mod discovery;
mod glob;
mod jsonc;
mod monorepo;
mod package_json;
mod parser;
mod paths;
mod pattern;
mod resolver;
mod tree;
mod tsconfig;
mod types;

// Re-export public API
pub use config::{AnalyzeOptions, FollowMonorepoPackages, analyze, load_root_params};
pub use constants::{
    ASSET_EXTENSIONS, DEFAULT_CONDITION_NAMES, is_asset_path, is_builtin_module, split_source_extension,
};
pub use discovery::{discover_files, get_files, gitignore_matchers_up_to_repo_root};
pub use glob::{GlobMatcher, create_glob_matchers, create_module_matchers, matches_any};
pub use jsonc::{parse_jsonc, read_jsonc, strip_jsonc};
pub use monorepo::{MonorepoContext, detect_monorepo};
pub use package_json::{PackageJsonConfig, PackageJsonExports, PackageJsonImports, get_node_module_name};
pub use parser::{parse_imports, parse_imports_from_files};
pub use paths::{
    display_path, is_within_dir, join_path, normalize_path, parent_dir, relative_to,
    resolve_absolute_cwd, to_os_path,
};
pub use pattern::WildcardPattern;
pub use resolver::{
    FileIndex, ModuleResolver, ResolutionError, Resolved, ResolverManager, RootParams, is_relative_request,
};
pub use tree::{DependencyTree, TreeBuilder, build_dependency_tree};
pub use tsconfig::{TsConfigParsed, load_tsconfig};
pub use types::{
    ExportLocation, FileImports, Import, ImportKind, KeywordInfo, MinimalDependency,
    MinimalDependencyTree, ParseMode, ResolvedKind, to_minimal_dependency_tree,
};
