use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;

use crate::{
    constants::DEFAULT_CONDITION_NAMES,
    discovery::{get_files, gitignore_matchers_up_to_repo_root},
    glob::create_glob_matchers,
    package_json::PackageJsonConfig,
    paths::{join_path, to_os_path},
    resolver::{ResolverManager, RootParams},
    tree::{DependencyTree, build_dependency_tree},
    tsconfig::TsConfigParsed,
    types::ParseMode,
};

/// Which workspace packages the resolver may walk into.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FollowMonorepoPackages {
    All,
    #[default]
    None,
    Packages(HashSet<String>),
}

impl FollowMonorepoPackages {
    pub fn is_enabled(&self) -> bool {
        match self {
            FollowMonorepoPackages::All => true,
            FollowMonorepoPackages::None => false,
            FollowMonorepoPackages::Packages(names) => !names.is_empty(),
        }
    }

    pub fn follows(&self, package_name: &str) -> bool {
        match self {
            FollowMonorepoPackages::All => true,
            FollowMonorepoPackages::None => false,
            FollowMonorepoPackages::Packages(names) => names.contains(package_name),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub ignore_type_imports: bool,
    /// Globs relative to the working directory. Matching files are neither analyzed nor followed.
    pub exclude_files: Vec<String>,
    /// Extra files analyzed even when discovery skips them, relative to the working directory.
    pub entry_points: Vec<String>,
    /// Overrides `<cwd>/package.json`.
    pub package_json_path: Option<String>,
    /// Overrides `<cwd>/tsconfig.json`. A named file that cannot be loaded is an error.
    pub tsconfig_json_path: Option<String>,
    pub condition_names: Vec<String>,
    pub follow_monorepo_packages: FollowMonorepoPackages,
    pub parse_mode: ParseMode,
}

impl AnalyzeOptions {
    /// Configured condition names, or the defaults when none are given.
    pub fn effective_condition_names(&self) -> Vec<String> {
        if self.condition_names.is_empty() {
            DEFAULT_CONDITION_NAMES.iter().map(|s| s.to_string()).collect()
        } else {
            self.condition_names.clone()
        }
    }
}

/// Read the manifests of `cwd` for the root resolver.
pub fn load_root_params(
    cwd: &str,
    package_json_path: Option<&str>,
    tsconfig_json_path: Option<&str>,
) -> Result<RootParams> {
    let tsconfig = match tsconfig_json_path {
        Some(explicit) => {
            let path = join_path(cwd, explicit);
            TsConfigParsed::load(&to_os_path(&path))
                .with_context(|| format!("Failed to load tsconfig '{}'", explicit))?
        }
        None => {
            let path = to_os_path(&join_path(cwd, "tsconfig.json"));
            if path.is_file() {
                TsConfigParsed::load(&path).unwrap_or_else(|e| {
                    warn!("Error when parsing tsconfig: {:#}", e);
                    TsConfigParsed::default()
                })
            } else {
                TsConfigParsed::default()
            }
        }
    };

    let package_json_file = join_path(cwd, package_json_path.unwrap_or("package.json"));
    let package_json = PackageJsonConfig::load(&to_os_path(&package_json_file)).unwrap_or_else(|e| {
        debug!("No package.json at {}: {:#}", package_json_file, e);
        PackageJsonConfig::default()
    });

    Ok(RootParams { cwd: cwd.to_string(), tsconfig, package_json })
}

/// Discover, parse and resolve every file under `cwd` into a dependency tree.
pub fn analyze(cwd: &str, options: &AnalyzeOptions) -> Result<DependencyTree> {
    info!("Analyzing {}", cwd);
    let exclude = create_glob_matchers(&options.exclude_files, cwd);

    let mut ignore = exclude.clone();
    ignore.extend(gitignore_matchers_up_to_repo_root(cwd));
    let mut files = get_files(cwd, ignore)?;

    for entry in &options.entry_points {
        let path = join_path(cwd, entry);
        if !files.contains(&path) {
            files.push(path);
        }
    }
    files.sort();

    let root_params = load_root_params(
        cwd,
        options.package_json_path.as_deref(),
        options.tsconfig_json_path.as_deref(),
    )?;
    let manager = ResolverManager::new(
        root_params,
        &files,
        options.follow_monorepo_packages.clone(),
        options.effective_condition_names(),
        &exclude,
    );

    let tree = build_dependency_tree(
        files,
        manager,
        &exclude,
        options.ignore_type_imports,
        options.parse_mode,
    );
    if tree.read_failures > 0 {
        warn!("{} files could not be read", tree.read_failures);
    }
    Ok(tree)
}
