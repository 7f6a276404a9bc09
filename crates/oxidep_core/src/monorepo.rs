//! Workspace detection (npm/yarn/bun `workspaces`, `pnpm-workspace.yaml`) and the package
//! registry used for cross-package resolution.

use dashmap::DashMap;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::{debug, trace, warn};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    constants::SKIPPED_WORKSPACE_DIRS,
    glob::{GlobMatcher, matches_any},
    package_json::{PackageJsonConfig, PackageJsonExports},
    paths::{normalize_path, relative_to, to_os_path},
};

#[derive(Debug, Default, Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

fn read_pnpm_patterns(dir: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(dir.join("pnpm-workspace.yaml")).ok()?;
    match serde_yaml::from_str::<PnpmWorkspace>(&content) {
        Ok(ws) => Some(ws.packages),
        Err(e) => {
            warn!("Failed to parse {}: {}", dir.join("pnpm-workspace.yaml").display(), e);
            None
        }
    }
}

fn read_workspace_patterns(dir: &Path) -> Vec<String> {
    let from_package_json = PackageJsonConfig::load(&dir.join("package.json"))
        .map(|cfg| cfg.workspace_patterns())
        .unwrap_or_default();
    if !from_package_json.is_empty() {
        return from_package_json;
    }
    read_pnpm_patterns(dir).unwrap_or_default()
}

/// Walk up from `cwd` to the first directory declaring workspaces.
pub fn detect_monorepo(cwd: &str) -> Option<MonorepoContext> {
    let mut current = Some(to_os_path(cwd));
    while let Some(dir) = current {
        if !read_workspace_patterns(&dir).is_empty() {
            debug!("Found workspace root at {}", dir.display());
            return Some(MonorepoContext::new(&normalize_path(&dir)));
        }
        current = dir.parent().map(Path::to_path_buf);
    }
    None
}

fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn compile_workspace_globs<'a>(patterns: impl Iterator<Item = &'a str>) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let clean = pattern.trim_start_matches("./").trim_end_matches('/');
        match GlobBuilder::new(clean).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!("Skipping workspace pattern '{}': {}", pattern, e),
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!("Failed to build workspace globs: {}", e);
        GlobSet::empty()
    })
}

/// Registered workspace packages of a monorepo plus memoized manifests.
#[derive(Debug, Default)]
pub struct MonorepoContext {
    pub workspace_root: String,
    /// Package name -> package directory.
    pub package_to_path: HashMap<String, String>,
    configs: DashMap<String, Option<Arc<PackageJsonConfig>>>,
    exports: DashMap<String, Option<Arc<PackageJsonExports>>>,
}

impl MonorepoContext {
    pub fn new(workspace_root: &str) -> Self {
        MonorepoContext { workspace_root: workspace_root.to_string(), ..Default::default() }
    }

    /// Enumerate workspace packages and register every one that has a name.
    pub fn find_workspace_packages(&mut self, exclude: &[GlobMatcher]) {
        let root = to_os_path(&self.workspace_root);
        let patterns = read_workspace_patterns(&root);
        let positive = compile_workspace_globs(patterns.iter().filter(|p| !p.starts_with('!')).map(String::as_str));
        let negative =
            compile_workspace_globs(patterns.iter().filter_map(|p| p.strip_prefix('!')));

        let mut candidates = Vec::new();
        self.walk_for_packages(&root, &positive, &negative, exclude, &mut candidates);

        // The walk stops at the first package on each branch, so nested packages listed by
        // their exact path are checked directly.
        for pattern in patterns.iter().filter(|p| !p.starts_with('!') && !is_glob_pattern(p)) {
            let rel = pattern.trim_start_matches("./").trim_end_matches('/');
            if rel.is_empty() || negative.is_match(rel) {
                continue;
            }
            let dir = root.join(rel);
            let internal = normalize_path(&dir);
            if dir.join("package.json").is_file()
                && !matches_any(&internal, exclude)
                && !candidates.contains(&internal)
            {
                candidates.push(internal);
            }
        }

        for dir in candidates {
            let config = match PackageJsonConfig::load(&to_os_path(&dir).join("package.json")) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Skipping workspace package {}: {:#}", dir, e);
                    continue;
                }
            };
            if config.name.is_empty() {
                trace!("Skipping unnamed workspace package {}", dir);
                continue;
            }
            trace!("Registered workspace package {} at {}", config.name, dir);
            self.package_to_path.insert(config.name.clone(), dir.clone());
            self.configs.insert(dir, Some(Arc::new(config)));
        }
        debug!("Found {} workspace packages", self.package_to_path.len());
    }

    fn walk_for_packages(
        &self,
        dir: &Path,
        positive: &GlobSet,
        negative: &GlobSet,
        exclude: &[GlobMatcher],
        out: &mut Vec<String>,
    ) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let mut subdirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter(|e| !SKIPPED_WORKSPACE_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
            .map(|e| e.path())
            .collect();
        subdirs.sort();

        for sub in subdirs {
            let internal = normalize_path(&sub);
            if matches_any(&internal, exclude) {
                continue;
            }
            if sub.join("package.json").is_file() {
                let rel = relative_to(&internal, &self.workspace_root);
                if positive.is_match(&rel) && !negative.is_match(&rel) {
                    out.push(internal);
                    continue;
                }
            }
            self.walk_for_packages(&sub, positive, negative, exclude, out);
        }
    }

    /// Manifest of the package rooted at `package_root`, read once.
    pub fn package_config(&self, package_root: &str) -> Option<Arc<PackageJsonConfig>> {
        if let Some(cached) = self.configs.get(package_root) {
            return cached.clone();
        }
        let loaded = PackageJsonConfig::load(&to_os_path(package_root).join("package.json"))
            .map_err(|e| trace!("No package config at {}: {:#}", package_root, e))
            .ok()
            .map(Arc::new);
        self.configs.insert(package_root.to_string(), loaded.clone());
        loaded
    }

    /// Parsed `exports` of the package rooted at `package_root`, if it declares any.
    pub fn package_exports(
        &self,
        package_root: &str,
        condition_names: &[String],
    ) -> Option<Arc<PackageJsonExports>> {
        if let Some(cached) = self.exports.get(package_root) {
            return cached.clone();
        }
        let parsed = self
            .package_config(package_root)
            .and_then(|cfg| PackageJsonExports::parse(cfg.exports.as_ref(), condition_names))
            .map(Arc::new);
        self.exports.insert(package_root.to_string(), parsed.clone());
        parsed
    }

    /// Package directories, longest first.
    pub fn package_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = self.package_to_path.values().cloned().collect();
        dirs.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        dirs
    }

    /// Name of the workspace package whose directory is `dir`.
    pub fn package_name_for_dir(&self, dir: &str) -> Option<&str> {
        self.package_to_path.iter().find(|(_, path)| path.as_str() == dir).map(|(name, _)| name.as_str())
    }
}
