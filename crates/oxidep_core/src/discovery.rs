use anyhow::Result;
use dashmap::DashMap;
use ignore::WalkBuilder;
use log::{debug, trace};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    constants::SOURCE_EXTENSIONS,
    glob::{GlobMatcher, create_glob_matchers, matches_any},
    paths::{normalize_path, to_os_path},
};

fn has_source_extension(name: &str) -> bool {
    match name.rfind('.') {
        Some(idx) => SOURCE_EXTENSIONS.contains(&&name[idx..]),
        None => false,
    }
}

/// Non-blank, non-comment lines of a `.gitignore`, compiled relative to its directory.
pub fn parse_gitignore(content: &str, dir: &str) -> Vec<GlobMatcher> {
    let patterns: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();
    create_glob_matchers(&patterns, dir)
}

fn read_gitignore(dir: &Path) -> Vec<GlobMatcher> {
    match fs::read_to_string(dir.join(".gitignore")) {
        Ok(content) => parse_gitignore(&content, &normalize_path(dir)),
        Err(_) => Vec::new(),
    }
}

/// Collect `.gitignore` matchers from `dir` up to the nearest directory containing `.git`.
pub fn gitignore_matchers_up_to_repo_root(dir: &str) -> Vec<GlobMatcher> {
    let mut matchers = Vec::new();
    let mut current = Some(to_os_path(dir));

    while let Some(dir) = current {
        let found = read_gitignore(&dir);
        if !found.is_empty() {
            trace!("Loaded {} gitignore patterns from {}", found.len(), dir.display());
            matchers.extend(found);
        }
        if dir.join(".git").is_dir() {
            debug!("Found git root at: {}", dir.display());
            break;
        }
        current = dir.parent().map(Path::to_path_buf);
    }

    matchers
}

/// Walk `cwd` and return every supported source file not matched by `ignore` or by a nested
/// `.gitignore`, in internal path form and sorted.
pub fn get_files(cwd: &str, ignore: Vec<GlobMatcher>) -> Result<Vec<String>> {
    debug!("Walking directory tree from root: {}", cwd);
    let root = to_os_path(cwd);
    let base = Arc::new(ignore);

    // Ignore matchers in effect inside each accepted directory.
    let scoped: Arc<DashMap<PathBuf, Arc<Vec<GlobMatcher>>>> = Arc::new(DashMap::new());
    scoped.insert(root.clone(), Arc::clone(&base));

    let filter_scoped = Arc::clone(&scoped);
    let walker = WalkBuilder::new(&root)
        .standard_filters(false)
        .hidden(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let path = entry.path();
            let inherited = path
                .parent()
                .and_then(|parent| filter_scoped.get(parent).map(|m| Arc::clone(&m)))
                .unwrap_or_else(|| Arc::clone(&base));

            if matches_any(&normalize_path(path), &inherited) {
                trace!("Skipping ignored path: {}", path.display());
                return false;
            }

            if entry.file_type().is_some_and(|t| t.is_dir()) {
                let own = read_gitignore(path);
                let effective = if own.is_empty() {
                    inherited
                } else {
                    let mut combined = inherited.as_ref().clone();
                    combined.extend(own);
                    Arc::new(combined)
                };
                filter_scoped.insert(path.to_path_buf(), effective);
            }
            true
        })
        .build();

    let mut files = Vec::new();
    for res in walker {
        let dent = res?;
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let name = dent.file_name().to_string_lossy();
        if has_source_extension(&name) {
            files.push(normalize_path(dent.path()));
        }
    }

    files.sort();
    debug!("Collected {} source files", files.len());
    Ok(files)
}

/// Discover files under `cwd` honoring user excludes and the gitignore chain.
pub fn discover_files<S: AsRef<str>>(cwd: &str, exclude: &[S]) -> Result<Vec<String>> {
    let mut matchers = create_glob_matchers(exclude, cwd);
    matchers.extend(gitignore_matchers_up_to_repo_root(cwd));
    get_files(cwd, matchers)
}

/// Probe the disk for a module path under each supported extension, then as a directory index.
pub fn find_missing_file(module_path: &str, module_suffixes: &[String]) -> Option<String> {
    let default_suffixes = [String::new()];
    let suffixes = if module_suffixes.is_empty() { &default_suffixes[..] } else { module_suffixes };

    for suffix in suffixes {
        let base = format!("{module_path}{suffix}");
        for ext in SOURCE_EXTENSIONS {
            let candidate = if base.ends_with(ext) { base.clone() } else { format!("{base}{ext}") };
            if to_os_path(&candidate).is_file() {
                return Some(normalize_path(&candidate));
            }
        }
    }

    for suffix in suffixes {
        for ext in SOURCE_EXTENSIONS {
            let candidate = format!("{module_path}/index{suffix}{ext}");
            if to_os_path(&candidate).is_file() {
                return Some(normalize_path(&candidate));
            }
        }
    }

    None
}
