//! Internal path form: forward slashes, cleaned, no trailing slash except root.
//!
//! Every map key and comparison in the pipeline uses this form. Conversion back
//! to an OS path only happens when touching the filesystem.

use anyhow::Result;
use path_clean::clean;
use std::{
    env,
    path::{Path, PathBuf},
};

pub fn normalize_path(p: impl AsRef<Path>) -> String {
    let p = p.as_ref();
    if p.as_os_str().is_empty() {
        return String::new();
    }
    let cleaned = clean(p).to_string_lossy().to_string();
    if cfg!(windows) { cleaned.replace('\\', "/") } else { cleaned }
}

pub fn to_os_path(internal: &str) -> PathBuf {
    if cfg!(windows) { PathBuf::from(internal.replace('/', "\\")) } else { PathBuf::from(internal) }
}

/// Join `rel` onto `base` and clean the result. Absolute `rel` wins.
pub fn join_path(base: &str, rel: &str) -> String {
    normalize_path(Path::new(base).join(rel))
}

pub fn with_trailing_slash(dir: &str) -> String {
    if dir.ends_with('/') { dir.to_string() } else { format!("{dir}/") }
}

/// Directory part of an internal path.
pub fn parent_dir(p: &str) -> &str {
    match p.rfind('/') {
        Some(0) => "/",
        Some(idx) => &p[..idx],
        None => ".",
    }
}

/// True when `path` equals `dir` or lives under it on a directory boundary.
pub fn is_within_dir(path: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        return path.starts_with('/');
    }
    path == dir || (path.starts_with(dir) && path.as_bytes().get(dir.len()) == Some(&b'/'))
}

/// Absolute, normalized working directory; relative inputs are taken from the process cwd.
pub fn resolve_absolute_cwd(cwd: Option<&Path>) -> Result<String> {
    let current = env::current_dir()?;
    let abs = match cwd {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => current.join(p),
        None => current,
    };
    Ok(normalize_path(abs))
}

/// Internal-form relative path from `base_dir` to `target`, without a leading `./`.
///
/// Paths that share no leading segment (or mix absolute and relative) come back unchanged.
pub fn relative_to(target: &str, base_dir: &str) -> String {
    if target.starts_with('/') != base_dir.starts_with('/') {
        return target.to_string();
    }
    let target_parts: Vec<&str> = target.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let base_parts: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let common = target_parts.iter().zip(&base_parts).take_while(|(t, b)| t == b).count();
    if common == 0 && !target.starts_with('/') && !base_parts.is_empty() {
        return target.to_string();
    }

    let mut parts = vec![".."; base_parts.len() - common];
    parts.extend(&target_parts[common..]);
    if parts.is_empty() { ".".to_string() } else { parts.join("/") }
}

/// Strip `cwd` from an absolute internal path for display.
pub fn display_path<'a>(path: &'a str, cwd: &str) -> &'a str {
    let cwd = cwd.trim_end_matches('/');
    match path.strip_prefix(cwd) {
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => path,
    }
}
