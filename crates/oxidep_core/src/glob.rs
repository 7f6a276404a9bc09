use globset::GlobBuilder;
use log::{trace, warn};
use std::borrow::Cow;

use crate::paths::{normalize_path, with_trailing_slash};

/// A compiled gitignore-style pattern anchored at a root directory.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    glob: globset::GlobMatcher,
    pattern: String,
    root: String,
    /// Pattern without `/` or `*`: also matches a file name or any path segment.
    bare: bool,
}

impl GlobMatcher {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, path: &str) -> bool {
        let path = normalize_candidate(path);
        let relative = path.strip_prefix(self.root.as_str()).unwrap_or(&path);
        if self.glob.is_match(relative) {
            return true;
        }
        if !self.bare {
            return false;
        }
        let name = self.pattern.as_str();
        relative.ends_with(&format!("/{name}"))
            || relative.contains(&format!("/{name}/"))
            || relative.starts_with(&format!("{name}/"))
            || relative == name
    }
}

/// Bring a candidate into the internal form the patterns are anchored in.
fn normalize_candidate(path: &str) -> Cow<'_, str> {
    let needs_cleaning = path.contains('\\')
        || path.starts_with("./")
        || path.contains("/./")
        || path.contains("/../")
        || path.contains("//");
    if needs_cleaning { Cow::Owned(normalize_path(path.replace('\\', "/"))) } else { Cow::Borrowed(path) }
}

fn compile(pattern: &str) -> Option<globset::GlobMatcher> {
    match GlobBuilder::new(pattern).literal_separator(false).build() {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(e) => {
            warn!("Skipping glob pattern '{}': {}", pattern, e);
            None
        }
    }
}

/// Compile patterns relative to `root`. Patterns that fail to compile are skipped with a warning.
pub fn create_glob_matchers<S: AsRef<str>>(patterns: &[S], root: &str) -> Vec<GlobMatcher> {
    let root = with_trailing_slash(&normalize_path(root));
    let mut matchers = Vec::with_capacity(patterns.len());

    for raw in patterns {
        let raw = raw.as_ref().trim();
        let raw = raw.strip_prefix("./").unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }
        let bare = !raw.contains('/') && !raw.contains('*');
        let pattern = if raw.ends_with('/') && !raw.contains('*') {
            // Directory entry: the whole subtree matches. `*` crosses separators here.
            format!("*{raw}*")
        } else {
            raw.to_string()
        };

        if let Some(glob) = compile(&pattern) {
            trace!("Compiled glob '{}' at root {}", pattern, root);
            matchers.push(GlobMatcher { glob, pattern: pattern.clone(), root: root.clone(), bare });
        }

        if let Some(rest) = pattern.strip_prefix("**/")
            && let Some(glob) = compile(rest)
        {
            matchers.push(GlobMatcher {
                glob,
                pattern: rest.to_string(),
                root: root.clone(),
                bare: false,
            });
        }
    }

    matchers
}

pub fn matches_any(path: &str, matchers: &[GlobMatcher]) -> bool {
    matchers.iter().any(|m| m.is_match(path))
}

/// Matcher for plain module names such as `lodash` or `@scope/*`, not anchored at a directory.
pub fn create_module_matchers<S: AsRef<str>>(patterns: &[S]) -> Vec<globset::GlobMatcher> {
    patterns.iter().filter_map(|p| compile(p.as_ref().trim())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_pattern_matches_file_name_and_directory() {
        let matchers = create_glob_matchers(&["node_modules"], "/project");
        assert!(matches_any("/project/node_modules/lib/a.js", &matchers));
        assert!(matches_any("/project/packages/a/node_modules/x.js", &matchers));
        assert!(matches_any("/project/src/node_modules", &matchers));
        assert!(!matches_any("/project/src/node_modules_backup.ts", &matchers));
    }

    #[test]
    fn test_trailing_slash_matches_subtree() {
        let matchers = create_glob_matchers(&["dist/"], "/project");
        assert!(matches_any("/project/dist/index.js", &matchers));
        assert!(matches_any("/project/packages/a/dist/deep/index.js", &matchers));
        assert!(!matches_any("/project/src/index.js", &matchers));
    }

    #[test]
    fn test_double_star_prefix_matches_root_files() {
        let matchers = create_glob_matchers(&["**/*.test.ts"], "/project");
        assert!(matches_any("/project/a.test.ts", &matchers));
        assert!(matches_any("/project/src/deep/a.test.ts", &matchers));
        assert!(!matches_any("/project/src/a.ts", &matchers));
    }

    #[test]
    fn test_patterns_are_relative_to_root() {
        let matchers = create_glob_matchers(&["src/generated/*"], "/project/");
        assert!(matches_any("/project/src/generated/a.ts", &matchers));
        assert!(!matches_any("/project/lib/src/generated/a.ts", &matchers));
    }

    #[test]
    fn test_candidate_paths_are_normalized() {
        let matchers = create_glob_matchers(&["./src/generated/*"], "/project");
        assert!(matches_any("/project/src/generated/a.ts", &matchers));
        assert!(matches_any("/project/./src/generated/a.ts", &matchers));
        assert!(matches_any("/project/src\\generated\\a.ts", &matchers));
        assert!(matches_any("./src/generated/a.ts", &matchers));
        assert!(!matches_any("/project/src/other/../lib/a.ts", &matchers));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let matchers = create_glob_matchers(&["src/[", "*.log"], "/project");
        assert_eq!(matchers.len(), 1);
        assert!(matches_any("/project/debug.log", &matchers));
    }

    #[test]
    fn test_module_matchers() {
        let matchers = create_module_matchers(&["lodash", "@internal/*"]);
        assert!(matchers.iter().any(|m| m.is_match("lodash")));
        assert!(matchers.iter().any(|m| m.is_match("@internal/secret")));
        assert!(!matchers.iter().any(|m| m.is_match("react")));
    }
}
