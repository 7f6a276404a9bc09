//! Exports no other file imports, with optional removal fixes.

use log::{debug, warn};
use serde::Serialize;
use std::{
    collections::{HashMap, HashSet},
    fs,
};

use oxidep_core::{
    GlobMatcher, MinimalDependency, MinimalDependencyTree, create_glob_matchers, matches_any, to_os_path,
};

use crate::source_modifier::Change;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedExport {
    pub file_path: String,
    pub export_name: String,
    pub is_type: bool,
    /// `None` when the export cannot be removed safely or autofix is off.
    pub fix: Option<Change>,
}

#[derive(Debug, Clone, Default)]
pub struct UnusedExportsOptions {
    /// Globs relative to the rule root; all exports of matching files count as used.
    pub valid_entry_points: Vec<String>,
    /// Globs of files that neither report nor contribute usages.
    pub graph_exclude: Vec<String>,
    pub ignore_type_exports: bool,
    pub autofix: bool,
}

struct ExportEntry<'a> {
    name: &'a str,
    is_type: bool,
    dep: &'a MinimalDependency,
    dep_index: usize,
}

/// Names used per target file. `None` means every export is used.
#[derive(Default)]
struct Usage<'a> {
    all: bool,
    names: HashSet<&'a str>,
}

fn is_reexport(dep: &MinimalDependency) -> bool {
    dep.export.key_end > 0 && !dep.is_local_export
}

fn collect_exports<'a>(deps: &'a [MinimalDependency]) -> HashMap<&'a str, ExportEntry<'a>> {
    let mut exports = HashMap::new();
    for (dep_index, dep) in deps.iter().enumerate() {
        let Some(keywords) = &dep.keywords else {
            continue;
        };
        if !dep.is_local_export && !is_reexport(dep) {
            continue;
        }
        for kw in keywords {
            // `export * from` forwards names without defining any here.
            if !dep.is_local_export && kw.name == "*" && kw.alias.is_empty() {
                continue;
            }
            let name = kw.public_name();
            exports.insert(name, ExportEntry { name, is_type: kw.is_type, dep, dep_index });
        }
    }
    exports
}

fn record_usage<'a>(usage: &mut HashMap<&'a str, Usage<'a>>, deps: &'a [MinimalDependency]) {
    for dep in deps {
        let Some(target) = dep.id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        let entry = usage.entry(target).or_default();

        match &dep.keywords {
            // Basic parse mode, `export * from`, or a dynamic import.
            None if is_reexport(dep) || dep.is_dynamic_import => entry.all = true,
            // Side-effect import.
            None => {}
            Some(keywords) => {
                for kw in keywords {
                    if kw.name == "*" {
                        entry.all = true;
                    } else {
                        entry.names.insert(kw.name.as_str());
                    }
                }
            }
        }
    }
}

/// Grow `[start, end)` to the whole line, newline included, when nothing but spaces or tabs
/// would be left on it.
pub(crate) fn expand_to_fill_line_if_empty(source: &[u8], start: usize, end: usize) -> (usize, usize) {
    let line_start = source[..start].iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let line_end = source[end..].iter().position(|&b| b == b'\n').map_or(source.len(), |i| end + i);

    let blank = |b: &u8| *b == b' ' || *b == b'\t';
    if !source[line_start..start].iter().all(blank) || !source[end..line_end].iter().all(blank) {
        return (start, end);
    }

    let end = if source.get(line_end) == Some(&b'\n') { line_end + 1 } else { line_end };
    (line_start, end)
}

/// First offset at or after `i` that is neither whitespace nor inside a comment.
fn skip_spaces_and_comments(code: &[u8], mut i: usize) -> usize {
    while i < code.len() {
        match code[i] {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'/' if code.get(i + 1) == Some(&b'/') => {
                i = code[i..].iter().position(|&b| b == b'\n').map_or(code.len(), |p| i + p);
            }
            b'/' if code.get(i + 1) == Some(&b'*') => {
                i = code[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(code.len(), |p| i + 2 + p + 2);
            }
            _ => break,
        }
    }
    i
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn full_statement_removal(source: &[u8], dep: &MinimalDependency) -> Option<Change> {
    let (start, end) = (dep.export.key_start, dep.export.statement_end);
    if end > source.len() || start > end {
        return None;
    }
    let (start, end) = expand_to_fill_line_if_empty(source, start, end);
    Some(Change::removal(start, end))
}

/// `export default` is only removable in front of a named declaration or identifier.
fn default_export_fix(source: &[u8], dep: &MinimalDependency) -> Option<Change> {
    let decl = skip_spaces_and_comments(source, dep.export.decl_start);
    if !source.get(decl).copied().is_some_and(is_identifier_byte) {
        return None;
    }
    Some(Change::removal(dep.export.key_start, dep.export.decl_start))
}

/// Rebuild the `{ … }` list of `dep` without the `unused` names.
fn surgical_brace_fix(source: &[u8], dep: &MinimalDependency, unused: &HashSet<&str>) -> Option<Change> {
    let keywords = dep.keywords.as_ref()?;
    let (brace_start, brace_end) = (dep.export.brace_start, dep.export.brace_end);
    if brace_end > source.len() || brace_start >= brace_end {
        return None;
    }

    // Names after the last kept one are cut from the end of that name, taking the separator
    // with them. A trailing comma after the final name stays.
    let last_kept = keywords.iter().rposition(|kw| !unused.contains(kw.public_name()));
    let mut ranges: Vec<(usize, usize)> = keywords
        .iter()
        .enumerate()
        .filter(|(_, kw)| unused.contains(kw.public_name()))
        .map(|(i, kw)| match last_kept {
            Some(k) if k < i => (keywords[k].end, kw.end),
            _ if i + 1 < keywords.len() => (kw.start, keywords[i + 1].start),
            _ => match kw.comma_after {
                Some(comma) => (kw.start, comma + 1),
                None => (kw.start, kw.end),
            },
        })
        .map(|(start, end)| expand_to_fill_line_if_empty(source, start, end))
        .collect();
    if ranges.is_empty() {
        return None;
    }
    ranges.sort_unstable();

    let mut text = Vec::with_capacity(brace_end - brace_start);
    let mut pos = brace_start;
    for (start, end) in ranges {
        let (start, end) = (start.max(brace_start), end.min(brace_end));
        if start > pos {
            text.extend_from_slice(&source[pos..start]);
        }
        pos = pos.max(end);
    }
    if pos < brace_end {
        text.extend_from_slice(&source[pos..brace_end]);
    }

    Some(Change::replace(brace_start, brace_end, String::from_utf8_lossy(&text)))
}

fn compute_fix(
    source: &[u8],
    dep: &MinimalDependency,
    name: &str,
    unused: &HashSet<&str>,
) -> Option<Change> {
    let total = dep.keywords.as_ref().map_or(0, Vec::len);
    let has_braces = dep.export.brace_start > 0;

    if dep.is_local_export && !has_braces {
        // `export const a = 1, b = 2` loses both exports together.
        if unused.len() < total {
            return None;
        }
        if name == "default" {
            return default_export_fix(source, dep);
        }
        return Some(Change::removal(dep.export.key_start, dep.export.decl_start));
    }
    if has_braces && unused.len() == total {
        return full_statement_removal(source, dep);
    }
    if has_braces {
        return surgical_brace_fix(source, dep, unused);
    }
    if !dep.is_local_export && dep.export.statement_end > 0 {
        // `export * as ns from './x'`
        return full_statement_removal(source, dep);
    }
    None
}

fn is_excluded(file: &str, graph_exclude: &[GlobMatcher]) -> bool {
    matches_any(file, graph_exclude)
}

/// Exports of `files` never imported by another file of `tree`, sorted by file then name.
///
/// `root` anchors the globs in `options`. Files in `module_suffix_variants` are skipped.
pub fn find_unused_exports(
    files: &[String],
    tree: &MinimalDependencyTree,
    options: &UnusedExportsOptions,
    root: &str,
    module_suffix_variants: &HashSet<String>,
) -> Vec<UnusedExport> {
    let entry_points = create_glob_matchers(&options.valid_entry_points, root);
    let graph_exclude = create_glob_matchers(&options.graph_exclude, root);

    let mut export_map: Vec<(&str, HashMap<&str, ExportEntry>)> = Vec::new();
    for file in files {
        if is_excluded(file, &graph_exclude) || module_suffix_variants.contains(file) {
            continue;
        }
        let Some(deps) = tree.get(file) else {
            continue;
        };
        let exports = collect_exports(deps);
        if !exports.is_empty() {
            export_map.push((file.as_str(), exports));
        }
    }

    let mut usage: HashMap<&str, Usage> = HashMap::new();
    for (file, deps) in tree {
        if !is_excluded(file, &graph_exclude) {
            record_usage(&mut usage, deps);
        }
    }

    let mut results = Vec::new();
    for (file, exports) in export_map {
        if matches_any(file, &entry_points) {
            continue;
        }
        let used = usage.get(file);
        if used.is_some_and(|u| u.all) {
            continue;
        }

        let mut unused: Vec<&ExportEntry> = exports
            .values()
            .filter(|e| !used.is_some_and(|u| u.names.contains(e.name)))
            .filter(|e| !(options.ignore_type_exports && e.is_type))
            .collect();
        if unused.is_empty() {
            continue;
        }
        unused.sort_by(|a, b| a.name.cmp(b.name));

        let source = if options.autofix {
            match fs::read(to_os_path(file)) {
                Ok(source) => Some(source),
                Err(e) => {
                    warn!("Cannot read {} for export fixes: {}", file, e);
                    None
                }
            }
        } else {
            None
        };

        let mut unused_by_dep: HashMap<usize, HashSet<&str>> = HashMap::new();
        for entry in &unused {
            unused_by_dep.entry(entry.dep_index).or_default().insert(entry.name);
        }

        for entry in unused {
            let fix = match (&source, entry.dep.keywords.is_some()) {
                (Some(source), true) => {
                    compute_fix(source, entry.dep, entry.name, &unused_by_dep[&entry.dep_index])
                }
                _ => None,
            };
            results.push(UnusedExport {
                file_path: file.to_string(),
                export_name: entry.name.to_string(),
                is_type: entry.is_type,
                fix,
            });
        }
    }

    results.sort_by(|a, b| a.file_path.cmp(&b.file_path).then_with(|| a.export_name.cmp(&b.export_name)));
    debug!("Found {} unused exports", results.len());
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_modifier::apply_changes_to_content;
    use oxidep_core::{ParseMode, ResolvedKind, normalize_path, parse_imports, to_minimal_dependency_tree, FileImports};
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    /// Parse `files` in detailed mode and point every `./name` request at `<root>/name.ts`.
    fn build_tree(root: &Path, files: &[(&str, &str)]) -> (String, Vec<String>, MinimalDependencyTree) {
        let cwd = normalize_path(root);
        let mut parsed = Vec::new();
        let mut paths = Vec::new();
        for (name, content) in files {
            create_test_file(root, name, content);
            let path = format!("{cwd}/{name}");
            let mut imports = parse_imports(content.as_bytes(), false, ParseMode::Detailed);
            for imp in &mut imports {
                if let Some(rel) = imp.request.strip_prefix("./") {
                    imp.id = Some(format!("{cwd}/{rel}.ts"));
                    imp.resolved_type = ResolvedKind::UserModule;
                }
            }
            paths.push(path.clone());
            parsed.push(FileImports { path, imports });
        }
        paths.sort();
        (cwd, paths, to_minimal_dependency_tree(parsed))
    }

    fn names(results: &[UnusedExport]) -> Vec<(&str, &str)> {
        results
            .iter()
            .map(|r| (r.file_path.rsplit('/').next().unwrap_or(""), r.export_name.as_str()))
            .collect()
    }

    #[test]
    fn test_surgical_brace_fix_keeps_used_names() {
        let temp_dir = TempDir::new().unwrap();
        let content = "export { A, B, C } from './m';\n";
        let (cwd, files, tree) = build_tree(
            temp_dir.path(),
            &[
                ("barrel.ts", content),
                ("m.ts", "export const A = 1;\nexport const B = 2;\nexport const C = 3;\n"),
                ("app.ts", "import { A, C } from './barrel';\n"),
            ],
        );
        let options = UnusedExportsOptions {
            valid_entry_points: vec!["app.ts".to_string()],
            autofix: true,
            ..Default::default()
        };

        let results = find_unused_exports(&files, &tree, &options, &cwd, &HashSet::new());
        assert_eq!(names(&results), vec![("barrel.ts", "B")]);

        let fix = results[0].fix.clone().unwrap();
        assert_eq!(fix, Change::replace(7, 18, "{ A, C }"));
        assert_eq!(apply_changes_to_content(content, vec![fix]), "export { A, C } from './m';\n");
    }

    #[test]
    fn test_surgical_brace_fix_drops_trailing_names() {
        let temp_dir = TempDir::new().unwrap();
        let content = "export { A, B, C } from './m';\nexport { D, E, } from './n';\n";
        let (cwd, files, tree) = build_tree(
            temp_dir.path(),
            &[
                ("barrel.ts", content),
                ("m.ts", "export const A = 1;\nexport const B = 2;\nexport const C = 3;\n"),
                ("n.ts", "export const D = 1;\nexport const E = 2;\n"),
                ("app.ts", "import { A, D } from './barrel';\n"),
            ],
        );
        let options = UnusedExportsOptions {
            valid_entry_points: vec!["app.ts".to_string()],
            autofix: true,
            ..Default::default()
        };

        let results = find_unused_exports(&files, &tree, &options, &cwd, &HashSet::new());
        assert_eq!(names(&results), vec![("barrel.ts", "B"), ("barrel.ts", "C"), ("barrel.ts", "E")]);

        let mut changes: Vec<Change> = results.iter().filter_map(|r| r.fix.clone()).collect();
        changes.dedup();
        assert_eq!(
            apply_changes_to_content(content, changes),
            "export { A } from './m';\nexport { D, } from './n';\n"
        );
    }

    #[test]
    fn test_star_reexport_marks_all_used_but_defines_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let (cwd, files, tree) = build_tree(
            temp_dir.path(),
            &[
                ("index.ts", "export * from './lib';\nexport * as helpers from './helpers';\n"),
                ("lib.ts", "export const a = 1;\nexport function b() {}\n"),
                ("helpers.ts", "export const h = 1;\n"),
            ],
        );

        let results = find_unused_exports(&files, &tree, &UnusedExportsOptions::default(), &cwd, &HashSet::new());
        assert_eq!(names(&results), vec![("index.ts", "helpers")]);
    }

    #[test]
    fn test_local_export_fixes() {
        let temp_dir = TempDir::new().unwrap();
        let content = "export const used = 1;\nexport function unused() {}\nexport default { a: 1 };\n";
        let (cwd, files, tree) = build_tree(
            temp_dir.path(),
            &[("lib.ts", content), ("app.ts", "import { used } from './lib';\n")],
        );
        let options = UnusedExportsOptions {
            valid_entry_points: vec!["app.ts".to_string()],
            autofix: true,
            ..Default::default()
        };

        let results = find_unused_exports(&files, &tree, &options, &cwd, &HashSet::new());
        assert_eq!(names(&results), vec![("lib.ts", "default"), ("lib.ts", "unused")]);
        assert_eq!(results[0].fix, None);

        let fixes: Vec<Change> = results.iter().filter_map(|r| r.fix.clone()).collect();
        assert_eq!(
            apply_changes_to_content(content, fixes),
            "export const used = 1;\nfunction unused() {}\nexport default { a: 1 };\n"
        );
    }

    #[test]
    fn test_full_statement_removal_takes_the_line() {
        let temp_dir = TempDir::new().unwrap();
        let content = "const a = 1;\nconst b = 2;\nexport { a, b };\nexport const c = 3;\n";
        let (cwd, files, tree) = build_tree(
            temp_dir.path(),
            &[("lib.ts", content), ("app.ts", "import { c } from './lib';\n")],
        );
        let options = UnusedExportsOptions {
            valid_entry_points: vec!["app.ts".to_string()],
            autofix: true,
            ..Default::default()
        };

        let results = find_unused_exports(&files, &tree, &options, &cwd, &HashSet::new());
        assert_eq!(names(&results), vec![("lib.ts", "a"), ("lib.ts", "b")]);
        let fixes: Vec<Change> = results.iter().filter_map(|r| r.fix.clone()).collect();
        assert_eq!(
            apply_changes_to_content(content, fixes),
            "const a = 1;\nconst b = 2;\nexport const c = 3;\n"
        );
    }

    #[test]
    fn test_dynamic_and_namespace_imports_use_everything() {
        let temp_dir = TempDir::new().unwrap();
        let (cwd, files, tree) = build_tree(
            temp_dir.path(),
            &[
                ("a.ts", "export const a = 1;\n"),
                ("b.ts", "export const b = 1;\n"),
                ("c.ts", "export const c = 1;\n"),
                ("app.ts", "import('./a');\nimport * as ns from './b';\nimport './c';\n"),
            ],
        );
        let options = UnusedExportsOptions {
            valid_entry_points: vec!["app.ts".to_string()],
            ..Default::default()
        };

        let results = find_unused_exports(&files, &tree, &options, &cwd, &HashSet::new());
        assert_eq!(names(&results), vec![("c.ts", "c")]);
        assert_eq!(results[0].fix, None);
    }

    #[test]
    fn test_type_exports_and_variants_can_be_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let (cwd, files, tree) = build_tree(
            temp_dir.path(),
            &[
                ("types.ts", "export type T = string;\nexport interface I {}\nexport const v = 1;\n"),
                ("button.ios.ts", "export const b = 1;\n"),
            ],
        );
        let options = UnusedExportsOptions { ignore_type_exports: true, ..Default::default() };
        let variants: HashSet<String> = [format!("{cwd}/button.ios.ts")].into_iter().collect();

        let results = find_unused_exports(&files, &tree, &options, &cwd, &variants);
        assert_eq!(names(&results), vec![("types.ts", "v")]);
    }

    #[test]
    fn test_expand_to_fill_line_if_empty() {
        let source = b"a\n  export { x };\nb";
        assert_eq!(expand_to_fill_line_if_empty(source, 4, 17), (2, 18));
        assert_eq!(expand_to_fill_line_if_empty(source, 4, 10), (4, 10));
        assert_eq!(expand_to_fill_line_if_empty(b"x;", 0, 2), (0, 2));
    }
}
