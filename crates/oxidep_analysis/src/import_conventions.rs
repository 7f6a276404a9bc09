//! The `relative-internal-absolute-external` import convention.
//!
//! A project is split into domains (directories). Imports inside a domain must be relative,
//! imports across domains must go through an alias, and a domain with an alias written in the
//! config must be imported through that alias.

use log::{debug, trace, warn};
use serde::Serialize;
use std::{collections::HashSet, fs};

use oxidep_core::{
    MinimalDependency, MinimalDependencyTree, PackageJsonImports, ResolvedKind, TsConfigParsed,
    is_within_dir, join_path, parent_dir, relative_to, split_source_extension,
};

use crate::source_modifier::Change;

/// A domain as written in the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConventionDomain {
    /// Directory relative to the rule root; `dir/*` stands for every subdirectory of `dir`.
    pub path: String,
    pub alias: Option<String>,
    pub enabled: bool,
}

impl ImportConventionDomain {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), alias: None, enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDomain {
    /// Path relative to the rule root.
    pub path: String,
    /// Alias used to import the domain; empty when none is known.
    pub alias: String,
    pub absolute_path: String,
    /// Imports are checked only from enabled domains.
    pub enabled: bool,
    pub alias_explicit: bool,
}

/// Where the aliases of the rule's package come from. Alias targets are relative to `root`.
#[derive(Debug, Clone, Copy)]
pub struct AliasSources<'a> {
    pub root: &'a str,
    pub tsconfig: &'a TsConfigParsed,
    pub imports: &'a PackageJsonImports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportConventionViolationKind {
    ShouldBeRelative,
    ShouldBeAliased,
    WrongAlias,
}

impl ImportConventionViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShouldBeRelative => "should-be-relative",
            Self::ShouldBeAliased => "should-be-aliased",
            Self::WrongAlias => "wrong-alias",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportConventionViolation {
    pub file_path: String,
    pub import_request: String,
    /// Position of the import among the file's records.
    pub import_index: usize,
    pub violation_type: ImportConventionViolationKind,
    pub source_domain: String,
    pub target_domain: Option<String>,
    pub expected_alias: Option<String>,
    pub fix: Option<Change>,
}

/// `(alias prefix, absolute target directory)` for every alias whose target is a directory
/// wildcard, e.g. `@/settings/*` -> `./src/settings/*` gives `("@/settings/", "<root>/src/settings")`.
fn wildcard_alias_dirs(sources: &AliasSources<'_>) -> Vec<(String, String)> {
    let tsconfig = sources
        .tsconfig
        .aliases
        .iter()
        .filter(|(key, _)| !(key.as_str() == "*" && sources.tsconfig.catch_all_from_base_url));
    let imports = sources.imports.simple_targets().iter();

    let mut dirs: Vec<(String, String)> = tsconfig
        .chain(imports)
        .filter_map(|(key, target)| {
            let prefix = key.strip_suffix('*')?;
            let target_dir = target.strip_suffix('*')?.trim_end_matches('/');
            if !(prefix.is_empty() || prefix.ends_with('/')) {
                return None;
            }
            Some((prefix.to_string(), join_path(sources.root, target_dir)))
        })
        .collect();
    // Most specific directory first; the key breaks ties so the choice is stable.
    dirs.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
    dirs
}

/// Alias of the domain at `absolute_path`, inferred from the aliases that point into it.
fn infer_alias(absolute_path: &str, alias_dirs: &[(String, String)]) -> Option<String> {
    alias_dirs
        .iter()
        .filter(|(prefix, _)| !prefix.is_empty())
        .find(|(_, dir)| is_within_dir(absolute_path, dir))
        .map(|(prefix, _)| prefix.trim_end_matches('/').to_string())
}

fn expand_domain_glob(base: &str, root: &str) -> Vec<String> {
    let base_dir = join_path(root, base);
    let entries = match fs::read_dir(&base_dir) {
        Ok(entries) => entries,
        Err(e) => {
            trace!("Skipping domain glob {}/*: {}", base, e);
            return Vec::new();
        }
    };
    let mut dirs: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| join_path(&base_dir, &entry.file_name().to_string_lossy()))
        .collect();
    dirs.sort();
    dirs
}

pub fn compile_domains(
    domains: &[ImportConventionDomain],
    root: &str,
    sources: &AliasSources<'_>,
) -> Vec<CompiledDomain> {
    let alias_dirs = wildcard_alias_dirs(sources);
    let mut compiled: Vec<CompiledDomain> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let (globs, plain): (Vec<_>, Vec<_>) = domains.iter().partition(|d| d.path.contains('*'));

    for domain in plain {
        let absolute_path = join_path(root, &domain.path);
        if !seen.insert(absolute_path.clone()) {
            continue;
        }
        let alias = domain.alias.clone().or_else(|| infer_alias(&absolute_path, &alias_dirs));
        compiled.push(CompiledDomain {
            path: domain.path.trim_start_matches("./").trim_end_matches('/').to_string(),
            alias: alias.unwrap_or_default(),
            absolute_path,
            enabled: domain.enabled,
            alias_explicit: domain.alias.is_some(),
        });
    }

    for domain in globs {
        let Some(base) = domain.path.strip_suffix("/*") else {
            warn!("Unsupported domain pattern {}, only dir/* is expanded", domain.path);
            continue;
        };
        for absolute_path in expand_domain_glob(base, root) {
            if !seen.insert(absolute_path.clone()) {
                continue;
            }
            let path = relative_to(&absolute_path, root);
            let alias = domain
                .alias
                .clone()
                .or_else(|| infer_alias(&absolute_path, &alias_dirs))
                .unwrap_or_else(|| {
                    let parts: Vec<&str> = path.split('/').collect();
                    format!("@{}", parts[parts.len().saturating_sub(2)..].join("/"))
                });
            compiled.push(CompiledDomain {
                path,
                alias,
                absolute_path,
                enabled: domain.enabled,
                alias_explicit: domain.alias.is_some(),
            });
        }
    }

    debug!("Compiled {} import convention domains", compiled.len());
    compiled
}

fn domain_of<'d>(path: &str, domains: &'d [CompiledDomain]) -> Option<&'d CompiledDomain> {
    domains.iter().find(|d| is_within_dir(path, &d.absolute_path))
}

pub fn is_relative_import(request: &str) -> bool {
    request.starts_with("./") || request.starts_with("../") || request == "." || request == ".."
}

fn uses_alias(request: &str, alias: &str) -> bool {
    let alias = alias.trim_end_matches('/');
    request == alias || request.strip_prefix(alias).is_some_and(|rest| rest.starts_with('/'))
}

/// `path` without its source extension, unless the request spelled one out. An `index` file
/// reached through its directory stays a directory import.
fn request_style_path(path: &str, request: &str) -> String {
    if split_source_extension(request).is_some() {
        return path.to_string();
    }
    let stem = split_source_extension(path).map_or(path, |(base, _)| base);
    let requested_index = request.rsplit('/').next() == Some("index");
    match stem.strip_suffix("/index") {
        Some(dir) if !requested_index && !dir.is_empty() => dir.to_string(),
        _ => stem.to_string(),
    }
}

fn relative_request(importer: &str, resolved: &str, request: &str) -> String {
    let relative = request_style_path(&relative_to(resolved, parent_dir(importer)), request);
    if relative.starts_with("../") { relative } else { format!("./{relative}") }
}

fn aliased_request(
    resolved: &str,
    request: &str,
    target: Option<&CompiledDomain>,
    alias_dirs: &[(String, String)],
) -> Option<String> {
    if let Some(domain) = target.filter(|d| d.alias_explicit && !d.alias.is_empty()) {
        let inner = request_style_path(&relative_to(resolved, &domain.absolute_path), request);
        return Some(format!("{}/{}", domain.alias.trim_end_matches('/'), inner));
    }
    alias_dirs
        .iter()
        .find(|(_, dir)| resolved != dir.as_str() && is_within_dir(resolved, dir))
        .map(|(prefix, dir)| format!("{}{}", prefix, request_style_path(&relative_to(resolved, dir), request)))
}

struct FileCheck<'a> {
    file: &'a str,
    source: &'a CompiledDomain,
    domains: &'a [CompiledDomain],
    alias_dirs: &'a [(String, String)],
    autofix: bool,
}

impl FileCheck<'_> {
    fn check(&self, index: usize, dep: &MinimalDependency) -> Option<ImportConventionViolation> {
        let resolved = dep.id.as_deref()?;
        let target = domain_of(resolved, self.domains);
        let is_relative = is_relative_import(&dep.request);
        let is_intra_domain =
            target.is_some_and(|t| t.path == self.source.path) || is_within_dir(resolved, &self.source.absolute_path);

        let violation_type = if is_intra_domain {
            if is_relative {
                return None;
            }
            ImportConventionViolationKind::ShouldBeRelative
        } else if is_relative {
            ImportConventionViolationKind::ShouldBeAliased
        } else if target.is_some_and(|t| t.alias_explicit && !t.alias.is_empty() && !uses_alias(&dep.request, &t.alias)) {
            ImportConventionViolationKind::WrongAlias
        } else {
            return None;
        };

        let fix = if self.autofix {
            let text = match violation_type {
                ImportConventionViolationKind::ShouldBeRelative => {
                    Some(relative_request(self.file, resolved, &dep.request))
                }
                _ => aliased_request(resolved, &dep.request, target, self.alias_dirs),
            };
            text.map(|text| Change::replace(dep.request_start, dep.request_end, text))
        } else {
            None
        };

        Some(ImportConventionViolation {
            file_path: self.file.to_string(),
            import_request: dep.request.clone(),
            import_index: index,
            violation_type,
            source_domain: self.source.path.clone(),
            target_domain: target.map(|t| t.path.clone()),
            expected_alias: target.filter(|t| !t.alias.is_empty()).map(|t| t.alias.clone()),
            fix,
        })
    }
}

/// Check the imports of `files` against the compiled domains, sorted by file then import index.
pub fn check_import_conventions(
    tree: &MinimalDependencyTree,
    files: &[String],
    domains: &[CompiledDomain],
    sources: &AliasSources<'_>,
    autofix: bool,
) -> Vec<ImportConventionViolation> {
    let alias_dirs = wildcard_alias_dirs(sources);
    let mut violations = Vec::new();

    for file in files {
        let Some(source) = domain_of(file, domains).filter(|d| d.enabled) else {
            continue;
        };
        let Some(deps) = tree.get(file) else {
            continue;
        };
        let check = FileCheck { file, source, domains, alias_dirs: &alias_dirs, autofix };
        violations.extend(
            deps.iter()
                .enumerate()
                .filter(|(_, dep)| {
                    matches!(dep.resolved_type, ResolvedKind::UserModule | ResolvedKind::MonorepoModule)
                })
                .filter_map(|(index, dep)| check.check(index, dep)),
        );
    }

    violations.sort_by(|a, b| a.file_path.cmp(&b.file_path).then_with(|| a.import_index.cmp(&b.import_index)));
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn dep(request: &str, id: &str, start: usize) -> MinimalDependency {
        MinimalDependency {
            request: request.to_string(),
            request_start: start,
            request_end: start + request.len(),
            ..user_dep(id)
        }
    }

    fn domain(path: &str, alias: Option<&str>, enabled: bool) -> ImportConventionDomain {
        ImportConventionDomain { path: path.to_string(), alias: alias.map(str::to_string), enabled }
    }

    fn config_domains() -> Vec<ImportConventionDomain> {
        vec![
            domain("src/auth", Some("@/auth"), true),
            domain("src/users", None, true),
            domain("src/settings", None, true),
            domain("src/chat", Some("@/chat/"), false),
        ]
    }

    fn auth_file_tree() -> MinimalDependencyTree {
        tree_of(vec![
            (
                "/p/src/auth/file.ts",
                vec![
                    dep("@/auth/file2.ts", "/p/src/auth/file2.ts", 10),
                    dep("../chat/file", "/p/src/chat/file.ts", 40),
                    dep("../settings/file", "/p/src/settings/file.ts", 70),
                    dep("../users/file", "/p/src/users/file.ts", 100),
                    dep("src/chat/file", "/p/src/chat/file.ts", 130),
                    dep("@/chat-another/file", "/p/src/chat/file.ts", 160),
                ],
            ),
            ("/p/src/chat/file.ts", vec![dep("../auth/file2", "/p/src/auth/file2.ts", 5)]),
        ])
    }

    fn fixes(violations: &[ImportConventionViolation]) -> Vec<(ImportConventionViolationKind, Option<String>)> {
        violations.iter().map(|v| (v.violation_type, v.fix.as_ref().map(|f| f.text.clone()))).collect()
    }

    #[test]
    fn test_conventions_with_explicit_catch_all_alias() {
        use ImportConventionViolationKind::*;

        let tsconfig = TsConfigParsed::from_value(&json!({
            "compilerOptions": {
                "baseUrl": ".",
                "paths": {
                    "@/auth/*": ["./src/auth/*"],
                    "@/settings/*": ["./src/settings/*"],
                    "@/chat/*": ["./src/chat/*"],
                    "@/chat-another/*": ["./src/chat/*"],
                    "*": ["./*"]
                }
            }
        }));
        let imports = PackageJsonImports::default();
        let sources = AliasSources { root: "/p", tsconfig: &tsconfig, imports: &imports };
        let domains = compile_domains(&config_domains(), "/p", &sources);

        let settings = domains.iter().find(|d| d.path == "src/settings").unwrap();
        assert_eq!(settings.alias, "@/settings");
        assert!(!settings.alias_explicit);

        let tree = auth_file_tree();
        let files = vec!["/p/src/auth/file.ts".to_string(), "/p/src/chat/file.ts".to_string()];
        let violations = check_import_conventions(&tree, &files, &domains, &sources, true);

        assert_eq!(
            fixes(&violations),
            vec![
                (ShouldBeRelative, Some("./file2.ts".to_string())),
                (ShouldBeAliased, Some("@/chat/file".to_string())),
                (ShouldBeAliased, Some("@/settings/file".to_string())),
                (ShouldBeAliased, Some("src/users/file".to_string())),
                (WrongAlias, Some("@/chat/file".to_string())),
                (WrongAlias, Some("@/chat/file".to_string())),
            ]
        );
        assert_eq!(violations[0].fix, Some(Change::replace(10, 25, "./file2.ts")));
        assert_eq!(violations[1].target_domain.as_deref(), Some("src/chat"));
    }

    #[test]
    fn test_no_fix_without_usable_alias() {
        use ImportConventionViolationKind::*;

        let tsconfig = TsConfigParsed::from_value(&json!({
            "compilerOptions": {
                "baseUrl": ".",
                "paths": { "@/settings/*": ["./src/settings/*"] }
            }
        }));
        let imports = PackageJsonImports::default();
        let sources = AliasSources { root: "/p", tsconfig: &tsconfig, imports: &imports };
        let domains = compile_domains(&config_domains(), "/p", &sources);

        let violations =
            check_import_conventions(&auth_file_tree(), &["/p/src/auth/file.ts".to_string()], &domains, &sources, true);
        let users = violations.iter().find(|v| v.import_request == "../users/file").unwrap();
        assert_eq!(users.violation_type, ShouldBeAliased);
        assert_eq!(users.fix, None);

        let without_autofix =
            check_import_conventions(&auth_file_tree(), &["/p/src/auth/file.ts".to_string()], &domains, &sources, false);
        assert!(without_autofix.iter().all(|v| v.fix.is_none()));
    }

    #[test]
    fn test_package_json_imports_alias_and_index_files() {
        let tsconfig = TsConfigParsed::default();
        let imports = PackageJsonImports::parse(Some(&json!({ "#ui/*": "./src/ui/*" })), &[]);
        let sources = AliasSources { root: "/p", tsconfig: &tsconfig, imports: &imports };
        let domains = compile_domains(
            &[ImportConventionDomain::new("src/ui"), ImportConventionDomain::new("src/app")],
            "/p",
            &sources,
        );
        assert_eq!(domains[0].alias, "#ui");

        let tree = tree_of(vec![(
            "/p/src/app/main.ts",
            vec![
                dep("../ui/button", "/p/src/ui/button/index.tsx", 0),
                dep("#ui/theme", "/p/src/ui/theme.ts", 30),
                dep("../app/router", "/p/src/app/router.ts", 60),
                MinimalDependency { resolved_type: ResolvedKind::NodeModule, ..dep("react", "react", 90) },
            ],
        )]);
        let violations =
            check_import_conventions(&tree, &["/p/src/app/main.ts".to_string()], &domains, &sources, true);
        assert_eq!(
            fixes(&violations),
            vec![(ImportConventionViolationKind::ShouldBeAliased, Some("#ui/button".to_string()))]
        );
    }

    #[test]
    fn test_glob_domains_expand_to_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let root_path = temp_dir.path();
        let root = root_path.to_string_lossy().to_string();
        create_test_file(root_path, "src/features/cart/index.ts", "");
        create_test_file(root_path, "src/features/retail/index.ts", "");
        create_test_file(root_path, "src/features/README.md", "");

        let tsconfig = TsConfigParsed::default();
        let imports = PackageJsonImports::default();
        let sources = AliasSources { root: &root, tsconfig: &tsconfig, imports: &imports };
        let domains = compile_domains(&[ImportConventionDomain::new("src/features/*")], &root, &sources);

        let summary: Vec<(&str, &str, bool)> =
            domains.iter().map(|d| (d.path.as_str(), d.alias.as_str(), d.alias_explicit)).collect();
        assert_eq!(
            summary,
            vec![("src/features/cart", "@features/cart", false), ("src/features/retail", "@features/retail", false)]
        );
    }

    #[test]
    fn test_is_relative_import() {
        assert!(is_relative_import("./a"));
        assert!(is_relative_import("../a"));
        assert!(is_relative_import(".."));
        assert!(!is_relative_import("@/a"));
        assert!(!is_relative_import(".hidden"));
    }
}
