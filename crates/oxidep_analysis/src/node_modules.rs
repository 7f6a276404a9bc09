//! Accounting of `node_modules` packages: used, unused and missing.

use log::{debug, trace, warn};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fs,
    path::Path,
};

use oxidep_core::{
    MinimalDependencyTree, PackageJsonConfig, ResolvedKind, get_node_module_name, join_path, read_jsonc,
};

/// Package name -> files (or manifests) that use it.
pub type ModuleUsages = BTreeMap<String, BTreeSet<String>>;

/// Include/exclude lists applied to package names.
#[derive(Debug, Clone, Default)]
pub struct ModuleFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ModuleFilter {
    pub fn includes(&self, module: &str) -> bool {
        if self.exclude.iter().any(|m| m == module) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|m| m == module)
    }
}

/// Extra places where packages are used without being imported.
#[derive(Debug, Clone, Default)]
pub struct UsedNodeModulesOptions {
    /// `package.json` fields searched for binary names, e.g. `husky` or `lint-staged`.
    pub pkg_json_fields_with_binaries: Vec<String>,
    /// Files (relative to the root) searched for binary names.
    pub files_with_binaries: Vec<String>,
    /// Files (relative to the root) searched for package names.
    pub files_with_modules: Vec<String>,
}

fn record_usage(usages: &mut ModuleUsages, module: &str, file: &str) {
    usages.entry(module.to_string()).or_default().insert(file.to_string());
}

/// Binaries each package installs, read from the closest `node_modules/<pkg>/package.json`
/// walking up from `root`.
pub fn find_node_module_binaries(modules: &HashSet<String>, root: &str) -> HashMap<String, Vec<String>> {
    let node_modules_dirs: Vec<String> = Path::new(root)
        .ancestors()
        .map(|dir| dir.join("node_modules"))
        .filter(|dir| dir.is_dir())
        .map(|dir| dir.to_string_lossy().into_owned())
        .collect();

    modules
        .iter()
        .map(|module| {
            let binaries = node_modules_dirs
                .iter()
                .map(|dir| Path::new(dir).join(module).join("package.json"))
                .filter(|path| path.is_file())
                .filter_map(|path| match PackageJsonConfig::load(&path) {
                    Ok(mut pkg) => {
                        if pkg.name.is_empty() {
                            pkg.name = module.clone();
                        }
                        Some(pkg.binaries())
                    }
                    Err(e) => {
                        trace!("Skipping {}: {:#}", path.display(), e);
                        None
                    }
                })
                // Node resolves the closest installation that ships binaries.
                .find(|binaries| !binaries.is_empty())
                .unwrap_or_default();
            (module.clone(), binaries)
        })
        .collect()
}

fn stringify_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn read_extra_files(root: &str, files: &[String]) -> Vec<(String, String)> {
    files
        .iter()
        .filter_map(|file| {
            let path = join_path(root, file);
            match fs::read_to_string(&path) {
                Ok(content) if !content.is_empty() => Some((path, content)),
                Ok(_) => None,
                Err(e) => {
                    warn!("Cannot read {}: {}", path, e);
                    None
                }
            }
        })
        .collect()
}

/// Packages used by the files of `tree`, by `package.json` scripts and fields, by the tsconfig
/// `types` list and by the extra files of `options`.
pub fn get_used_node_modules(
    tree: &MinimalDependencyTree,
    declared_modules: &HashSet<String>,
    root: &str,
    tsconfig_types: &[String],
    options: &UsedNodeModulesOptions,
) -> ModuleUsages {
    let mut usages = ModuleUsages::new();

    for (file, deps) in tree {
        for dep in deps {
            match dep.resolved_type {
                ResolvedKind::NodeModule => {
                    if let Some(id) = dep.id.as_deref() {
                        record_usage(&mut usages, id, file);
                    }
                }
                ResolvedKind::NotResolvedModule if !dep.request.is_empty() => {
                    record_usage(&mut usages, get_node_module_name(&dep.request), file);
                }
                _ => {}
            }
        }
    }

    let pkg_json_path = join_path(root, "package.json");
    let pkg_json: Value = read_jsonc(Path::new(&pkg_json_path)).unwrap_or(Value::Null);
    let scripts: Vec<String> = pkg_json
        .get("scripts")
        .and_then(Value::as_object)
        .map(|scripts| scripts.values().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    // A field name can be a binary name too.
    let mut fields_content = String::new();
    for field in &options.pkg_json_fields_with_binaries {
        fields_content.push_str(field);
        if let Some(value) = pkg_json.get(field) {
            let text = stringify_field(value);
            if !text.is_empty() {
                fields_content.push(' ');
                fields_content.push_str(&text);
            }
        }
    }
    let mut binary_sources = vec![(pkg_json_path.clone(), fields_content)];
    binary_sources.extend(read_extra_files(root, &options.files_with_binaries));

    let binaries = find_node_module_binaries(declared_modules, root);
    for (module, names) in &binaries {
        let user = names.iter().find_map(|binary| {
            if scripts.iter().any(|script| script.contains(binary.as_str())) {
                return Some(pkg_json_path.as_str());
            }
            binary_sources
                .iter()
                .find(|(_, content)| content.contains(binary.as_str()))
                .map(|(path, _)| path.as_str())
        });
        if let Some(user) = user {
            trace!("{} used through its binary in {}", module, user);
            record_usage(&mut usages, module, user);
        }
    }

    let tsconfig_path = join_path(root, "tsconfig.json");
    for types in tsconfig_types {
        record_usage(&mut usages, &format!("@types/{types}"), &tsconfig_path);
    }

    for (path, content) in read_extra_files(root, &options.files_with_modules) {
        for module in declared_modules {
            if content.contains(module.as_str()) {
                record_usage(&mut usages, module, &path);
            }
        }
    }

    debug!("Found {} used node modules", usages.len());
    usages
}

/// Used package names passing `filter`, sorted.
pub fn used_node_module_names(usages: &ModuleUsages, filter: &ModuleFilter) -> Vec<String> {
    usages
        .keys()
        .filter(|m| !m.starts_with('.') && filter.includes(m))
        .map(|m| get_node_module_name(m).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Declared packages that nothing uses, sorted. `@types/x` counts as used when `x` is.
pub fn get_unused_node_modules(
    usages: &ModuleUsages,
    declared_modules: &HashSet<String>,
    filter: &ModuleFilter,
) -> Vec<String> {
    let mut unused: Vec<String> = declared_modules
        .iter()
        .filter(|module| {
            let untyped = module.strip_prefix("@types/").unwrap_or(module);
            !usages.contains_key(module.as_str()) && !usages.contains_key(untyped)
        })
        .filter(|module| filter.includes(module))
        .map(|module| get_node_module_name(module).to_string())
        .collect();
    unused.sort();
    unused.dedup();
    unused
}

/// Unresolved bare imports grouped by package name.
///
/// Relative specifiers and packages declared in `declared_modules` are dropped.
pub fn get_missing_node_modules(
    tree: &MinimalDependencyTree,
    declared_modules: &HashSet<String>,
    filter: &ModuleFilter,
) -> ModuleUsages {
    let mut missing = ModuleUsages::new();
    for (file, deps) in tree {
        for dep in deps.iter().filter(|d| d.resolved_type == ResolvedKind::NotResolvedModule) {
            let module = get_node_module_name(&dep.request);
            if module.is_empty()
                || module.starts_with('.')
                || declared_modules.contains(module)
                || !filter.includes(module)
            {
                continue;
            }
            record_usage(&mut missing, module, file);
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_module_filter() {
        let filter = ModuleFilter { include: vec![], exclude: vec!["react".to_string()] };
        assert!(filter.includes("lodash"));
        assert!(!filter.includes("react"));

        let filter = ModuleFilter { include: vec!["lodash".to_string()], exclude: vec![] };
        assert!(filter.includes("lodash"));
        assert!(!filter.includes("vue"));
    }

    #[test]
    fn test_used_and_unused_node_modules() {
        let temp_dir = TempDir::new().unwrap();
        let root_path = temp_dir.path();
        let root = root_path.to_string_lossy().to_string();

        create_test_file(
            root_path,
            "package.json",
            r#"{
                "scripts": { "lint": "eslint ." },
                "lint-staged": { "*.ts": "prettier --write" },
                "devDependencies": { "eslint": "9", "prettier": "3", "vitest": "1", "@types/react": "18" }
            }"#,
        );
        create_test_file(root_path, "node_modules/eslint/package.json", r#"{"name":"eslint","bin":{"eslint":"./bin/eslint.js"}}"#);
        create_test_file(root_path, "node_modules/prettier/package.json", r#"{"name":"prettier","bin":"./bin/prettier.cjs"}"#);
        create_test_file(root_path, "node_modules/vitest/package.json", r#"{"name":"vitest","bin":{"vitest":"./vitest.mjs"}}"#);
        create_test_file(root_path, "babel.config.js", "module.exports = { presets: ['styled-components'] }");

        let file = join_path(&root, "src/index.ts");
        let tree = tree_of(vec![(
            file.as_str(),
            vec![
                module_dep("react", ResolvedKind::NodeModule),
                module_dep("left-pad/index", ResolvedKind::NotResolvedModule),
            ],
        )]);
        let declared = set(&["react", "eslint", "prettier", "vitest", "@types/react", "@types/node", "styled-components"]);
        let options = UsedNodeModulesOptions {
            pkg_json_fields_with_binaries: vec!["lint-staged".to_string()],
            files_with_binaries: vec![],
            files_with_modules: vec!["babel.config.js".to_string()],
        };

        let usages = get_used_node_modules(&tree, &declared, &root, &["jest".to_string()], &options);
        assert_eq!(
            used_node_module_names(&usages, &ModuleFilter::default()),
            vec!["@types/jest", "eslint", "left-pad", "prettier", "react", "styled-components"]
        );
        assert!(usages["eslint"].contains(&join_path(&root, "package.json")));
        assert_eq!(
            get_unused_node_modules(&usages, &declared, &ModuleFilter::default()),
            vec!["@types/node", "vitest"]
        );
        assert_eq!(
            get_unused_node_modules(
                &usages,
                &declared,
                &ModuleFilter { include: vec![], exclude: vec!["vitest".to_string()] }
            ),
            vec!["@types/node"]
        );
    }

    #[test]
    fn test_missing_node_modules() {
        let tree = tree_of(vec![
            (
                "/p/a.ts",
                vec![
                    module_dep("lodash/map", ResolvedKind::NotResolvedModule),
                    module_dep("./local", ResolvedKind::NotResolvedModule),
                    module_dep("@scope/pkg/sub", ResolvedKind::NotResolvedModule),
                    module_dep("declared", ResolvedKind::NotResolvedModule),
                ],
            ),
            ("/p/b.ts", vec![module_dep("lodash", ResolvedKind::NotResolvedModule)]),
        ]);

        let missing = get_missing_node_modules(&tree, &set(&["declared"]), &ModuleFilter::default());
        assert_eq!(missing.keys().cloned().collect::<Vec<_>>(), vec!["@scope/pkg", "lodash"]);
        assert_eq!(missing["lodash"].iter().cloned().collect::<Vec<_>>(), vec!["/p/a.ts", "/p/b.ts"]);

        let only_scope = ModuleFilter { include: vec!["@scope/pkg".to_string()], exclude: vec![] };
        assert_eq!(get_missing_node_modules(&tree, &HashSet::new(), &only_scope).len(), 1);
    }
}
