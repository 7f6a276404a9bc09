//! Runs every rule of a config over a single dependency tree and applies fixes.

use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fs,
};

use oxidep_analysis::{
    AliasSources, BoundaryViolation, Change, DevDependencyUsage, ImportConventionViolation,
    ImportConventionViolationKind, ModuleFilter, ModuleUsages, OrphanFilesOptions, RestrictedImportViolation,
    RestrictedImportsOptions, UnresolvedImport, UnresolvedImportsOptions, UnusedExport, UnusedExportsOptions,
    UsedNodeModulesOptions, apply_file_changes, build_graph, check_import_conventions, check_module_boundaries,
    compile_domains, detect_unresolved_imports, filter_unresolved_imports, find_circular_dependencies,
    find_dev_dependencies_in_production, find_orphan_files, find_restricted_imports, find_unused_exports,
    get_missing_node_modules, get_unused_node_modules, get_used_node_modules,
};
use oxidep_core::{
    AnalyzeOptions, DependencyTree, FollowMonorepoPackages, MinimalDependencyTree, PackageJsonConfig, ParseMode,
    analyze, is_within_dir, join_path, to_os_path,
};

use crate::config::{OxidepConfig, Rule, enabled};

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub package_json_path: Option<String>,
    pub tsconfig_json_path: Option<String>,
    /// Delete orphans and apply source fixes of rules that enable autofix.
    pub fix: bool,
}

/// Findings of one rule. Checks that are switched off leave their field empty.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule_path: String,
    pub file_count: usize,
    pub enabled_checks: Vec<&'static str>,
    pub circular_dependencies: Vec<Vec<String>>,
    pub orphan_files: Vec<String>,
    pub boundary_violations: Vec<BoundaryViolation>,
    pub unused_node_modules: Vec<String>,
    pub missing_node_modules: ModuleUsages,
    pub import_convention_violations: Vec<ImportConventionViolation>,
    pub unused_exports: Vec<UnusedExport>,
    pub unresolved_imports: Vec<UnresolvedImport>,
    pub restricted_imports: Vec<RestrictedImportViolation>,
    pub restricted_dev_dependencies: Vec<DevDependencyUsage>,
    /// The rule runs checks but its directory has no `package.json`.
    pub missing_package_json: bool,
    #[serde(skip)]
    pub(crate) orphan_autofix: bool,
}

impl RuleResult {
    pub fn issue_count(&self) -> usize {
        self.circular_dependencies.len()
            + self.orphan_files.len()
            + self.boundary_violations.len()
            + self.unused_node_modules.len()
            + self.missing_node_modules.len()
            + self.import_convention_violations.len()
            + self.unused_exports.len()
            + self.unresolved_imports.len()
            + self.restricted_imports.len()
            + self.restricted_dev_dependencies.len()
    }

    pub fn has_failures(&self) -> bool {
        self.issue_count() > 0 || self.missing_package_json
    }

    /// Issues `--fix` would repair.
    pub fn fixable_count(&self) -> usize {
        let orphans = if self.orphan_autofix { self.orphan_files.len() } else { 0 };
        orphans
            + self.unused_exports.iter().filter(|e| e.fix.is_some()).count()
            + self.import_convention_violations.iter().filter(|v| v.fix.is_some()).count()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigProcessingResult {
    pub rule_results: Vec<RuleResult>,
    pub has_failures: bool,
    pub files_analyzed: usize,
    pub fixed_files_count: usize,
    pub fixed_imports_count: usize,
    pub fixed_exports_count: usize,
    pub deleted_files_count: usize,
    /// `should-be-aliased` violations left without a fix because no alias reaches the target.
    pub unfixable_aliasing_count: usize,
    /// Issues that `--fix` would repair, counted when not fixing.
    pub fixable_issues_count: usize,
}

/// Files a rule looks at: everything under its directory plus, when following workspace
/// packages, every file those reach inside the allowed packages. Sorted.
pub fn filter_files_for_rule(tree: &DependencyTree, rule_root: &str, follow: &FollowMonorepoPackages) -> Vec<String> {
    let own: Vec<String> = tree.files.iter().filter(|f| is_within_dir(f, rule_root)).cloned().collect();
    if !follow.is_enabled() {
        return own;
    }

    let allowed_dirs: Option<Vec<&str>> = match follow {
        FollowMonorepoPackages::Packages(names) => Some(
            tree.resolver
                .monorepo()
                .map(|ctx| {
                    ctx.package_to_path
                        .iter()
                        .filter(|(name, _)| names.contains(name.as_str()))
                        .map(|(_, dir)| dir.as_str())
                        .collect()
                })
                .unwrap_or_default(),
        ),
        _ => None,
    };

    let graph = build_graph(&tree.tree, &own, false);
    let mut files: BTreeSet<String> = own.into_iter().collect();
    for path in graph.vertices.into_keys() {
        let keep = is_within_dir(&path, rule_root)
            || allowed_dirs.as_ref().is_none_or(|dirs| dirs.iter().any(|dir| is_within_dir(&path, dir)));
        if keep {
            files.insert(path);
        }
    }
    files.into_iter().collect()
}

fn sub_tree(tree: &MinimalDependencyTree, files: &[String]) -> MinimalDependencyTree {
    files.iter().filter_map(|file| tree.get(file).map(|deps| (file.clone(), deps.clone()))).collect()
}

fn module_filter(include: &[String], exclude: &[String]) -> ModuleFilter {
    ModuleFilter { include: include.to_vec(), exclude: exclude.to_vec() }
}

fn process_rule(rule: &Rule, tree: &DependencyTree, cwd: &str) -> Result<RuleResult> {
    let rule_root = join_path(cwd, &rule.path);
    let follow = rule.follow_monorepo_packages.to_follow();
    let files = filter_files_for_rule(tree, &rule_root, &follow);
    let rule_tree = sub_tree(&tree.tree, &files);
    let variants = tree.resolver.detect_module_suffix_variants(&files);
    debug!("Rule '{}': {} files", rule.path, files.len());

    let package_json_file = to_os_path(&join_path(&rule_root, "package.json"));
    let package_json = if package_json_file.is_file() {
        PackageJsonConfig::load(&package_json_file)
            .with_context(|| format!("Failed to read {}", package_json_file.display()))?
    } else {
        PackageJsonConfig::default()
    };
    let declared = package_json.node_modules();
    let resolver = tree.resolver.resolver_for_file(&rule_root);

    let mut result = RuleResult {
        rule_path: rule.path.clone(),
        file_count: files.len(),
        enabled_checks: rule.enabled_checks(),
        orphan_autofix: rule.orphan_autofix(),
        ..Default::default()
    };
    result.missing_package_json = !result.enabled_checks.is_empty()
        && to_os_path(&rule_root).is_dir()
        && !package_json_file.is_file();

    if let Some(options) = enabled!(rule.circular_imports_detection) {
        result.circular_dependencies = find_circular_dependencies(&rule_tree, &files, options.ignore_type_imports);
    }

    if let Some(options) = enabled!(rule.orphan_files_detection) {
        let orphan_options = OrphanFilesOptions {
            valid_entry_points: options.valid_entry_points.clone(),
            graph_exclude: options.graph_exclude.clone(),
            ignore_type_imports: options.ignore_type_imports,
        };
        result.orphan_files = find_orphan_files(&rule_tree, &orphan_options, &rule_root, &variants);
    }

    if !rule.module_boundaries.is_empty() {
        result.boundary_violations = check_module_boundaries(&rule_tree, &files, &rule.module_boundaries, &rule_root);
    }

    if let Some(options) = enabled!(rule.unused_node_modules_detection) {
        let used_options = UsedNodeModulesOptions {
            pkg_json_fields_with_binaries: options.pkg_json_fields_with_binaries.clone(),
            files_with_binaries: options.files_with_binaries.clone(),
            files_with_modules: options.files_with_modules.clone(),
        };
        let usages = get_used_node_modules(&rule_tree, &declared, &rule_root, &resolver.tsconfig.types, &used_options);
        let filter = module_filter(&options.include_modules, &options.exclude_modules);
        result.unused_node_modules = get_unused_node_modules(&usages, &declared, &filter);
    }

    if let Some(options) = enabled!(rule.missing_node_modules_detection) {
        let filter = module_filter(&options.include_modules, &options.exclude_modules);
        result.missing_node_modules = get_missing_node_modules(&rule_tree, &declared, &filter);
    }

    if let Some(options) = enabled!(rule.unused_exports_detection) {
        let export_options = UnusedExportsOptions {
            valid_entry_points: options.valid_entry_points.clone(),
            graph_exclude: options.graph_exclude.clone(),
            ignore_type_exports: options.ignore_type_exports,
            autofix: options.autofix,
        };
        result.unused_exports = find_unused_exports(&files, &rule_tree, &export_options, &rule_root, &variants);
    }

    if let Some(options) = enabled!(rule.unresolved_imports_detection) {
        let unresolved_options = UnresolvedImportsOptions {
            ignore: options.ignore.clone(),
            ignore_files: options.ignore_files.clone(),
            ignore_imports: options.ignore_imports.clone(),
        };
        let found = detect_unresolved_imports(&rule_tree, &declared);
        result.unresolved_imports = filter_unresolved_imports(found, &unresolved_options, &rule_root);
    }

    if let Some(options) = enabled!(rule.restricted_imports_detection) {
        let restricted_options = RestrictedImportsOptions {
            entry_points: options.entry_points.clone(),
            deny_files: options.deny_files.clone(),
            deny_modules: options.deny_modules.clone(),
            ignore_matches: options.ignore_matches.clone(),
            ignore_type_imports: options.ignore_type_imports,
        };
        result.restricted_imports = find_restricted_imports(&rule_tree, &restricted_options, &rule_root);
    }

    if let Some(options) = enabled!(rule.restricted_dev_dependencies_usage_detection) {
        let dev_dependencies: HashSet<String> = package_json.dev_dependencies.keys().cloned().collect();
        result.restricted_dev_dependencies = find_dev_dependencies_in_production(
            &rule_tree,
            &options.prod_entry_points,
            &dev_dependencies,
            options.ignore_type_imports,
            &rule_root,
        );
    }

    let sources = AliasSources { root: &resolver.root, tsconfig: &resolver.tsconfig, imports: &resolver.imports };
    for convention in &rule.import_conventions {
        let domains = compile_domains(&convention.domains(), &rule_root, &sources);
        trace!("Rule '{}': {} import convention domains", rule.path, domains.len());
        result.import_convention_violations.extend(check_import_conventions(
            &rule_tree,
            &files,
            &domains,
            &sources,
            convention.autofix,
        ));
    }
    result.import_convention_violations.sort_by(|a, b| {
        a.file_path.cmp(&b.file_path).then(a.import_index.cmp(&b.import_index))
    });

    Ok(result)
}

/// Delete orphans of rules with orphan autofix, then write the source fixes of surviving files.
/// Repaired findings are removed from the results.
fn apply_fixes(results: &mut [RuleResult], summary: &mut ConfigProcessingResult) -> Result<()> {
    let mut deleted: HashSet<String> = HashSet::new();
    for result in results.iter_mut().filter(|r| r.orphan_autofix) {
        for orphan in result.orphan_files.drain(..) {
            if deleted.contains(&orphan) {
                continue;
            }
            match fs::remove_file(to_os_path(&orphan)) {
                Ok(()) => {
                    debug!("Deleted orphan {}", orphan);
                    deleted.insert(orphan);
                }
                Err(e) => warn!("Failed to delete {}: {}", orphan, e),
            }
        }
    }
    summary.deleted_files_count = deleted.len();

    let mut changes_by_file: HashMap<String, Vec<Change>> = HashMap::new();
    for result in results.iter_mut() {
        result.unused_exports.retain(|export| match &export.fix {
            Some(fix) if !deleted.contains(&export.file_path) => {
                changes_by_file.entry(export.file_path.clone()).or_default().push(fix.clone());
                summary.fixed_exports_count += 1;
                false
            }
            _ => true,
        });
        result.import_convention_violations.retain(|violation| match &violation.fix {
            Some(fix) if !deleted.contains(&violation.file_path) => {
                changes_by_file.entry(violation.file_path.clone()).or_default().push(fix.clone());
                summary.fixed_imports_count += 1;
                false
            }
            _ => true,
        });
    }

    for changes in changes_by_file.values_mut() {
        changes.sort_by_key(|c| (c.start, c.end));
        changes.dedup();
    }
    summary.fixed_files_count = changes_by_file.len();
    apply_file_changes(changes_by_file)
}

/// Analyze `cwd` once and run every rule of `config` against the result.
pub fn process_config(config: &OxidepConfig, cwd: &str, options: &ProcessOptions) -> Result<ConfigProcessingResult> {
    let analyze_options = AnalyzeOptions {
        exclude_files: config.ignore_files.clone(),
        package_json_path: options.package_json_path.clone(),
        tsconfig_json_path: options.tsconfig_json_path.clone(),
        condition_names: config.condition_names.clone(),
        follow_monorepo_packages: FollowMonorepoPackages::All,
        parse_mode: if config.any_unused_exports() { ParseMode::Detailed } else { ParseMode::Basic },
        ..Default::default()
    };
    let tree = analyze(cwd, &analyze_options)?;
    info!("Processing {} rules over {} files", config.rules.len(), tree.files.len());

    let mut rule_results = config
        .rules
        .par_iter()
        .map(|rule| process_rule(rule, &tree, cwd).with_context(|| format!("Rule '{}' failed", rule.path)))
        .collect::<Result<Vec<_>>>()?;

    let mut summary = ConfigProcessingResult { files_analyzed: tree.files.len(), ..Default::default() };

    summary.unfixable_aliasing_count = rule_results
        .iter()
        .flat_map(|r| &r.import_convention_violations)
        .filter(|v| v.violation_type == ImportConventionViolationKind::ShouldBeAliased && v.fix.is_none())
        .count();

    if options.fix {
        apply_fixes(&mut rule_results, &mut summary)?;
    } else {
        summary.fixable_issues_count = rule_results.iter().map(RuleResult::fixable_count).sum();
    }

    summary.has_failures = rule_results.iter().any(RuleResult::has_failures);
    summary.rule_results = rule_results;
    Ok(summary)
}
