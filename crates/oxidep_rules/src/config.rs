//! The `oxidep.config.json` rule file: lookup, parsing and validation.

use anyhow::{Context, Result, anyhow, bail};
use globset::Glob;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use oxidep_analysis::{BoundaryRule, ImportConventionDomain};
use oxidep_core::{FollowMonorepoPackages, normalize_path, parse_jsonc};

pub const CONFIG_FILE_NAMES: [&str; 4] =
    [".oxidep.config.jsonc", ".oxidep.config.json", "oxidep.config.jsonc", "oxidep.config.json"];

pub const SUPPORTED_CONFIG_VERSIONS: [&str; 4] = ["1.0", "1.1", "1.2", "1.3"];

pub const RELATIVE_INTERNAL_ABSOLUTE_EXTERNAL: &str = "relative-internal-absolute-external";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CircularImportsOptions {
    pub enabled: bool,
    #[serde(default)]
    pub ignore_type_imports: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrphanFilesDetection {
    pub enabled: bool,
    #[serde(default)]
    pub valid_entry_points: Vec<String>,
    #[serde(default)]
    pub ignore_type_imports: bool,
    #[serde(default)]
    pub graph_exclude: Vec<String>,
    #[serde(default)]
    pub autofix: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnusedNodeModulesDetection {
    pub enabled: bool,
    #[serde(default)]
    pub include_modules: Vec<String>,
    #[serde(default)]
    pub exclude_modules: Vec<String>,
    #[serde(default)]
    pub pkg_json_fields_with_binaries: Vec<String>,
    #[serde(default)]
    pub files_with_binaries: Vec<String>,
    #[serde(default)]
    pub files_with_modules: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MissingNodeModulesDetection {
    pub enabled: bool,
    #[serde(default)]
    pub include_modules: Vec<String>,
    #[serde(default)]
    pub exclude_modules: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnusedExportsDetection {
    pub enabled: bool,
    #[serde(default)]
    pub valid_entry_points: Vec<String>,
    #[serde(default)]
    pub ignore_type_exports: bool,
    #[serde(default)]
    pub graph_exclude: Vec<String>,
    #[serde(default)]
    pub autofix: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnresolvedImportsDetection {
    pub enabled: bool,
    /// File path (relative to the rule path) -> ignored request.
    #[serde(default)]
    pub ignore: HashMap<String, String>,
    #[serde(default)]
    pub ignore_files: Vec<String>,
    #[serde(default)]
    pub ignore_imports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RestrictedImportsDetection {
    pub enabled: bool,
    #[serde(default)]
    pub entry_points: Vec<String>,
    #[serde(default)]
    pub deny_files: Vec<String>,
    #[serde(default)]
    pub deny_modules: Vec<String>,
    #[serde(default)]
    pub ignore_matches: Vec<String>,
    #[serde(default)]
    pub ignore_type_imports: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RestrictedDevDependenciesUsageDetection {
    pub enabled: bool,
    #[serde(default)]
    pub prod_entry_points: Vec<String>,
    #[serde(default)]
    pub ignore_type_imports: bool,
}

/// A domain entry: a bare path, or an object with an optional alias and switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainEntry {
    Path(String),
    Detailed(DetailedDomain),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DetailedDomain {
    pub path: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl DomainEntry {
    pub fn path(&self) -> &str {
        match self {
            DomainEntry::Path(path) => path,
            DomainEntry::Detailed(domain) => &domain.path,
        }
    }

    pub fn to_domain(&self) -> ImportConventionDomain {
        match self {
            DomainEntry::Path(path) => ImportConventionDomain::new(path.clone()),
            DomainEntry::Detailed(domain) => ImportConventionDomain {
                path: domain.path.clone(),
                alias: domain.alias.clone(),
                enabled: domain.enabled.unwrap_or(true),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportConventionRule {
    pub rule: String,
    pub domains: Vec<DomainEntry>,
    #[serde(default)]
    pub autofix: bool,
}

impl ImportConventionRule {
    pub fn domains(&self) -> Vec<ImportConventionDomain> {
        self.domains.iter().map(DomainEntry::to_domain).collect()
    }
}

/// `true`, `false` or a list of workspace package names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FollowSetting {
    Flag(bool),
    Packages(Vec<String>),
}

impl Default for FollowSetting {
    fn default() -> Self {
        FollowSetting::Flag(true)
    }
}

impl FollowSetting {
    pub fn to_follow(&self) -> FollowMonorepoPackages {
        match self {
            FollowSetting::Flag(true) => FollowMonorepoPackages::All,
            FollowSetting::Flag(false) => FollowMonorepoPackages::None,
            FollowSetting::Packages(names) => {
                FollowMonorepoPackages::Packages(names.iter().map(|n| n.trim().to_string()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Rule {
    pub path: String,
    #[serde(default)]
    pub follow_monorepo_packages: FollowSetting,
    #[serde(default)]
    pub module_boundaries: Vec<BoundaryRule>,
    pub circular_imports_detection: Option<CircularImportsOptions>,
    pub orphan_files_detection: Option<OrphanFilesDetection>,
    pub unused_node_modules_detection: Option<UnusedNodeModulesDetection>,
    pub missing_node_modules_detection: Option<MissingNodeModulesDetection>,
    pub unused_exports_detection: Option<UnusedExportsDetection>,
    pub unresolved_imports_detection: Option<UnresolvedImportsDetection>,
    pub restricted_imports_detection: Option<RestrictedImportsDetection>,
    pub restricted_dev_dependencies_usage_detection: Option<RestrictedDevDependenciesUsageDetection>,
    #[serde(default)]
    pub import_conventions: Vec<ImportConventionRule>,
}

/// Enabled detection options of a rule, `None` when absent or switched off.
macro_rules! enabled {
    ($field:expr) => {
        $field.as_ref().filter(|options| options.enabled)
    };
}
pub(crate) use enabled;

impl Rule {
    /// Names of the checks this rule runs, in report order.
    pub fn enabled_checks(&self) -> Vec<&'static str> {
        let mut checks = Vec::new();
        if enabled!(self.circular_imports_detection).is_some() {
            checks.push("circular-imports");
        }
        if enabled!(self.orphan_files_detection).is_some() {
            checks.push("orphan-files");
        }
        if !self.module_boundaries.is_empty() {
            checks.push("module-boundaries");
        }
        if enabled!(self.unused_node_modules_detection).is_some() {
            checks.push("unused-node-modules");
        }
        if enabled!(self.missing_node_modules_detection).is_some() {
            checks.push("missing-node-modules");
        }
        if enabled!(self.unused_exports_detection).is_some() {
            checks.push("unused-exports");
        }
        if enabled!(self.unresolved_imports_detection).is_some() {
            checks.push("unresolved-imports");
        }
        if enabled!(self.restricted_imports_detection).is_some() {
            checks.push("restricted-imports");
        }
        if enabled!(self.restricted_dev_dependencies_usage_detection).is_some() {
            checks.push("restricted-dev-dependencies");
        }
        if !self.import_conventions.is_empty() {
            checks.push("import-conventions");
        }
        checks
    }

    pub fn orphan_autofix(&self) -> bool {
        enabled!(self.orphan_files_detection).is_some_and(|o| o.autofix)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OxidepConfig {
    pub config_version: String,
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub condition_names: Vec<String>,
    #[serde(default)]
    pub ignore_files: Vec<String>,
    pub rules: Vec<Rule>,
}

impl OxidepConfig {
    pub fn any_unused_exports(&self) -> bool {
        self.rules.iter().any(|rule| enabled!(rule.unused_exports_detection).is_some())
    }
}

/// Root fields checked before the rules, so rule errors can carry their index.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConfig {
    config_version: String,
    #[serde(rename = "$schema", default)]
    schema: Option<String>,
    #[serde(default)]
    condition_names: Vec<String>,
    #[serde(default)]
    ignore_files: Vec<String>,
    rules: Vec<Value>,
}

/// The single config file in `dir`. Several candidates at once are an error.
pub fn find_config_file(dir: &Path) -> Result<PathBuf> {
    let found: Vec<PathBuf> =
        CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).filter(|path| path.is_file()).collect();
    match found.as_slice() {
        [] => bail!("No config file found in {}", dir.display()),
        [single] => Ok(single.clone()),
        many => {
            let names: Vec<String> = many.iter().map(|p| p.display().to_string()).collect();
            bail!("Multiple config files found in {}: {} - please use only one config file", dir.display(), names.join(", "))
        }
    }
}

/// Load a config from a file, or from the config file of a directory.
pub fn load_config(path: &Path) -> Result<OxidepConfig> {
    let file = if path.is_dir() { find_config_file(path)? } else { path.to_path_buf() };
    debug!("Loading config from {}", file.display());
    let content =
        fs::read_to_string(&file).with_context(|| format!("Failed to read config {}", file.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config {}", file.display()))
}

pub fn parse_config(content: &str) -> Result<OxidepConfig> {
    let raw: RawConfig = parse_jsonc(content).context("Failed to parse config")?;

    let rules = raw
        .rules
        .into_iter()
        .enumerate()
        .map(|(i, value)| serde_json::from_value::<Rule>(value).map_err(|e| anyhow!("rules[{}]: {}", i, e)))
        .collect::<Result<Vec<_>>>()?;

    let mut config = OxidepConfig {
        config_version: raw.config_version,
        schema: raw.schema,
        condition_names: raw.condition_names,
        ignore_files: raw.ignore_files,
        rules,
    };
    validate_config(&mut config)?;
    trace!("Parsed config with {} rules", config.rules.len());
    Ok(config)
}

fn validate_pattern(pattern: &str, at: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        bail!("{}: pattern cannot be empty", at);
    }
    Glob::new(pattern.trim_start_matches("./")).map_err(|e| anyhow!("{}: invalid pattern '{}': {}", at, pattern, e))?;
    Ok(())
}

fn validate_patterns(patterns: &[String], at: &str) -> Result<()> {
    patterns.iter().enumerate().try_for_each(|(i, p)| validate_pattern(p, &format!("{at}[{i}]")))
}

fn validate_non_empty(values: &[String], at: &str) -> Result<()> {
    match values.iter().position(|v| v.trim().is_empty()) {
        Some(i) => bail!("{}[{}]: cannot be empty", at, i),
        None => Ok(()),
    }
}

fn validate_rule_path(path: &str, at: &str) -> Result<()> {
    if path.contains("../") || path == ".." {
        bail!(
            "{}: rule path '{}' contains '../' which is not allowed. Rule paths must be within the project directory",
            at,
            path
        );
    }
    if path.trim().is_empty() {
        bail!("{}: rule path cannot be empty", at);
    }
    Ok(())
}

/// `path` normalized for lookups against tree paths relative to the rule root.
fn normalize_ignore_path(path: &str) -> String {
    let normalized = normalize_path(path.trim());
    normalized.strip_prefix("./").unwrap_or(&normalized).to_string()
}

fn validate_unresolved(options: &mut UnresolvedImportsDetection, at: &str) -> Result<()> {
    validate_patterns(&options.ignore_files, &format!("{at}.ignoreFiles"))?;

    let mut ignore = HashMap::with_capacity(options.ignore.len());
    for (file, request) in &options.ignore {
        let normalized = normalize_ignore_path(file);
        if normalized.is_empty() {
            bail!("{}.ignore contains empty file path", at);
        }
        if normalized.starts_with('/') {
            bail!("{}.ignore['{}'] must be a relative path", at, file);
        }
        if normalized == ".." || normalized.starts_with("../") {
            bail!("{}.ignore['{}'] must not traverse parent directories", at, file);
        }
        let request = request.trim();
        if request.is_empty() {
            bail!("{}.ignore['{}'] cannot be empty", at, file);
        }
        ignore.insert(normalized, request.to_string());
    }
    options.ignore = ignore;

    validate_non_empty(&options.ignore_imports, &format!("{at}.ignoreImports"))?;
    options.ignore_imports = options.ignore_imports.iter().map(|r| r.trim().to_string()).collect();
    Ok(())
}

fn validate_import_convention(convention: &ImportConventionRule, at: &str) -> Result<()> {
    if convention.rule != RELATIVE_INTERNAL_ABSOLUTE_EXTERNAL {
        bail!(
            "{}.rule: unknown rule '{}'. Only '{}' is supported",
            at,
            convention.rule,
            RELATIVE_INTERNAL_ABSOLUTE_EXTERNAL
        );
    }
    if convention.domains.is_empty() {
        bail!("{}.domains cannot be empty", at);
    }

    let has_strings = convention.domains.iter().any(|d| matches!(d, DomainEntry::Path(_)));
    let has_objects = convention.domains.iter().any(|d| matches!(d, DomainEntry::Detailed(_)));
    if has_strings && has_objects {
        bail!("{}.domains cannot mix strings and objects", at);
    }

    for (i, domain) in convention.domains.iter().enumerate() {
        if domain.path().trim().is_empty() {
            bail!("{}.domains[{}].path cannot be empty", at, i);
        }
        if let DomainEntry::Detailed(detailed) = domain {
            if detailed.path.contains('*') {
                bail!("{}.domains[{}].path cannot contain wildcards", at, i);
            }
            if detailed.alias.as_deref().is_some_and(|a| a.trim().is_empty()) {
                bail!("{}.domains[{}].alias cannot be empty", at, i);
            }
        }
    }

    let paths: Vec<String> = convention.domains.iter().map(|d| normalize_path(d.path())).collect();
    for (i, a) in paths.iter().enumerate() {
        for b in &paths[i + 1..] {
            let nested = |inner: &str, outer: &str| {
                inner == outer || inner.strip_prefix(outer).is_some_and(|rest| rest.starts_with('/'))
            };
            if nested(a, b) || nested(b, a) {
                bail!("{}: nested domains not allowed: '{}' and '{}'", at, a, b);
            }
        }
    }
    Ok(())
}

fn validate_rule(rule: &mut Rule, at: &str) -> Result<()> {
    validate_rule_path(&rule.path, &format!("{at}.path"))?;

    if let FollowSetting::Packages(names) = &rule.follow_monorepo_packages {
        if names.is_empty() {
            bail!("{}.followMonorepoPackages must be a boolean or array of strings: array cannot be empty", at);
        }
        validate_non_empty(names, &format!("{at}.followMonorepoPackages"))?;
    }

    for (i, boundary) in rule.module_boundaries.iter().enumerate() {
        let at = format!("{at}.moduleBoundaries[{i}]");
        if boundary.name.trim().is_empty() {
            bail!("{}.name cannot be empty", at);
        }
        validate_pattern(&boundary.pattern, &format!("{at}.pattern"))?;
        validate_patterns(&boundary.allow, &format!("{at}.allow"))?;
        validate_patterns(&boundary.deny, &format!("{at}.deny"))?;
    }

    if let Some(orphans) = enabled!(rule.orphan_files_detection) {
        let at = format!("{at}.orphanFilesDetection");
        validate_non_empty(&orphans.valid_entry_points, &format!("{at}.validEntryPoints"))?;
        validate_patterns(&orphans.graph_exclude, &format!("{at}.graphExclude"))?;
    }

    if let Some(exports) = enabled!(rule.unused_exports_detection) {
        let at = format!("{at}.unusedExportsDetection");
        validate_non_empty(&exports.valid_entry_points, &format!("{at}.validEntryPoints"))?;
        validate_patterns(&exports.graph_exclude, &format!("{at}.graphExclude"))?;
    }

    if let Some(unused) = enabled!(rule.unused_node_modules_detection) {
        let at = format!("{at}.unusedNodeModulesDetection");
        validate_non_empty(&unused.include_modules, &format!("{at}.includeModules"))?;
        validate_non_empty(&unused.exclude_modules, &format!("{at}.excludeModules"))?;
    }

    if let Some(missing) = enabled!(rule.missing_node_modules_detection) {
        let at = format!("{at}.missingNodeModulesDetection");
        validate_non_empty(&missing.include_modules, &format!("{at}.includeModules"))?;
        validate_non_empty(&missing.exclude_modules, &format!("{at}.excludeModules"))?;
    }

    if let Some(unresolved) = rule.unresolved_imports_detection.as_mut().filter(|u| u.enabled) {
        validate_unresolved(unresolved, &format!("{at}.unresolvedImportsDetection"))?;
    }

    if let Some(restricted) = enabled!(rule.restricted_imports_detection) {
        let at = format!("{at}.restrictedImportsDetection");
        if restricted.entry_points.is_empty() {
            bail!("{}.entryPoints cannot be empty when enabled", at);
        }
        if restricted.deny_files.is_empty() && restricted.deny_modules.is_empty() {
            bail!("{}: at least one of denyFiles or denyModules is required when enabled", at);
        }
        validate_patterns(&restricted.entry_points, &format!("{at}.entryPoints"))?;
        validate_patterns(&restricted.deny_files, &format!("{at}.denyFiles"))?;
        validate_patterns(&restricted.deny_modules, &format!("{at}.denyModules"))?;
        validate_patterns(&restricted.ignore_matches, &format!("{at}.ignoreMatches"))?;
    }

    if let Some(dev) = enabled!(rule.restricted_dev_dependencies_usage_detection) {
        let at = format!("{at}.restrictedDevDependenciesUsageDetection");
        if dev.prod_entry_points.is_empty() {
            bail!("{}.prodEntryPoints cannot be empty when enabled", at);
        }
        validate_patterns(&dev.prod_entry_points, &format!("{at}.prodEntryPoints"))?;
    }

    for (i, convention) in rule.import_conventions.iter().enumerate() {
        validate_import_convention(convention, &format!("{at}.importConventions[{i}]"))?;
    }

    Ok(())
}

/// Check values serde cannot, and normalize the ones compared against paths later.
pub fn validate_config(config: &mut OxidepConfig) -> Result<()> {
    if config.config_version.trim().is_empty() {
        bail!("configVersion is required");
    }
    if !SUPPORTED_CONFIG_VERSIONS.contains(&config.config_version.as_str()) {
        bail!(
            "unsupported configVersion '{}'. Supported versions: {}",
            config.config_version,
            SUPPORTED_CONFIG_VERSIONS.join(", ")
        );
    }
    validate_patterns(&config.ignore_files, "ignoreFiles")?;
    validate_non_empty(&config.condition_names, "conditionNames")?;

    let mut seen_paths: HashSet<String> = HashSet::new();
    for (i, rule) in config.rules.iter_mut().enumerate() {
        let at = format!("rules[{i}]");
        validate_rule(rule, &at)?;
        if !seen_paths.insert(normalize_path(&rule.path)) {
            debug!("{}: path '{}' is used by more than one rule", at, rule.path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn error_of(content: &str) -> String {
        format!("{:#}", parse_config(content).unwrap_err())
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"{
                // comments and trailing commas are accepted
                "configVersion": "1.0",
                "conditionNames": ["import", "default"],
                "ignoreFiles": ["**/*.test.ts"],
                "rules": [{
                    "path": ".",
                    "followMonorepoPackages": ["@app/ui"],
                    "moduleBoundaries": [{ "name": "ui", "pattern": "src/ui/**", "allow": ["src/ui/**"] }],
                    "circularImportsDetection": { "enabled": true, "ignoreTypeImports": true },
                    "orphanFilesDetection": { "enabled": true, "validEntryPoints": ["src/index.ts"], "autofix": true },
                    "unusedExportsDetection": { "enabled": false },
                    "unresolvedImportsDetection": { "enabled": true, "ignore": { "./src/a.ts": " ./gen " } },
                    "importConventions": [{
                        "rule": "relative-internal-absolute-external",
                        "domains": [{ "path": "src/auth", "alias": "@auth" }, { "path": "src/chat", "enabled": false }],
                        "autofix": true,
                    }],
                }],
            }"#,
        )
        .unwrap();

        assert_eq!(config.condition_names, vec!["import", "default"]);
        let rule = &config.rules[0];
        assert_eq!(
            rule.follow_monorepo_packages.to_follow(),
            FollowMonorepoPackages::Packages(["@app/ui".to_string()].into_iter().collect())
        );
        assert_eq!(
            rule.enabled_checks(),
            vec!["circular-imports", "orphan-files", "module-boundaries", "unresolved-imports", "import-conventions"]
        );
        assert!(rule.orphan_autofix());
        assert!(!config.any_unused_exports());

        let unresolved = rule.unresolved_imports_detection.as_ref().unwrap();
        assert_eq!(unresolved.ignore.get("src/a.ts").map(String::as_str), Some("./gen"));

        let domains = rule.import_conventions[0].domains();
        assert_eq!(domains[0].alias.as_deref(), Some("@auth"));
        assert!(domains[0].enabled);
        assert!(!domains[1].enabled);
    }

    #[test]
    fn test_follow_monorepo_packages_defaults_to_all() {
        let config = parse_config(r#"{ "configVersion": "1.0", "rules": [{ "path": "apps/web" }] }"#).unwrap();
        assert_eq!(config.rules[0].follow_monorepo_packages.to_follow(), FollowMonorepoPackages::All);
        assert!(config.rules[0].enabled_checks().is_empty());
    }

    #[test]
    fn test_validation_errors_carry_json_path() {
        assert!(error_of(r#"{ "configVersion": "9.9", "rules": [] }"#).contains("unsupported configVersion '9.9'"));
        assert!(error_of(r#"{ "configVersion": "1.0", "rules": [], "extra": 1 }"#).contains("unknown field"));
        assert!(error_of(r#"{ "configVersion": "1.0", "rules": [{ "path": ".", "bogus": true }] }"#)
            .contains("rules[0]: unknown field `bogus`"));
        assert!(error_of(r#"{ "configVersion": "1.0", "rules": [{ "path": "../up" }] }"#)
            .contains("rules[0].path: rule path '../up' contains '../'"));
        assert!(
            error_of(
                r#"{ "configVersion": "1.0", "rules": [{ "path": ".",
                    "orphanFilesDetection": { "enabled": true, "validEntryPoints": ["a.ts", ""] } }] }"#
            )
            .contains("rules[0].orphanFilesDetection.validEntryPoints[1]: cannot be empty")
        );
        assert!(
            error_of(r#"{ "configVersion": "1.0", "rules": [{ "path": ".", "followMonorepoPackages": [] }] }"#)
                .contains("rules[0].followMonorepoPackages must be a boolean or array of strings")
        );
        assert!(
            error_of(
                r#"{ "configVersion": "1.0", "rules": [{ "path": ".",
                    "unresolvedImportsDetection": { "enabled": true, "ignore": { "../x.ts": "a" } } }] }"#
            )
            .contains("must not traverse parent directories")
        );
    }

    #[test]
    fn test_import_convention_validation() {
        let with_domains = |domains: &str| {
            format!(
                r#"{{ "configVersion": "1.0", "rules": [{{ "path": ".", "importConventions": [{{
                    "rule": "relative-internal-absolute-external", "domains": {domains} }}] }}] }}"#
            )
        };

        assert!(parse_config(&with_domains(r#"["src/*", "lib"]"#)).is_ok());
        assert!(error_of(&with_domains(r#"[]"#)).contains("rules[0].importConventions[0].domains cannot be empty"));
        assert!(error_of(&with_domains(r#"["src/a", { "path": "src/b" }]"#)).contains("cannot mix strings and objects"));
        assert!(error_of(&with_domains(r#"["src", "src/a"]"#)).contains("nested domains not allowed"));
        assert!(error_of(&with_domains(r#"[{ "path": "src/*" }]"#)).contains("cannot contain wildcards"));
        assert!(error_of(&with_domains(r#"[{ "path": "src/a", "alias": "" }]"#)).contains("alias cannot be empty"));

        let unknown_rule = r#"{ "configVersion": "1.0", "rules": [{ "path": ".", "importConventions": [{
            "rule": "absolute-everything", "domains": ["src"] }] }] }"#;
        assert!(error_of(unknown_rule).contains("unknown rule 'absolute-everything'"));
    }

    #[test]
    fn test_find_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        assert!(find_config_file(root).is_err());

        create_test_file(root, ".oxidep.config.jsonc", r#"{ "configVersion": "1.0", "rules": [] }"#);
        assert_eq!(find_config_file(root).unwrap(), root.join(".oxidep.config.jsonc"));
        assert_eq!(load_config(root).unwrap().rules.len(), 0);

        create_test_file(root, "oxidep.config.json", r#"{ "configVersion": "1.0", "rules": [] }"#);
        let err = find_config_file(root).unwrap_err().to_string();
        assert!(err.contains("Multiple config files found"));
    }
}
