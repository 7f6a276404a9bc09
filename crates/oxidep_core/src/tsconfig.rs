//! `tsconfig.json` loading: `extends` chains, `compilerOptions` merging and the alias table
//! used by the resolver.

use anyhow::{Context, Result};
use log::{debug, trace, warn};
use serde_json::{Map, Value};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::{
    jsonc::read_jsonc,
    paths::{join_path, normalize_path, relative_to},
    pattern::{WildcardPattern, sort_by_specificity, substitute},
};

/// Read `path` and fold its `extends` chain into a single config object.
pub fn load_tsconfig(path: &Path) -> Result<Value> {
    let raw: Value = read_jsonc(path)?;
    let Value::Object(cfg) = raw else {
        anyhow::bail!("{} is not a JSON object", path.display());
    };
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let mut seen = HashSet::new();
    if let Ok(abs) = path.canonicalize() {
        seen.insert(abs);
    }
    Ok(Value::Object(resolve_extends(cfg, base_dir, &mut seen)))
}

fn extends_candidates(ext: &str, base_dir: &Path) -> Vec<PathBuf> {
    let as_path = Path::new(ext);
    if as_path.is_absolute() || ext.starts_with('.') || (ext.contains('/') && !ext.starts_with('@')) {
        let p = if as_path.is_absolute() { as_path.to_path_buf() } else { base_dir.join(ext) };
        let with_json = PathBuf::from(format!("{}.json", p.display()));
        vec![p, with_json]
    } else {
        let node_modules = base_dir.join("node_modules");
        vec![
            node_modules.join(ext),
            node_modules.join(ext).join("tsconfig.json"),
            node_modules.join(format!("{ext}.json")),
        ]
    }
}

fn find_base(ext: &str, base_dir: &Path) -> Option<(PathBuf, Map<String, Value>)> {
    for candidate in extends_candidates(ext, base_dir) {
        if !candidate.is_file() {
            continue;
        }
        match read_jsonc::<Value>(&candidate) {
            Ok(Value::Object(cfg)) => return Some((candidate, cfg)),
            Ok(_) => trace!("Ignoring non-object tsconfig {}", candidate.display()),
            Err(e) => trace!("Ignoring unreadable tsconfig {}: {:#}", candidate.display(), e),
        }
    }
    None
}

fn resolve_extends(
    mut cfg: Map<String, Value>,
    base_dir: &Path,
    seen: &mut HashSet<PathBuf>,
) -> Map<String, Value> {
    let extends: Vec<String> = match cfg.remove("extends") {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        Some(Value::Array(items)) => {
            items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
        }
        _ => Vec::new(),
    };

    let mut merged = Map::new();
    for ext in &extends {
        let Some((found, base_cfg)) = find_base(ext, base_dir) else {
            debug!("tsconfig extends '{}' not found from {}", ext, base_dir.display());
            continue;
        };
        let key = found.canonicalize().unwrap_or_else(|_| found.clone());
        if !seen.insert(key) {
            warn!("Skipping cyclic tsconfig extends: {}", found.display());
            continue;
        }

        let found_dir = found.parent().unwrap_or(base_dir).to_path_buf();
        let mut resolved = resolve_extends(base_cfg, &found_dir, seen);
        rebase_paths(&mut resolved, &found_dir, base_dir);
        merged = merge_configs(merged, resolved);
    }

    let mut result = merge_configs(merged, cfg);
    result.entry("compilerOptions").or_insert_with(|| Value::Object(Map::new()));
    result
}

/// Overlay `child` on `base`; `compilerOptions` are merged key by key.
fn merge_configs(mut base: Map<String, Value>, child: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in child {
        if key == "compilerOptions"
            && let Value::Object(child_co) = value
        {
            let base_co = match base.remove("compilerOptions") {
                Some(Value::Object(co)) => co,
                _ => Map::new(),
            };
            base.insert(key, Value::Object(merge_compiler_options(base_co, child_co)));
        } else {
            base.insert(key, value);
        }
    }
    base
}

fn merge_compiler_options(
    mut base: Map<String, Value>,
    child: Map<String, Value>,
) -> Map<String, Value> {
    for (key, value) in child {
        match (key.as_str(), value) {
            ("paths", Value::Object(child_paths)) => {
                let mut paths = match base.remove("paths") {
                    Some(Value::Object(p)) => p,
                    _ => Map::new(),
                };
                paths.extend(child_paths);
                base.insert(key, Value::Object(paths));
            }
            ("types", Value::Array(child_types)) => {
                let base_types = match base.remove("types") {
                    Some(Value::Array(t)) => t,
                    _ => Vec::new(),
                };
                let mut seen = HashSet::new();
                let combined: Vec<Value> = child_types
                    .into_iter()
                    .chain(base_types)
                    .filter(|t| t.as_str().is_some_and(|s| seen.insert(s.to_string())))
                    .collect();
                base.insert(key, Value::Array(combined));
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
    base
}

fn rebase_target(target: &str, from_dir: &str, to_dir: &str) -> String {
    if target.starts_with('/') {
        return target.to_string();
    }
    relative_to(&join_path(from_dir, target), to_dir)
}

/// Make relative `paths` targets and `baseUrl` of an extended config relative to `to_dir`.
fn rebase_paths(cfg: &mut Map<String, Value>, from_dir: &Path, to_dir: &Path) {
    let Some(Value::Object(co)) = cfg.get_mut("compilerOptions") else {
        return;
    };
    let from = normalize_path(from_dir);
    let to = normalize_path(to_dir);

    if let Some(Value::String(base_url)) = co.get_mut("baseUrl") {
        *base_url = rebase_target(base_url, &from, &to);
    }

    if let Some(Value::Object(paths)) = co.get_mut("paths") {
        for targets in paths.values_mut() {
            if let Value::Array(items) = targets {
                for item in items.iter_mut() {
                    if let Value::String(s) = item {
                        *s = rebase_target(s, &from, &to);
                    }
                }
            }
        }
    }
}

/// Alias targets must point into the project: no absolute paths, URLs, `node_modules/`,
/// or other scoped names.
fn is_valid_alias_target(target: &str) -> bool {
    !(target.starts_with('/')
        || target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("node_modules/")
        || target.starts_with('@'))
}

/// The parts of a merged tsconfig the resolver and analyses need.
#[derive(Debug, Clone, Default)]
pub struct TsConfigParsed {
    /// Alias key -> first target, as written (relative to the resolver root).
    pub aliases: HashMap<String, String>,
    /// Wildcard alias keys, most specific first. A `baseUrl` adds a trailing `*` entry.
    pub patterns: Vec<WildcardPattern>,
    pub module_suffixes: Vec<String>,
    pub base_url: Option<String>,
    /// The `*` alias was added for `baseUrl` rather than written in `paths`.
    pub catch_all_from_base_url: bool,
    pub types: Vec<String>,
}

impl TsConfigParsed {
    pub fn load(path: &Path) -> Result<Self> {
        let merged = load_tsconfig(path)
            .with_context(|| format!("Failed to load tsconfig {}", path.display()))?;
        Ok(Self::from_value(&merged))
    }

    pub fn from_value(cfg: &Value) -> Self {
        let mut parsed = TsConfigParsed::default();
        let Some(co) = cfg.get("compilerOptions").and_then(Value::as_object) else {
            return parsed;
        };

        if let Some(paths) = co.get("paths").and_then(Value::as_object) {
            for (key, targets) in paths {
                // Only the first target is used.
                let Some(target) = targets.as_array().and_then(|t| t.first()).and_then(Value::as_str)
                else {
                    continue;
                };
                if !is_valid_alias_target(target) {
                    trace!("Dropping tsconfig alias {} -> {}", key, target);
                    continue;
                }
                parsed.aliases.insert(key.clone(), target.to_string());
                if let Some(pattern) = WildcardPattern::parse(key) {
                    parsed.patterns.push(pattern);
                }
            }
        }

        if let Some(suffixes) = co.get("moduleSuffixes").and_then(Value::as_array) {
            parsed.module_suffixes = suffixes.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }

        if let Some(types) = co.get("types").and_then(Value::as_array) {
            parsed.types = types.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }

        sort_by_specificity(&mut parsed.patterns);

        if let Some(base_url) = co.get("baseUrl").and_then(Value::as_str) {
            parsed.base_url = Some(base_url.to_string());
            if !parsed.aliases.contains_key("*") {
                parsed.aliases.insert("*".to_string(), format!("{}/*", base_url.trim_end_matches('/')));
                parsed.patterns.push(WildcardPattern {
                    key: "*".to_string(),
                    prefix: String::new(),
                    suffix: String::new(),
                });
                parsed.catch_all_from_base_url = true;
            }
        }

        parsed
    }

    /// The alias key matching `request` and the substituted target.
    pub fn match_alias(&self, request: &str) -> Option<(&str, String)> {
        if let Some((key, target)) = self.aliases.get_key_value(request) {
            return Some((key.as_str(), target.clone()));
        }
        self.patterns.iter().find_map(|pattern| {
            let captured = pattern.capture(request)?;
            let target = self.aliases.get(&pattern.key)?;
            Some((pattern.key.as_str(), substitute(target, captured)))
        })
    }
}
