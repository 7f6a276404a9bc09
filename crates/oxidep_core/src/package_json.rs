//! `package.json` model: dependency sets, the `imports` field and the `exports` field.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use crate::{
    jsonc::read_jsonc,
    pattern::{WildcardPattern, sort_by_specificity, substitute},
};

/// Fields of a `package.json` the analyzer reads. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageJsonConfig {
    pub name: String,
    pub version: String,
    pub exports: Option<Value>,
    pub imports: Option<Value>,
    pub dependencies: HashMap<String, String>,
    pub dev_dependencies: HashMap<String, String>,
    pub peer_dependencies: HashMap<String, String>,
    pub optional_dependencies: HashMap<String, String>,
    /// An array of names, or a map in older manifests.
    pub bundled_dependencies: Option<Value>,
    pub main: Option<String>,
    pub module: Option<String>,
    pub scripts: HashMap<String, String>,
    pub bin: Option<Value>,
    pub workspaces: Option<Value>,
}

impl PackageJsonConfig {
    pub fn load(path: &Path) -> Result<Self> {
        read_jsonc(path)
    }

    /// Names declared in `dependencies` and `devDependencies`.
    pub fn node_modules(&self) -> HashSet<String> {
        self.dependencies.keys().chain(self.dev_dependencies.keys()).cloned().collect()
    }

    /// Declared in any dependency section, including peer, optional and bundled ones.
    pub fn declares(&self, name: &str) -> bool {
        let bundled = match &self.bundled_dependencies {
            Some(Value::Array(names)) => names.iter().any(|n| n.as_str() == Some(name)),
            Some(Value::Object(map)) => map.contains_key(name),
            _ => false,
        };
        self.dependencies.contains_key(name)
            || self.dev_dependencies.contains_key(name)
            || self.peer_dependencies.contains_key(name)
            || self.optional_dependencies.contains_key(name)
            || bundled
    }

    /// Executables provided by this package: its own name for a string `bin`, the keys of a
    /// `bin` map otherwise.
    pub fn binaries(&self) -> Vec<String> {
        match &self.bin {
            Some(Value::String(s)) if !s.is_empty() => vec![self.name.clone()],
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Workspace globs from `workspaces` (array or `{ packages: [...] }`).
    pub fn workspace_patterns(&self) -> Vec<String> {
        let list = match &self.workspaces {
            Some(Value::Array(items)) => items,
            Some(Value::Object(obj)) => match obj.get("packages") {
                Some(Value::Array(items)) => items,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };
        list.iter().filter_map(Value::as_str).map(str::to_string).collect()
    }
}

/// Package name of a bare specifier: `@scope/name` or the first path segment.
pub fn get_node_module_name(request: &str) -> &str {
    let segments = if request.starts_with('@') { 2 } else { 1 };
    match request.match_indices('/').nth(segments - 1) {
        Some((idx, _)) => &request[..idx],
        None => request,
    }
}

/// A parsed `imports`/`exports` target: a string or a map of conditions to sub-targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    Leaf(String),
    Conditions(HashMap<String, ImportTarget>),
}

impl ImportTarget {
    /// Parse a target value. Strings with more than one `*` are rejected. `null` blocks the
    /// entry and becomes an empty leaf. Arrays use their first valid element.
    pub fn parse(value: &Value, condition_names: &[String]) -> Option<Self> {
        match value {
            Value::String(s) => (s.matches('*').count() <= 1).then(|| ImportTarget::Leaf(s.clone())),
            Value::Null => Some(ImportTarget::Leaf(String::new())),
            Value::Array(items) => items.iter().find_map(|v| Self::parse(v, condition_names)),
            Value::Object(map) => {
                let known = condition_names.iter().map(String::as_str).chain(["default"]);
                let has_known = known.clone().any(|c| map.contains_key(c));
                let children = map
                    .iter()
                    .filter(|(key, _)| !has_known || known.clone().any(|c| c == key.as_str()))
                    .filter_map(|(key, v)| Some((key.clone(), Self::parse(v, condition_names)?)))
                    .collect();
                Some(ImportTarget::Conditions(children))
            }
            _ => None,
        }
    }

    /// Descend conditions in priority order, then `default`. Empty targets are `None`.
    pub fn resolve(&self, condition_names: &[String]) -> Option<&str> {
        match self {
            ImportTarget::Leaf(s) => (!s.is_empty()).then_some(s.as_str()),
            ImportTarget::Conditions(map) => condition_names
                .iter()
                .map(String::as_str)
                .chain(["default"])
                .find_map(|c| map.get(c))
                .and_then(|child| child.resolve(condition_names)),
        }
    }
}

/// The `imports` field: `#`-prefixed private specifiers.
#[derive(Debug, Clone, Default)]
pub struct PackageJsonImports {
    targets: HashMap<String, ImportTarget>,
    patterns: Vec<WildcardPattern>,
    /// Keys whose target is a plain string, with any leading `./` removed.
    simple_targets: HashMap<String, String>,
}

impl PackageJsonImports {
    pub fn parse(imports: Option<&Value>, condition_names: &[String]) -> Self {
        let mut parsed = PackageJsonImports::default();
        let Some(Value::Object(map)) = imports else {
            return parsed;
        };

        for (key, value) in map {
            if key.matches('*').count() > 1 {
                continue;
            }
            if let Value::String(target) = value
                && !target.contains('#')
            {
                let clean = target.strip_prefix("./").unwrap_or(target);
                parsed.simple_targets.insert(key.clone(), clean.to_string());
            }
            let Some(target) = ImportTarget::parse(value, condition_names) else {
                continue;
            };
            parsed.targets.insert(key.clone(), target);
            if let Some(pattern) = WildcardPattern::parse(key) {
                parsed.patterns.push(pattern);
            }
        }

        sort_by_specificity(&mut parsed.patterns);
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn simple_targets(&self) -> &HashMap<String, String> {
        &self.simple_targets
    }

    /// Target string for `request` with the wildcard substituted.
    pub fn resolve(&self, request: &str, condition_names: &[String]) -> Option<String> {
        if let Some(target) = self.targets.get(request) {
            return target.resolve(condition_names).map(str::to_string);
        }
        // The first pattern that matches decides, even when its target is blocked.
        let pattern = self.patterns.iter().find(|p| p.capture(request).is_some())?;
        let captured = pattern.capture(request)?;
        let target = self.targets.get(&pattern.key)?.resolve(condition_names)?;
        Some(substitute(target, captured))
    }
}

/// The `exports` field of a workspace package.
#[derive(Debug, Clone, Default)]
pub struct PackageJsonExports {
    entries: HashMap<String, ImportTarget>,
    patterns: Vec<WildcardPattern>,
    /// Conditions for `.` when `exports` is a string, an array, or a map without `.` keys.
    root: Option<ImportTarget>,
}

impl PackageJsonExports {
    /// `None` when the package has no usable `exports`.
    pub fn parse(exports: Option<&Value>, condition_names: &[String]) -> Option<Self> {
        let mut parsed = PackageJsonExports::default();
        match exports? {
            Value::Object(map) if map.is_empty() => return None,
            Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => {
                for (key, value) in map {
                    if key.matches('*').count() > 1 {
                        continue;
                    }
                    if let Some(target) = ImportTarget::parse(value, condition_names) {
                        parsed.entries.insert(key.clone(), target);
                    }
                    if let Some(pattern) = WildcardPattern::parse(key) {
                        parsed.patterns.push(pattern);
                    }
                }
                sort_by_specificity(&mut parsed.patterns);
            }
            value @ (Value::Object(_) | Value::String(_) | Value::Array(_)) => {
                parsed.root = ImportTarget::parse(value, condition_names);
            }
            _ => return None,
        }
        Some(parsed)
    }

    /// Target for a subpath (`.` or `./rest`), relative to the package root.
    pub fn resolve(&self, subpath: &str, condition_names: &[String]) -> Option<String> {
        if let Some(root) = &self.root {
            // Subpaths are not exported in the sugar form.
            return if subpath == "." { root.resolve(condition_names).map(str::to_string) } else { None };
        }

        if let Some(target) = self.entries.get(subpath) {
            return target.resolve(condition_names).map(str::to_string);
        }

        // A `null` pattern target blocks the subpath instead of falling through.
        let pattern = self.patterns.iter().find(|p| p.capture(subpath).is_some())?;
        let captured = pattern.capture(subpath)?;
        let target = self.entries.get(&pattern.key)?.resolve(condition_names)?;
        Some(substitute(target, captured))
    }
}
