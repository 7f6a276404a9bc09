use log::trace;
use std::collections::{HashMap, HashSet};

use super::{FileIndex, ResolutionError};
use crate::{
    config::FollowMonorepoPackages,
    monorepo::MonorepoContext,
    package_json::{PackageJsonConfig, PackageJsonImports, get_node_module_name},
    paths::{join_path, parent_dir},
    tsconfig::TsConfigParsed,
    types::ResolvedKind,
};

/// Nested `#` targets followed before giving up on a chain of `imports` entries.
const MAX_IMPORTS_REDIRECTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: String,
    pub kind: ResolvedKind,
}

impl Resolved {
    fn user(path: String) -> Self {
        Resolved { path, kind: ResolvedKind::UserModule }
    }
}

/// State shared by every resolver of a manager, borrowed for one resolution.
pub(crate) struct ResolveContext<'a> {
    pub files: &'a FileIndex,
    pub monorepo: Option<&'a MonorepoContext>,
    pub follow: &'a FollowMonorepoPackages,
    pub condition_names: &'a [String],
}

/// Outcome of one resolution step: `None` when the step does not apply to the request.
type StepResult = Option<Result<Resolved, ResolutionError>>;

pub fn is_relative_request(request: &str) -> bool {
    request.starts_with("./") || request.starts_with("../") || request == "." || request == ".."
}

/// Resolves requests issued by files under one package root.
#[derive(Debug, Default)]
pub struct ModuleResolver {
    pub root: String,
    pub tsconfig: TsConfigParsed,
    pub imports: PackageJsonImports,
    /// `dependencies` and `devDependencies` of the package at `root`.
    pub node_modules: HashSet<String>,
    cache: HashMap<String, Resolved>,
}

impl ModuleResolver {
    pub fn new(
        root: &str,
        tsconfig: TsConfigParsed,
        package_json: &PackageJsonConfig,
        condition_names: &[String],
    ) -> Self {
        ModuleResolver {
            root: root.to_string(),
            tsconfig,
            imports: PackageJsonImports::parse(package_json.imports.as_ref(), condition_names),
            node_modules: package_json.node_modules(),
            cache: HashMap::new(),
        }
    }

    pub fn module_suffixes(&self) -> &[String] {
        &self.tsconfig.module_suffixes
    }

    fn with_extension(&self, module_path: &str, files: &FileIndex) -> Result<String, ResolutionError> {
        files.with_extension(module_path, &self.tsconfig.module_suffixes)
    }

    fn remember(&mut self, request: &str, resolved: Resolved) -> Resolved {
        self.cache.insert(request.to_string(), resolved.clone());
        resolved
    }

    pub(crate) fn resolve(
        &mut self,
        request: &str,
        importer: &str,
        ctx: &ResolveContext<'_>,
    ) -> Result<Resolved, ResolutionError> {
        if let Some(hit) = self.cache.get(request) {
            return Ok(hit.clone());
        }

        if is_relative_request(request) {
            let module_path = join_path(parent_dir(importer), request);
            return self.with_extension(&module_path, ctx.files).map(Resolved::user);
        }

        // Path an alias pointed at when no file exists there; it may still name a workspace package.
        let mut unresolved_target: Option<String> = None;

        if request.starts_with('#') {
            match self.resolve_package_import(request, ctx, 0) {
                Some(Ok(resolved)) => return Ok(self.remember(request, resolved)),
                Some(Err(ResolutionError::FileNotFound(path))) => unresolved_target = Some(path),
                _ => {}
            }
        }

        match self.resolve_ts_alias(request, ctx.files) {
            Some(Ok(resolved)) => return Ok(self.remember(request, resolved)),
            Some(Err(ResolutionError::FileNotFound(path))) if unresolved_target.is_none() => {
                unresolved_target = Some(path)
            }
            _ => {}
        }

        match self.resolve_workspace_import(request, ctx) {
            Some(Ok(resolved)) => return Ok(self.remember(request, resolved)),
            Some(Err(e)) => return Err(e),
            None => {}
        }

        if let Some(target) = unresolved_target.as_deref().filter(|t| *t != request) {
            match self.resolve_workspace_import(target, ctx) {
                Some(Ok(resolved)) => return Ok(self.remember(request, resolved)),
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }

        match unresolved_target {
            Some(path) => Err(ResolutionError::FileNotFound(path)),
            None => Err(ResolutionError::AliasNotResolved),
        }
    }

    /// `#`-prefixed request through the package.json `imports` field.
    fn resolve_package_import(&self, request: &str, ctx: &ResolveContext<'_>, depth: usize) -> StepResult {
        let target = self.imports.resolve(request, ctx.condition_names)?;
        if target.is_empty() {
            return None;
        }

        if target.starts_with('#') && target != request && depth < MAX_IMPORTS_REDIRECTS {
            trace!("imports entry {} redirects to {}", request, target);
            return self
                .resolve_package_import(&target, ctx, depth + 1)
                .or(Some(Err(ResolutionError::FileNotFound(target))));
        }

        // `./` targets are relative to the package root; anything else names another module.
        let module_path = if target.starts_with("./") { join_path(&self.root, &target) } else { target };
        match self.with_extension(&module_path, ctx.files) {
            Ok(path) => Some(Ok(Resolved::user(path))),
            Err(_) => Some(Err(ResolutionError::FileNotFound(module_path))),
        }
    }

    fn resolve_ts_alias(&self, request: &str, files: &FileIndex) -> StepResult {
        let (key, target) = self.tsconfig.match_alias(request)?;
        if target.is_empty() {
            trace!("Alias {} resolved to an empty target for {}", key, request);
            return Some(Err(ResolutionError::AliasNotResolved));
        }
        let module_path = join_path(&self.root, &target);
        match self.with_extension(&module_path, files) {
            Ok(path) => Some(Ok(Resolved::user(path))),
            Err(_) => Some(Err(ResolutionError::FileNotFound(module_path))),
        }
    }

    /// The consumer at this resolver's root may import `package_name`.
    fn declares_workspace_dependency(&self, monorepo: &MonorepoContext, package_name: &str) -> bool {
        if self.root == monorepo.workspace_root {
            return true;
        }
        monorepo.package_config(&self.root).is_some_and(|cfg| cfg.declares(package_name))
    }

    fn resolve_workspace_import(&self, request: &str, ctx: &ResolveContext<'_>) -> StepResult {
        let monorepo = ctx.monorepo?;
        let package_name = get_node_module_name(request);
        if !ctx.follow.follows(package_name) {
            return None;
        }
        let package_root = monorepo.package_to_path.get(package_name)?;
        if !self.declares_workspace_dependency(monorepo, package_name) {
            trace!("{} does not declare workspace dependency {}", self.root, package_name);
            return None;
        }

        let subpath = format!(".{}", &request[package_name.len()..]);

        let entry = match monorepo.package_exports(package_root, ctx.condition_names) {
            Some(exports) => {
                let target = exports.resolve(&subpath, ctx.condition_names)?;
                if target.is_empty() {
                    trace!("{} is not exported by {}", subpath, package_name);
                    return None;
                }
                target
            }
            None => {
                let config = monorepo.package_config(package_root);
                let main = config.as_ref().and_then(|cfg| {
                    cfg.module.clone().filter(|m| !m.is_empty()).or_else(|| cfg.main.clone().filter(|m| !m.is_empty()))
                });
                match main {
                    Some(main) if subpath == "." => main,
                    _ => subpath,
                }
            }
        };

        let module_path = join_path(package_root, &entry);
        Some(
            self.with_extension(&module_path, ctx.files)
                .map(|path| Resolved { path, kind: ResolvedKind::MonorepoModule }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conds() -> Vec<String> {
        vec!["import".to_string(), "default".to_string()]
    }

    fn resolver(root: &str, tsconfig: serde_json::Value, package_json: serde_json::Value) -> ModuleResolver {
        let package_json: PackageJsonConfig = serde_json::from_value(package_json).unwrap();
        ModuleResolver::new(root, TsConfigParsed::from_value(&tsconfig), &package_json, &conds())
    }

    fn resolve(
        resolver: &mut ModuleResolver,
        files: &FileIndex,
        request: &str,
    ) -> Result<Resolved, ResolutionError> {
        let condition_names = conds();
        let ctx = ResolveContext {
            files,
            monorepo: None,
            follow: &FollowMonorepoPackages::All,
            condition_names: &condition_names,
        };
        resolver.resolve(request, "/p/src/feature/a.ts", &ctx)
    }

    #[test]
    fn test_relative_requests() {
        let files = FileIndex::from_files(&["/p/src/feature/b.ts", "/p/src/utils/index.ts"]);
        let mut r = resolver("/p", json!({}), json!({}));
        assert_eq!(resolve(&mut r, &files, "./b").unwrap().path, "/p/src/feature/b.ts");
        assert_eq!(resolve(&mut r, &files, "../utils").unwrap().path, "/p/src/utils/index.ts");
        assert_eq!(
            resolve(&mut r, &files, "./missing"),
            Err(ResolutionError::FileNotFound("/p/src/feature/missing".to_string()))
        );
    }

    #[test]
    fn test_ts_alias_with_module_suffixes() {
        let tsconfig = json!({
            "compilerOptions": { "paths": { "@/*": ["./src/*"] }, "moduleSuffixes": [".ios", ""] }
        });
        let both = FileIndex::from_files(&["/p/src/button.ios.tsx", "/p/src/button.tsx"]);
        let mut r = resolver("/p", tsconfig.clone(), json!({}));
        assert_eq!(resolve(&mut r, &both, "@/button").unwrap().path, "/p/src/button.ios.tsx");

        let plain = FileIndex::from_files(&["/p/src/button.tsx"]);
        let mut r = resolver("/p", tsconfig, json!({}));
        assert_eq!(resolve(&mut r, &plain, "@/button").unwrap().path, "/p/src/button.tsx");

        let ios_only = json!({
            "compilerOptions": { "paths": { "@/*": ["./src/*"] }, "moduleSuffixes": [".ios"] }
        });
        let mut r = resolver("/p", ios_only, json!({}));
        assert_eq!(
            resolve(&mut r, &plain, "@/button"),
            Err(ResolutionError::FileNotFound("/p/src/button".to_string()))
        );
    }

    #[test]
    fn test_package_imports_win_over_ts_alias() {
        let files = FileIndex::from_files(&["/p/src/from-imports.ts", "/p/src/from-alias.ts"]);
        let mut r = resolver(
            "/p",
            json!({ "compilerOptions": { "paths": { "#shared": ["./src/from-alias"] } } }),
            json!({ "imports": { "#shared": { "import": "./src/from-imports.js", "default": "./x.js" } } }),
        );
        assert_eq!(resolve(&mut r, &files, "#shared").unwrap().path, "/p/src/from-imports.ts");
    }

    #[test]
    fn test_package_imports_wildcard_and_bare_target() {
        let files = FileIndex::from_files(&["/p/src/utils/date.ts"]);
        let mut r = resolver(
            "/p",
            json!({}),
            json!({ "imports": { "#utils/*": "./src/utils/*.js", "#lodash": "lodash" } }),
        );
        assert_eq!(resolve(&mut r, &files, "#utils/date").unwrap().path, "/p/src/utils/date.ts");
        assert_eq!(
            resolve(&mut r, &files, "#lodash"),
            Err(ResolutionError::FileNotFound("lodash".to_string()))
        );
    }

    #[test]
    fn test_nested_imports_redirect() {
        let files = FileIndex::from_files(&["/p/src/real.ts"]);
        let mut r = resolver(
            "/p",
            json!({}),
            json!({ "imports": { "#a": "#b", "#b": "./src/real.ts", "#loop": "#loop2", "#loop2": "#loop" } }),
        );
        assert_eq!(resolve(&mut r, &files, "#a").unwrap().path, "/p/src/real.ts");
        assert!(resolve(&mut r, &files, "#loop").is_err());
    }

    #[test]
    fn test_bare_request_without_alias_is_not_resolved() {
        let files = FileIndex::from_files(&["/p/src/a.ts"]);
        let mut r = resolver("/p", json!({}), json!({ "dependencies": { "react": "^18" } }));
        assert_eq!(resolve(&mut r, &files, "react"), Err(ResolutionError::AliasNotResolved));
        assert!(r.node_modules.contains("react"));
    }

    #[test]
    fn test_successful_alias_resolution_is_cached() {
        let mut files = FileIndex::from_files(&["/p/src/a.ts"]);
        let mut r = resolver("/p", json!({ "compilerOptions": { "paths": { "@/*": ["./src/*"] } } }), json!({}));
        assert_eq!(resolve(&mut r, &files, "@/a").unwrap().path, "/p/src/a.ts");
        files.insert("/p/src/a.d.ts");
        assert_eq!(resolve(&mut r, &files, "@/a").unwrap().path, "/p/src/a.ts");
    }
}
