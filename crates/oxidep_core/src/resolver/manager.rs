use log::{debug, trace};
use std::collections::HashSet;

use super::{
    FileIndex, ModuleResolver, ResolutionError, Resolved,
    module_resolver::ResolveContext,
};
use crate::{
    config::FollowMonorepoPackages,
    constants::split_source_extension,
    glob::GlobMatcher,
    monorepo::{MonorepoContext, detect_monorepo},
    package_json::PackageJsonConfig,
    paths::{is_within_dir, to_os_path},
    tsconfig::TsConfigParsed,
};

/// Manifests of the analyzed directory, used for the root resolver outside a monorepo.
#[derive(Debug, Clone, Default)]
pub struct RootParams {
    pub cwd: String,
    pub tsconfig: TsConfigParsed,
    pub package_json: PackageJsonConfig,
}

/// One resolver per workspace package plus a root resolver, over a shared [`FileIndex`].
#[derive(Debug)]
pub struct ResolverManager {
    monorepo: Option<MonorepoContext>,
    /// Package resolvers, longest root first.
    packages: Vec<ModuleResolver>,
    root: ModuleResolver,
    files: FileIndex,
    follow: FollowMonorepoPackages,
    condition_names: Vec<String>,
}

fn resolver_for_dir(dir: &str, monorepo: &MonorepoContext, condition_names: &[String]) -> ModuleResolver {
    let tsconfig_path = to_os_path(dir).join("tsconfig.json");
    let tsconfig = if tsconfig_path.is_file() {
        TsConfigParsed::load(&tsconfig_path).unwrap_or_else(|e| {
            debug!("Ignoring tsconfig of {}: {:#}", dir, e);
            TsConfigParsed::default()
        })
    } else {
        TsConfigParsed::default()
    };
    let package_json = monorepo.package_config(dir).map(|cfg| (*cfg).clone()).unwrap_or_default();
    ModuleResolver::new(dir, tsconfig, &package_json, condition_names)
}

impl ResolverManager {
    pub fn new(
        root_params: RootParams,
        files: &[String],
        follow: FollowMonorepoPackages,
        condition_names: Vec<String>,
        exclude: &[GlobMatcher],
    ) -> Self {
        let monorepo = if follow.is_enabled() {
            detect_monorepo(&root_params.cwd).map(|mut ctx| {
                ctx.find_workspace_packages(exclude);
                ctx
            })
        } else {
            None
        };

        let (root, packages) = match &monorepo {
            Some(ctx) => {
                let root = resolver_for_dir(&ctx.workspace_root, ctx, &condition_names);
                let packages = ctx
                    .package_dirs()
                    .iter()
                    .map(|dir| resolver_for_dir(dir, ctx, &condition_names))
                    .collect();
                (root, packages)
            }
            None => {
                let root = ModuleResolver::new(
                    &root_params.cwd,
                    root_params.tsconfig,
                    &root_params.package_json,
                    &condition_names,
                );
                (root, Vec::new())
            }
        };

        let files = FileIndex::from_files(files);
        debug!(
            "Created resolver manager: {} package resolvers, {} indexed paths",
            packages.len(),
            files.len()
        );

        ResolverManager { monorepo, packages, root, files, follow, condition_names }
    }

    fn resolver_index_for_file(&self, path: &str) -> Option<usize> {
        self.packages.iter().position(|r| is_within_dir(path, &r.root))
    }

    /// The resolver whose package root is the longest directory prefix of `path`.
    pub fn resolver_for_file(&self, path: &str) -> &ModuleResolver {
        match self.resolver_index_for_file(path) {
            Some(idx) => &self.packages[idx],
            None => &self.root,
        }
    }

    pub fn root_resolver(&self) -> &ModuleResolver {
        &self.root
    }

    pub fn resolvers(&self) -> impl Iterator<Item = &ModuleResolver> {
        std::iter::once(&self.root).chain(self.packages.iter())
    }

    pub fn resolve(&mut self, request: &str, importer: &str) -> Result<Resolved, ResolutionError> {
        let ctx = ResolveContext {
            files: &self.files,
            monorepo: self.monorepo.as_ref(),
            follow: &self.follow,
            condition_names: &self.condition_names,
        };
        let resolver = match self.packages.iter().position(|r| is_within_dir(importer, &r.root)) {
            Some(idx) => &mut self.packages[idx],
            None => &mut self.root,
        };
        let result = resolver.resolve(request, importer, &ctx);
        trace!("{} from {} -> {:?}", request, importer, result);
        result
    }

    /// Index a file discovered while resolving.
    pub fn add_file(&mut self, path: &str) {
        self.files.insert(path);
    }

    pub fn file_index(&self) -> &FileIndex {
        &self.files
    }

    pub fn monorepo(&self) -> Option<&MonorepoContext> {
        self.monorepo.as_ref()
    }

    pub fn condition_names(&self) -> &[String] {
        &self.condition_names
    }

    /// A registered workspace package the manager walks into.
    pub fn is_followed_workspace_package(&self, name: &str) -> bool {
        self.monorepo.as_ref().is_some_and(|ctx| ctx.package_to_path.contains_key(name))
            && self.follow.follows(name)
    }

    /// Union of the declared dependencies of every resolver.
    pub fn collect_all_node_modules(&self) -> HashSet<String> {
        self.resolvers().flat_map(|r| r.node_modules.iter().cloned()).collect()
    }

    /// Files that are alternatives of another file under their resolver's `moduleSuffixes`,
    /// e.g. `button.android.tsx` next to `button.ios.tsx`.
    pub fn detect_module_suffix_variants(&self, files: &[String]) -> HashSet<String> {
        let mut variants = HashSet::new();
        for file in files {
            let suffixes = self.resolver_for_file(file).module_suffixes();
            if suffixes.is_empty() {
                continue;
            }
            let Some((stem, _)) = split_source_extension(file) else {
                continue;
            };

            let is_variant = suffixes.iter().any(|suffix| {
                let Some(base) = stem.strip_suffix(suffix.as_str()) else {
                    return false;
                };
                suffixes
                    .iter()
                    .filter(|other| *other != suffix)
                    .any(|other| self.files.contains(&format!("{base}{other}")))
            });
            if is_variant {
                variants.insert(file.clone());
            }
        }
        variants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{paths::normalize_path, types::ResolvedKind};
    use pretty_assertions::assert_eq;
    use std::{fs, path::{Path, PathBuf}};
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn conds() -> Vec<String> {
        vec!["import".to_string(), "default".to_string()]
    }

    fn mock_monorepo(root: &Path) -> Vec<String> {
        create_test_file(root, "package.json", r#"{ "workspaces": ["packages/*"] }"#);
        create_test_file(
            root,
            "packages/lib/package.json",
            r#"{
                "name": "@acme/lib",
                "exports": {
                    ".": "./src/index.ts",
                    "./features/feature-a": "./src/features/feature-a.ts",
                    "./features/*.js": "./dist/features/*.js",
                    "./internal/*": null
                }
            }"#,
        );
        create_test_file(root, "packages/plain/package.json", r#"{ "name": "plain", "main": "lib/main.js" }"#);
        create_test_file(
            root,
            "packages/app/package.json",
            r#"{ "name": "app", "dependencies": { "@acme/lib": "workspace:*", "plain": "*" } }"#,
        );
        create_test_file(root, "packages/other/package.json", r#"{ "name": "other" }"#);
        let files = [
            "packages/lib/src/index.ts",
            "packages/lib/src/features/feature-a.ts",
            "packages/lib/dist/features/x.js",
            "packages/lib/internal/secret.ts",
            "packages/plain/lib/main.js",
            "packages/plain/lib/util.js",
            "packages/app/src/index.ts",
            "packages/other/index.ts",
        ];
        files
            .iter()
            .map(|f| normalize_path(create_test_file(root, f, "")))
            .collect()
    }

    fn manager(root: &Path, files: &[String], follow: FollowMonorepoPackages) -> ResolverManager {
        let params = RootParams { cwd: normalize_path(root), ..Default::default() };
        ResolverManager::new(params, files, follow, conds(), &[])
    }

    #[test]
    fn test_resolver_for_file_prefers_longest_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "workspaces": ["packages/*", "packages/a/nested"] }"#);
        create_test_file(root, "packages/a/package.json", r#"{ "name": "a" }"#);
        create_test_file(root, "packages/ab/package.json", r#"{ "name": "ab" }"#);
        create_test_file(root, "packages/a/nested/package.json", r#"{ "name": "nested" }"#);

        let m = manager(root, &[], FollowMonorepoPackages::All);
        let base = normalize_path(root);
        assert_eq!(
            m.monorepo().and_then(|ctx| ctx.package_to_path.get("nested")),
            Some(&format!("{base}/packages/a/nested"))
        );
        assert_eq!(
            m.resolver_for_file(&format!("{base}/packages/a/nested/x.ts")).root,
            format!("{base}/packages/a/nested")
        );
        assert_eq!(m.resolver_for_file(&format!("{base}/packages/ab/x.ts")).root, format!("{base}/packages/ab"));
        assert_eq!(m.resolver_for_file(&format!("{base}/packages/a/x.ts")).root, format!("{base}/packages/a"));
        assert_eq!(m.resolver_for_file(&format!("{base}/scripts/x.ts")).root, base);
    }

    #[test]
    fn test_workspace_exports_specificity() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let files = mock_monorepo(root);
        let mut m = manager(root, &files, FollowMonorepoPackages::All);
        let base = normalize_path(root);
        let importer = format!("{base}/packages/app/src/index.ts");

        let exact = m.resolve("@acme/lib/features/feature-a", &importer).unwrap();
        assert_eq!(exact.path, format!("{base}/packages/lib/src/features/feature-a.ts"));
        assert_eq!(exact.kind, ResolvedKind::MonorepoModule);

        let wildcard = m.resolve("@acme/lib/features/x.js", &importer).unwrap();
        assert_eq!(wildcard.path, format!("{base}/packages/lib/dist/features/x.js"));

        let main = m.resolve("@acme/lib", &importer).unwrap();
        assert_eq!(main.path, format!("{base}/packages/lib/src/index.ts"));

        assert_eq!(m.resolve("@acme/lib/internal/secret", &importer), Err(ResolutionError::AliasNotResolved));
    }

    #[test]
    fn test_workspace_main_and_subpath_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let files = mock_monorepo(root);
        let mut m = manager(root, &files, FollowMonorepoPackages::All);
        let base = normalize_path(root);
        let importer = format!("{base}/packages/app/src/index.ts");

        assert_eq!(m.resolve("plain", &importer).unwrap().path, format!("{base}/packages/plain/lib/main.js"));
        assert_eq!(
            m.resolve("plain/lib/util", &importer).unwrap().path,
            format!("{base}/packages/plain/lib/util.js")
        );
    }

    #[test]
    fn test_undeclared_workspace_dependency_is_not_resolved() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let files = mock_monorepo(root);
        let mut m = manager(root, &files, FollowMonorepoPackages::All);
        let base = normalize_path(root);

        let from_other = format!("{base}/packages/other/index.ts");
        assert_eq!(m.resolve("@acme/lib", &from_other), Err(ResolutionError::AliasNotResolved));

        let from_root = format!("{base}/scripts/build.ts");
        assert!(m.resolve("@acme/lib", &from_root).is_ok());
    }

    #[test]
    fn test_follow_list_limits_workspace_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let files = mock_monorepo(root);
        let follow = FollowMonorepoPackages::Packages(["plain".to_string()].into_iter().collect());
        let mut m = manager(root, &files, follow);
        let base = normalize_path(root);
        let importer = format!("{base}/packages/app/src/index.ts");

        assert!(m.resolve("plain", &importer).is_ok());
        assert_eq!(m.resolve("@acme/lib", &importer), Err(ResolutionError::AliasNotResolved));
        assert!(m.is_followed_workspace_package("plain"));
        assert!(!m.is_followed_workspace_package("@acme/lib"));
    }

    #[test]
    fn test_no_monorepo_when_not_following() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let files = mock_monorepo(root);
        let m = manager(root, &files, FollowMonorepoPackages::None);
        assert!(m.monorepo().is_none());
        assert_eq!(m.resolvers().count(), 1);
    }

    #[test]
    fn test_module_suffix_variants() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "tsconfig.json",
            r#"{ "compilerOptions": { "moduleSuffixes": [".ios", ".android", ""] } }"#,
        );
        let base = normalize_path(root);
        let files: Vec<String> = ["src/button.ios.tsx", "src/button.android.tsx", "src/other.ts"]
            .iter()
            .map(|f| format!("{base}/{f}"))
            .collect();
        let params = RootParams {
            cwd: base.clone(),
            tsconfig: TsConfigParsed::load(&root.join("tsconfig.json")).unwrap(),
            ..Default::default()
        };
        let m = ResolverManager::new(params, &files, FollowMonorepoPackages::None, conds(), &[]);
        let mut variants: Vec<String> = m.detect_module_suffix_variants(&files).into_iter().collect();
        variants.sort();
        assert_eq!(
            variants,
            vec![format!("{base}/src/button.android.tsx"), format!("{base}/src/button.ios.tsx")]
        );
    }
}
