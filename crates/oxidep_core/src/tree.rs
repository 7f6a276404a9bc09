//! Dependency-tree builder: parse, resolve, follow newly reached files until nothing is left.

use log::{debug, trace, warn};
use rayon::prelude::*;
use std::{
    collections::HashSet,
    fs,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    constants::{is_asset_path, is_builtin_module},
    discovery::find_missing_file,
    glob::{GlobMatcher, matches_any},
    package_json::get_node_module_name,
    parser::{parse_imports, parse_imports_from_files},
    paths::to_os_path,
    resolver::{ResolutionError, ResolverManager},
    types::{FileImports, Import, MinimalDependencyTree, ParseMode, ResolvedKind, to_minimal_dependency_tree},
};

/// Output of a build: the tree, its sorted file list and the resolvers used to produce it.
#[derive(Debug)]
pub struct DependencyTree {
    pub tree: MinimalDependencyTree,
    /// Every analyzed file, sorted, without user-excluded files.
    pub files: Vec<String>,
    pub resolver: ResolverManager,
    /// Source files that could not be read.
    pub read_failures: usize,
}

impl DependencyTree {
    /// Files that only exist as `moduleSuffixes` alternatives of another file.
    pub fn module_suffix_variants(&self) -> HashSet<String> {
        self.resolver.detect_module_suffix_variants(&self.files)
    }
}

/// State mutated while workers resolve imports.
struct BuildState {
    manager: ResolverManager,
    discovered: HashSet<String>,
    /// Paths already probed on disk without success.
    failed_attempts: HashSet<String>,
    files: Vec<String>,
    excluded: HashSet<String>,
    read_failures: usize,
}

enum Outcome {
    Done,
    /// Resolved to a file that may need to be followed.
    Follow(String, ResolvedKind),
    /// An alias or relative path matched but nothing is indexed there.
    Probe(String),
}

pub struct TreeBuilder<'a> {
    state: Mutex<BuildState>,
    exclude: &'a [GlobMatcher],
    ignore_type_imports: bool,
    parse_mode: ParseMode,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        manager: ResolverManager,
        exclude: &'a [GlobMatcher],
        ignore_type_imports: bool,
        parse_mode: ParseMode,
    ) -> Self {
        TreeBuilder {
            state: Mutex::new(BuildState {
                manager,
                discovered: HashSet::new(),
                failed_attempts: HashSet::new(),
                files: Vec::new(),
                excluded: HashSet::new(),
                read_failures: 0,
            }),
            exclude,
            ignore_type_imports,
            parse_mode,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BuildState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse `files`, resolve every import and follow resolved files outside the initial set.
    pub fn build(self, files: Vec<String>) -> DependencyTree {
        let (parsed, read_failures) =
            parse_imports_from_files(&files, self.ignore_type_imports, self.parse_mode);
        {
            let mut state = self.lock();
            state.discovered.extend(files.iter().cloned());
            state.files = parsed.iter().map(|f| f.path.clone()).collect();
            state.read_failures = read_failures;
        }

        let mut resolved: Vec<FileImports> = Vec::with_capacity(parsed.len());
        let mut pending = parsed;
        let mut wave = 0;
        while !pending.is_empty() {
            wave += 1;
            trace!("Resolving wave {} with {} files", wave, pending.len());
            let results: Vec<(FileImports, Vec<FileImports>)> =
                pending.into_par_iter().map(|file| self.resolve_file(file)).collect();
            pending = Vec::new();
            for (file, reached) in results {
                resolved.push(file);
                pending.extend(reached);
            }
        }

        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        let exclude = self.exclude;

        let mut files: Vec<String> =
            state.files.into_iter().filter(|f| !matches_any(f, exclude)).collect();
        files.sort();
        files.dedup();

        resolved.retain(|f| !matches_any(&f.path, exclude));
        let mut tree = to_minimal_dependency_tree(resolved);
        for path in state.excluded {
            tree.entry(path).or_default();
        }

        debug!("Built dependency tree: {} files, {} entries", files.len(), tree.len());
        DependencyTree { tree, files, resolver: state.manager, read_failures: state.read_failures }
    }

    /// Read and parse a file reached through resolution, unless another worker already claimed it.
    fn discover(&self, path: &str) -> Option<FileImports> {
        if !self.lock().discovered.insert(path.to_string()) {
            return None;
        }
        match fs::read(to_os_path(path)) {
            Ok(content) => {
                let imports = parse_imports(&content, self.ignore_type_imports, self.parse_mode);
                let mut state = self.lock();
                state.files.push(path.to_string());
                state.manager.add_file(path);
                trace!("Discovered {} during resolution", path);
                Some(FileImports { path: path.to_string(), imports })
            }
            Err(e) => {
                warn!("Could not read resolved file '{}': {}", path, e);
                self.lock().read_failures += 1;
                None
            }
        }
    }

    /// Record a resolved project file, following it when it is new.
    fn accept(&self, imp: &mut Import, path: String, kind: ResolvedKind, reached: &mut Vec<FileImports>) {
        if matches_any(&path, self.exclude) {
            self.lock().excluded.insert(path.clone());
            imp.id = Some(path);
            imp.resolved_type = ResolvedKind::ExcludedByUser;
            return;
        }
        reached.extend(self.discover(&path));
        imp.id = Some(path);
        imp.resolved_type = kind;
    }

    fn classify(&self, importer: &str, imp: &mut Import) -> Outcome {
        let module_name = get_node_module_name(&imp.request);
        if is_builtin_module(module_name) {
            imp.id = Some(module_name.to_string());
            imp.resolved_type = ResolvedKind::BuiltInModule;
            return Outcome::Done;
        }

        let mut state = self.lock();
        let error = match state.manager.resolve(&imp.request, importer) {
            Ok(resolved) => return Outcome::Follow(resolved.path, resolved.kind),
            Err(e) => e,
        };

        let node_modules = &state.manager.resolver_for_file(importer).node_modules;
        let mut name = module_name;
        // An alias may point into an installed package, e.g. `#fp` -> `lodash/fp`.
        if let ResolutionError::FileNotFound(path) = &error
            && path != &imp.request
            && node_modules.contains(get_node_module_name(path))
        {
            name = get_node_module_name(path);
        }

        if node_modules.contains(name) && !state.manager.is_followed_workspace_package(name) {
            imp.id = Some(name.to_string());
            imp.resolved_type = ResolvedKind::NodeModule;
            return Outcome::Done;
        }

        match error {
            ResolutionError::FileNotFound(path) if !state.failed_attempts.contains(&path) => {
                Outcome::Probe(path)
            }
            _ => Outcome::Done,
        }
    }

    /// Kind of a file found by probing the disk: files of another workspace package are
    /// monorepo modules.
    fn probed_kind(&self, importer: &str, path: &str) -> ResolvedKind {
        let state = self.lock();
        let owner = &state.manager.resolver_for_file(path).root;
        let is_other_package = state.manager.monorepo().is_some_and(|ctx| {
            ctx.package_to_path.values().any(|dir| dir == owner)
                && state.manager.resolver_for_file(importer).root != *owner
        });
        if is_other_package { ResolvedKind::MonorepoModule } else { ResolvedKind::UserModule }
    }

    fn probe(&self, importer: &str, imp: &mut Import, module_path: String, reached: &mut Vec<FileImports>) {
        let suffixes = self.lock().manager.resolver_for_file(importer).module_suffixes().to_vec();
        if let Some(found) = find_missing_file(&module_path, &suffixes) {
            let kind = self.probed_kind(importer, &found);
            self.accept(imp, found, kind, reached);
            return;
        }

        if is_asset_path(&module_path) {
            if to_os_path(&module_path).exists() {
                imp.id = Some(module_path);
                imp.resolved_type = ResolvedKind::AssetModule;
                return;
            }
            warn!("Asset import '{}' not found in {}", module_path, importer);
        } else {
            warn!("Import '{}' in '{}' could not be resolved to a file", imp.request, importer);
        }
        self.lock().failed_attempts.insert(module_path);
    }

    fn resolve_file(&self, mut file: FileImports) -> (FileImports, Vec<FileImports>) {
        let mut reached = Vec::new();
        let importer = file.path.clone();
        for imp in file.imports.iter_mut() {
            match self.classify(&importer, imp) {
                Outcome::Done => {}
                Outcome::Follow(path, kind) => self.accept(imp, path, kind, &mut reached),
                Outcome::Probe(path) => self.probe(&importer, imp, path, &mut reached),
            }
        }
        (file, reached)
    }
}

/// Build a dependency tree over `files` with the default worker setup.
pub fn build_dependency_tree(
    files: Vec<String>,
    manager: ResolverManager,
    exclude: &[GlobMatcher],
    ignore_type_imports: bool,
    parse_mode: ParseMode,
) -> DependencyTree {
    TreeBuilder::new(manager, exclude, ignore_type_imports, parse_mode).build(files)
}
