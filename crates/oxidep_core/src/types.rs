use std::collections::HashMap;

use serde::Serialize;

/// Whether an import/export can be erased by the TypeScript compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ImportKind {
    #[default]
    NotTypeOrMixed,
    OnlyType,
}

impl ImportKind {
    pub fn is_type_only(self) -> bool {
        self == ImportKind::OnlyType
    }
}

/// Classification of a request after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum ResolvedKind {
    UserModule,
    MonorepoModule,
    NodeModule,
    BuiltInModule,
    AssetModule,
    ExcludedByUser,
    #[default]
    NotResolvedModule,
}

impl ResolvedKind {
    /// User files and workspace package files are the only kinds with an on-disk node in the tree.
    pub fn is_project_file(self) -> bool {
        matches!(self, ResolvedKind::UserModule | ResolvedKind::MonorepoModule)
    }
}

/// Extractor output granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Requests, kinds and request offsets only.
    #[default]
    Basic,
    /// Additionally records bindings and export offsets used by autofix.
    Detailed,
}

/// One binding inside an import/export list, a default binding, or a `*`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct KeywordInfo {
    /// Name as exported by the source module (`default` and `*` included).
    pub name: String,
    /// Local or public rename; empty when there is none.
    pub alias: String,
    pub start: usize,
    pub end: usize,
    /// Offset of the `,` following this entry.
    pub comma_after: Option<usize>,
    pub is_type: bool,
}

impl KeywordInfo {
    /// The name this binding is visible under after `as`.
    pub fn public_name(&self) -> &str {
        if self.alias.is_empty() { &self.name } else { &self.alias }
    }
}

/// Byte offsets of an export statement, populated in detailed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExportLocation {
    /// Start of the `export` keyword.
    pub key_start: usize,
    /// Right after `export` and the whitespace that follows it.
    pub key_end: usize,
    /// Where the declaration starts (after `default` for default exports).
    pub decl_start: usize,
    /// Position of `{` for brace-list exports, zero otherwise.
    pub brace_start: usize,
    /// Position right after `}`.
    pub brace_end: usize,
    /// Position after the whole statement including an optional `;`.
    pub statement_end: usize,
}

/// One module-referencing occurrence in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Import {
    pub request: String,
    /// Resolved path or module name, filled by the resolver.
    pub id: Option<String>,
    pub kind: ImportKind,
    pub resolved_type: ResolvedKind,
    pub request_start: usize,
    pub request_end: usize,
    pub keywords: Option<Vec<KeywordInfo>>,
    pub is_dynamic_import: bool,
    pub is_local_export: bool,
    pub export: ExportLocation,
}

impl Import {
    pub fn keyword(&self, name: &str) -> Option<&KeywordInfo> {
        self.keywords.as_ref().and_then(|kws| kws.iter().find(|k| k.name == name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileImports {
    pub path: String,
    pub imports: Vec<Import>,
}

/// Resolution-projected import record stored in the dependency tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MinimalDependency {
    pub id: Option<String>,
    pub request: String,
    pub resolved_type: ResolvedKind,
    pub import_kind: ImportKind,
    pub request_start: usize,
    pub request_end: usize,
    #[serde(skip)]
    pub is_dynamic_import: bool,
    #[serde(skip)]
    pub keywords: Option<Vec<KeywordInfo>>,
    #[serde(skip)]
    pub is_local_export: bool,
    #[serde(skip)]
    pub export: ExportLocation,
}

impl MinimalDependency {
    /// The resolved id when it points at a project file.
    pub fn project_file(&self) -> Option<&str> {
        if self.resolved_type.is_project_file() { self.id.as_deref() } else { None }
    }
}

impl From<Import> for MinimalDependency {
    fn from(imp: Import) -> Self {
        MinimalDependency {
            id: imp.id,
            request: imp.request,
            resolved_type: imp.resolved_type,
            import_kind: imp.kind,
            request_start: imp.request_start,
            request_end: imp.request_end,
            is_dynamic_import: imp.is_dynamic_import,
            keywords: imp.keywords,
            is_local_export: imp.is_local_export,
            export: imp.export,
        }
    }
}

/// Internal path -> import records in source order.
pub type MinimalDependencyTree = HashMap<String, Vec<MinimalDependency>>;

/// Collapse parsed and resolved files into the tree consumed by analyses.
pub fn to_minimal_dependency_tree(files: Vec<FileImports>) -> MinimalDependencyTree {
    files
        .into_iter()
        .map(|f| (f.path, f.imports.into_iter().map(MinimalDependency::from).collect()))
        .collect()
}
