//! Byte-level import/export extractor.
//!
//! A single forward scan over the file bytes. Static `import`/`export` are only looked for
//! at brace depth zero; inside braces only `import(...)` and `require(...)` can appear, so
//! nested code takes a cheaper path that just tracks strings, comments and braces.

mod bindings;
mod scan;

use log::{debug, trace};
use rayon::prelude::*;
use std::fs;

use crate::{
    paths::to_os_path,
    types::{ExportLocation, FileImports, Import, ImportKind, KeywordInfo, ParseMode},
};

use bindings::{parse_export_bindings, parse_import_bindings, parse_local_declaration};
use scan::{
    at_word, is_whitespace, parse_expression, parse_string_literal, skip_braced_block,
    skip_comment_at, skip_optional_semicolon, skip_spaces, skip_spaces_and_comments, skip_string,
    starts_with_word,
};

/// Extract every import, re-export, `require` and dynamic import from `code`, in source order.
///
/// In [`ParseMode::Detailed`] bindings and export offsets are recorded too, and local export
/// declarations produce records with `is_local_export` set and an empty request.
pub fn parse_imports(code: &[u8], ignore_type_imports: bool, mode: ParseMode) -> Vec<Import> {
    let mut extractor = Extractor {
        code,
        ignore_type_imports,
        detailed: mode == ParseMode::Detailed,
        imports: Vec::with_capacity(32),
    };
    extractor.run();
    extractor.imports
}

/// Read and parse files in parallel. Unreadable files are skipped and counted.
pub fn parse_imports_from_files(
    paths: &[String],
    ignore_type_imports: bool,
    mode: ParseMode,
) -> (Vec<FileImports>, usize) {
    let results: Vec<Option<FileImports>> = paths
        .par_iter()
        .map(|path| match fs::read(to_os_path(path)) {
            Ok(content) => Some(FileImports {
                path: path.clone(),
                imports: parse_imports(&content, ignore_type_imports, mode),
            }),
            Err(e) => {
                debug!("Failed to read {}: {}", path, e);
                None
            }
        })
        .collect();

    let errors = results.iter().filter(|r| r.is_none()).count();
    let files: Vec<FileImports> = results.into_iter().flatten().collect();
    trace!("Parsed {} files ({} read errors)", files.len(), errors);
    (files, errors)
}

struct Extractor<'a> {
    code: &'a [u8],
    ignore_type_imports: bool,
    detailed: bool,
    imports: Vec<Import>,
}

impl Extractor<'_> {
    fn run(&mut self) {
        let code = self.code;
        let n = code.len();
        let mut depth = 0usize;
        let mut i = 0;

        while i < n {
            if depth > 0 {
                i = self.scan_nested(i, &mut depth);
                continue;
            }

            i = skip_spaces(code, i);
            if i >= n {
                break;
            }

            let b = code[i];
            if matches!(b, b'\'' | b'"' | b'`') {
                i = skip_string(code, i);
                continue;
            }
            if let Some(next) = skip_comment_at(code, i) {
                i = next;
                continue;
            }

            if at_word(code, i, "declare") && is_declare_block(code, i + 7) {
                i = skip_braced_block(code, i + 7);
            } else if at_word(code, i, "import") {
                i = self.scan_import(i + 6);
            } else if at_word(code, i, "export") {
                i = self.scan_export(i);
            } else if at_word(code, i, "require") {
                i = self.scan_require(i + 7);
            } else {
                if b == b'{' {
                    depth += 1;
                }
                i += 1;
            }
        }
    }

    /// One step inside braces: only strings, comments, braces, `import(` and `require(` matter.
    fn scan_nested(&mut self, i: usize, depth: &mut usize) -> usize {
        let code = self.code;
        match code[i] {
            b'{' => {
                *depth += 1;
                i + 1
            }
            b'}' => {
                *depth -= 1;
                i + 1
            }
            b'\'' | b'"' | b'`' => skip_string(code, i),
            b'/' => skip_comment_at(code, i).unwrap_or(i + 1),
            b'i' if at_word(code, i, "import") => {
                let j = skip_spaces(code, i + 6);
                if code.get(j) == Some(&b'(') { self.push_call(j, ImportKind::NotTypeOrMixed) } else { j }
            }
            b'r' if at_word(code, i, "require") => self.scan_require(i + 7),
            _ => i + 1,
        }
    }

    /// `( 'x' )` at `i`: record a dynamic import when the expression is a static specifier.
    fn push_call(&mut self, i: usize, kind: ImportKind) -> usize {
        let (literal, next) = parse_expression(self.code, i);
        if let Some(lit) = literal.filter(|l| !l.value.is_empty()) {
            self.imports.push(Import {
                request: lit.value,
                kind,
                request_start: lit.start,
                request_end: lit.end,
                is_dynamic_import: true,
                ..Import::default()
            });
        }
        next
    }

    fn scan_require(&mut self, i: usize) -> usize {
        let code = self.code;
        if code.get(i) == Some(&b'(') || skip_spaces(code, i) > i {
            self.push_call(i, ImportKind::NotTypeOrMixed)
        } else {
            i
        }
    }

    /// `i` points right after the `import` keyword.
    fn scan_import(&mut self, i: usize) -> usize {
        let code = self.code;
        let n = code.len();
        match code.get(i) {
            Some(&b) if is_whitespace(b) || matches!(b, b'{' | b'"' | b'\'' | b'*' | b'(') => {}
            // `import.meta`, `imports`, end of input.
            _ => return i,
        }
        let mut i = skip_spaces_and_comments(code, i);

        let mut kind = ImportKind::NotTypeOrMixed;
        let mut whole_type = false;
        if starts_with_word(code, i, "type") && !is_default_named_type(code, i) {
            kind = ImportKind::OnlyType;
            whole_type = true;
            i = skip_spaces_and_comments(code, i + 4);
        }

        match code.get(i) {
            None => return n,
            Some(b'"' | b'\'') => {
                let Some((lit, next)) = parse_string_literal(code, i) else {
                    return n;
                };
                if !lit.value.is_empty() {
                    self.imports.push(Import {
                        request: lit.value,
                        kind,
                        request_start: lit.start,
                        request_end: lit.end,
                        ..Import::default()
                    });
                }
                return next;
            }
            Some(b'(') => return self.push_call(i, kind),
            Some(_) => {}
        }

        let brace_list = code[i] == b'{';
        let Some((keywords, next)) = parse_import_bindings(code, i, whole_type) else {
            return i + 1;
        };
        if !whole_type && brace_list && keywords.iter().all(|k| k.is_type) {
            kind = ImportKind::OnlyType;
        }

        let i = skip_spaces_and_comments(code, next);
        if !at_word(code, i, "from") {
            // `import x = require('y')` and malformed statements: resume the main scan here.
            return i;
        }
        let i = skip_spaces_and_comments(code, i + 4);
        if !matches!(code.get(i), Some(b'"' | b'\'')) {
            return i;
        }
        let Some((lit, next)) = parse_string_literal(code, i) else {
            return n;
        };

        if !lit.value.is_empty() && !(self.ignore_type_imports && kind.is_type_only()) {
            self.imports.push(Import {
                request: lit.value,
                kind,
                request_start: lit.start,
                request_end: lit.end,
                keywords: self.keep_keywords(keywords),
                ..Import::default()
            });
        }
        next
    }

    /// `key_start` points at the `export` keyword.
    fn scan_export(&mut self, key_start: usize) -> usize {
        let code = self.code;
        let i = key_start + 6;
        match code.get(i) {
            Some(&b) if is_whitespace(b) || matches!(b, b'{' | b'*') => {}
            _ => return i,
        }
        let key_end = skip_spaces(code, i);
        let mut i = skip_spaces_and_comments(code, i);

        let location = ExportLocation { key_start, key_end, decl_start: key_end, ..ExportLocation::default() };

        if is_namespace_declaration(code, i) {
            if let Some((kw, _)) = parse_local_declaration(code, i) {
                self.push_local_export(kw, location);
            }
            return skip_braced_block(code, i);
        }

        if starts_local_declaration(code, i) {
            if let Some((kw, kw_next)) = parse_local_declaration(code, i) {
                let decl_start = if kw.name == "default" {
                    skip_spaces_and_comments(code, kw_next)
                } else {
                    key_end
                };
                self.push_local_export(kw, ExportLocation { decl_start, ..location });
            }
            // The declaration body is scanned normally for nested imports and requires.
            return i;
        }

        let mut kind = ImportKind::NotTypeOrMixed;
        let mut whole_type = false;
        if starts_with_word(code, i, "type") {
            let j = skip_spaces_and_comments(code, i + 4);
            if !matches!(code.get(j), Some(b'{' | b'*')) {
                // `export type Name = ...`
                if let Some((kw, _)) = parse_local_declaration(code, i) {
                    self.push_local_export(kw, location);
                }
                return j;
            }
            kind = ImportKind::OnlyType;
            whole_type = true;
            i = j;
        }

        let list = parse_export_bindings(code, i, whole_type);
        let is_brace_list = code.get(i) == Some(&b'{');
        if !whole_type && is_brace_list && list.keywords.iter().all(|k| k.is_type) {
            kind = ImportKind::OnlyType;
        }

        let after = skip_spaces_and_comments(code, list.next);
        if !at_word(code, after, "from") {
            if is_brace_list && !list.keywords.is_empty() {
                // `export { A, B }`
                let statement_end = skip_optional_semicolon(code, list.next);
                let location = ExportLocation {
                    brace_start: list.brace_start,
                    brace_end: list.brace_end,
                    statement_end,
                    ..location
                };
                if self.detailed {
                    self.imports.push(Import {
                        kind,
                        keywords: Some(list.keywords),
                        is_local_export: true,
                        export: location,
                        ..Import::default()
                    });
                }
            }
            return after.max(i + 1);
        }

        let j = skip_spaces_and_comments(code, after + 4);
        if !matches!(code.get(j), Some(b'"' | b'\'')) {
            return j;
        }
        let Some((lit, next)) = parse_string_literal(code, j) else {
            return code.len();
        };
        if !lit.value.is_empty() {
            let export = if self.detailed {
                ExportLocation {
                    brace_start: list.brace_start,
                    brace_end: list.brace_end,
                    statement_end: skip_optional_semicolon(code, next),
                    ..location
                }
            } else {
                ExportLocation::default()
            };
            self.imports.push(Import {
                request: lit.value,
                kind,
                request_start: lit.start,
                request_end: lit.end,
                keywords: self.keep_keywords(list.keywords),
                export,
                ..Import::default()
            });
        }
        next
    }

    fn push_local_export(&mut self, kw: KeywordInfo, export: ExportLocation) {
        if !self.detailed {
            return;
        }
        let kind = if kw.is_type { ImportKind::OnlyType } else { ImportKind::NotTypeOrMixed };
        self.imports.push(Import {
            kind,
            keywords: Some(vec![kw]),
            is_local_export: true,
            export,
            ..Import::default()
        });
    }

    fn keep_keywords(&self, keywords: Vec<KeywordInfo>) -> Option<Vec<KeywordInfo>> {
        (self.detailed && !keywords.is_empty()).then_some(keywords)
    }
}

/// `declare module|global|namespace` after the `declare` keyword.
fn is_declare_block(code: &[u8], i: usize) -> bool {
    let j = skip_spaces(code, i);
    ["module", "global", "namespace"].iter().any(|kw| starts_with_word(code, j, kw))
}

/// `namespace X {` or `module X {`, as opposed to a re-export that mentions `module`.
fn is_namespace_declaration(code: &[u8], i: usize) -> bool {
    for kw in ["namespace", "module"] {
        if starts_with_word(code, i, kw) {
            let j = skip_spaces_and_comments(code, i + kw.len());
            return code.get(j).is_some_and(|&b| scan::is_ident_char(b));
        }
    }
    false
}

fn starts_local_declaration(code: &[u8], i: usize) -> bool {
    [
        "default",
        "const",
        "let",
        "var",
        "function",
        "async",
        "class",
        "abstract",
        "declare",
        "enum",
        "interface",
    ]
    .iter()
    .any(|kw| starts_with_word(code, i, kw))
}

/// `import type from 'x'` imports a default binding called `type`.
fn is_default_named_type(code: &[u8], i: usize) -> bool {
    let j = skip_spaces_and_comments(code, i + 4);
    if code.get(j) == Some(&b',') {
        return true;
    }
    if !starts_with_word(code, j, "from") {
        return false;
    }
    let k = skip_spaces_and_comments(code, j + 4);
    matches!(code.get(k), Some(b'"' | b'\''))
}
