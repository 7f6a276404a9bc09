//! Binding sections of import/export statements: `Default`, `* as Ns`, `{ A, B as C, type D }`
//! and the declared name of `export const|function|class|...`.

use crate::types::KeywordInfo;

use super::scan::{
    is_ident_char, parse_identifier, parse_string_literal, skip_spaces_and_comments,
    starts_with_word,
};

/// Parsed `{ ... }` list with the offsets needed to rewrite it.
#[derive(Debug, Default)]
pub(crate) struct BraceList {
    pub keywords: Vec<KeywordInfo>,
    pub brace_start: usize,
    /// Right after `}`.
    pub brace_end: usize,
    pub next: usize,
}

/// `as Alias` at `i`, as `(alias, alias_end, next)`.
fn parse_alias(code: &[u8], i: usize) -> Option<(String, usize, usize)> {
    if !starts_with_word(code, i, "as") {
        return None;
    }
    let j = skip_spaces_and_comments(code, i + 2);
    let (alias, _, end) = parse_identifier(code, j);
    Some((alias, end, end))
}

/// Whether `type` at `i` is a modifier (`type A`, `type A as B`) rather than the binding
/// name itself (`type`, `type as X`).
fn is_type_modifier(code: &[u8], i: usize) -> bool {
    if !starts_with_word(code, i, "type") {
        return false;
    }
    let j = skip_spaces_and_comments(code, i + 4);
    match code.get(j) {
        Some(b'\'' | b'"') => true,
        Some(&b) if is_ident_char(b) => {
            if !starts_with_word(code, j, "as") {
                return true;
            }
            // `type as X` renames a binding called `type`; `type as,` marks a binding `as`.
            let k = skip_spaces_and_comments(code, j + 2);
            !code.get(k).is_some_and(|&b| is_ident_char(b))
        }
        _ => false,
    }
}

/// Parse the brace list whose `{` is at `i`.
pub(crate) fn parse_brace_list(code: &[u8], i: usize, whole_type: bool) -> BraceList {
    let n = code.len();
    let mut list = BraceList { brace_start: i, ..BraceList::default() };
    let mut i = i + 1;

    loop {
        i = skip_spaces_and_comments(code, i);
        if i >= n {
            list.brace_end = n;
            break;
        }
        if code[i] == b'}' {
            i += 1;
            list.brace_end = i;
            break;
        }
        if code[i] == b';' {
            // Unclosed list: stop at the statement boundary.
            list.brace_end = i;
            break;
        }

        let kw_start = i;
        let mut is_type = whole_type;
        if is_type_modifier(code, i) {
            is_type = true;
            i = skip_spaces_and_comments(code, i + 4);
        }

        let (name, name_end) = if matches!(code[i], b'\'' | b'"') {
            match parse_string_literal(code, i) {
                Some((lit, next)) => {
                    i = next;
                    (lit.value, next)
                }
                None => {
                    list.brace_end = n;
                    i = n;
                    break;
                }
            }
        } else {
            let (name, _, end) = parse_identifier(code, i);
            if name.is_empty() {
                i += 1;
                continue;
            }
            i = end;
            (name, end)
        };

        i = skip_spaces_and_comments(code, i);
        let (alias, end) = match parse_alias(code, i) {
            Some((alias, alias_end, next)) => {
                i = next;
                (alias, alias_end)
            }
            None => (String::new(), name_end),
        };

        list.keywords.push(KeywordInfo {
            name,
            alias,
            start: kw_start,
            end,
            comma_after: None,
            is_type,
        });

        i = skip_spaces_and_comments(code, i);
        if code.get(i) == Some(&b',') {
            if let Some(last) = list.keywords.last_mut() {
                last.comma_after = Some(i);
            }
            i += 1;
        }
    }

    list.next = i;
    list
}

/// `* as Ns` starting at the `*` at `i`. Returns the binding (if aliased) and the next position.
fn parse_namespace(code: &[u8], star: usize, whole_type: bool) -> (Option<KeywordInfo>, usize) {
    let i = skip_spaces_and_comments(code, star + 1);
    match parse_alias(code, i) {
        Some((alias, end, next)) if !alias.is_empty() => (
            Some(KeywordInfo {
                name: "*".to_string(),
                alias,
                start: star,
                end,
                comma_after: None,
                is_type: whole_type,
            }),
            next,
        ),
        Some((_, _, next)) => (None, next),
        None => (None, i),
    }
}

/// Bindings between `import [type]` and `from`.
///
/// Returns `None` for side-effect and dynamic imports, or when no binding starts at `i`.
pub(crate) fn parse_import_bindings(
    code: &[u8],
    i: usize,
    whole_type: bool,
) -> Option<(Vec<KeywordInfo>, usize)> {
    let i = skip_spaces_and_comments(code, i);
    let &first = code.get(i)?;

    match first {
        b'"' | b'\'' | b'(' => None,
        b'*' => {
            let (kw, next) = parse_namespace(code, i, whole_type);
            Some((kw.into_iter().collect(), next))
        }
        b'{' => {
            let list = parse_brace_list(code, i, whole_type);
            Some((list.keywords, skip_spaces_and_comments(code, list.next)))
        }
        _ => {
            let (name, start, end) = parse_identifier(code, i);
            if name.is_empty() {
                return None;
            }
            let mut keywords = vec![KeywordInfo {
                name: "default".to_string(),
                alias: name,
                start,
                end,
                comma_after: None,
                is_type: whole_type,
            }];

            let mut i = skip_spaces_and_comments(code, end);
            if code.get(i) == Some(&b',') {
                keywords[0].comma_after = Some(i);
                i = skip_spaces_and_comments(code, i + 1);
                match code.get(i) {
                    Some(b'*') => {
                        let (kw, next) = parse_namespace(code, i, whole_type);
                        keywords.extend(kw);
                        i = next;
                    }
                    Some(b'{') => {
                        let list = parse_brace_list(code, i, whole_type);
                        keywords.extend(list.keywords);
                        i = skip_spaces_and_comments(code, list.next);
                    }
                    _ => {}
                }
            }
            Some((keywords, i))
        }
    }
}

/// Bindings after `export [type]`: `*`, `* as Name` or a brace list.
pub(crate) fn parse_export_bindings(code: &[u8], i: usize, whole_type: bool) -> BraceList {
    let i = skip_spaces_and_comments(code, i);
    match code.get(i) {
        Some(b'*') => {
            let star = i;
            let j = skip_spaces_and_comments(code, star + 1);
            let (alias, end, next) = parse_alias(code, j).unwrap_or((String::new(), star + 1, j));
            BraceList {
                keywords: vec![KeywordInfo {
                    name: "*".to_string(),
                    alias,
                    start: star,
                    end,
                    comma_after: None,
                    is_type: whole_type,
                }],
                brace_start: 0,
                brace_end: 0,
                next,
            }
        }
        Some(b'{') => parse_brace_list(code, i, whole_type),
        _ => BraceList { next: i, ..BraceList::default() },
    }
}

/// Name declared after a keyword, optionally skipping a generator `*`.
fn declared_name(code: &[u8], i: usize, is_type: bool) -> Option<(KeywordInfo, usize)> {
    let mut j = skip_spaces_and_comments(code, i);
    if code.get(j) == Some(&b'*') {
        j = skip_spaces_and_comments(code, j + 1);
    }
    let (name, start, end) = parse_identifier(code, j);
    if name.is_empty() {
        return None;
    }
    Some((KeywordInfo { name, start, end, is_type, ..KeywordInfo::default() }, end))
}

/// The identifier declared by `export <declaration>` starting at `i`.
///
/// `default` yields a binding named `default` spanning the keyword. Types, interfaces and
/// enums are flagged as type bindings.
pub(crate) fn parse_local_declaration(code: &[u8], i: usize) -> Option<(KeywordInfo, usize)> {
    let mut i = skip_spaces_and_comments(code, i);

    if starts_with_word(code, i, "default") {
        let kw = KeywordInfo {
            name: "default".to_string(),
            start: i,
            end: i + 7,
            ..KeywordInfo::default()
        };
        return Some((kw, i + 7));
    }

    for modifier in ["declare", "abstract"] {
        if starts_with_word(code, i, modifier) {
            i = skip_spaces_and_comments(code, i + modifier.len());
        }
    }

    if starts_with_word(code, i, "async") {
        let j = skip_spaces_and_comments(code, i + 5);
        if starts_with_word(code, j, "function") {
            return declared_name(code, j + 8, false);
        }
        return None;
    }

    for kw in ["const", "let", "var"] {
        if starts_with_word(code, i, kw) {
            let j = skip_spaces_and_comments(code, i + kw.len());
            if starts_with_word(code, j, "enum") {
                return declared_name(code, j + 4, true);
            }
            return declared_name(code, j, false);
        }
    }

    for kw in ["function", "class", "namespace", "module"] {
        if starts_with_word(code, i, kw) {
            return declared_name(code, i + kw.len(), false);
        }
    }

    for kw in ["type", "interface", "enum"] {
        if starts_with_word(code, i, kw) {
            return declared_name(code, i + kw.len(), true);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(kws: &[KeywordInfo]) -> Vec<(String, String, bool)> {
        kws.iter().map(|k| (k.name.clone(), k.alias.clone(), k.is_type)).collect()
    }

    fn kw(name: &str, alias: &str, is_type: bool) -> (String, String, bool) {
        (name.to_string(), alias.to_string(), is_type)
    }

    #[test]
    fn test_default_and_named_bindings() {
        let code = b"React, { useState as S, type FC } from 'react'";
        let (kws, next) = parse_import_bindings(code, 0, false).unwrap();
        assert_eq!(
            names(&kws),
            vec![kw("default", "React", false), kw("useState", "S", false), kw("FC", "", true)]
        );
        assert!(code[next..].starts_with(b"from"));
    }

    #[test]
    fn test_namespace_binding_offsets() {
        let code = b"* as path from 'path'";
        let (kws, _) = parse_import_bindings(code, 0, false).unwrap();
        assert_eq!(names(&kws), vec![kw("*", "path", false)]);
        assert_eq!(&code[kws[0].start..kws[0].end], b"* as path");
    }

    #[test]
    fn test_side_effect_has_no_bindings() {
        assert!(parse_import_bindings(b"'./polyfill'", 0, false).is_none());
    }

    #[test]
    fn test_type_as_binding_name() {
        let code = b"{ type, type as T2, type as } from 'x'";
        let list = parse_brace_list(code, 0, false);
        assert_eq!(
            names(&list.keywords),
            vec![kw("type", "", false), kw("type", "T2", false), kw("as", "", true)]
        );
    }

    #[test]
    fn test_string_names_and_comma_offsets() {
        let code = b"{ 'a-b' as ab, C , D }";
        let list = parse_brace_list(code, 0, false);
        assert_eq!(names(&list.keywords), vec![kw("a-b", "ab", false), kw("C", "", false), kw("D", "", false)]);
        assert_eq!(list.keywords[0].comma_after, Some(13));
        assert_eq!(list.keywords[1].comma_after, Some(17));
        assert_eq!(list.keywords[2].comma_after, None);
        assert_eq!(list.brace_start, 0);
        assert_eq!(list.brace_end, code.len());
    }

    #[test]
    fn test_export_star_bindings() {
        let list = parse_export_bindings(b"* from './a'", 0, false);
        assert_eq!(names(&list.keywords), vec![kw("*", "", false)]);
        let list = parse_export_bindings(b"* as ns from './a'", 0, true);
        assert_eq!(names(&list.keywords), vec![kw("*", "ns", true)]);
    }

    #[test]
    fn test_local_declarations() {
        let cases: &[(&[u8], &str, bool)] = &[
            (b"const a = 1", "a", false),
            (b"async function* gen() {}", "gen", false),
            (b"function f() {}", "f", false),
            (b"abstract class Base {}", "Base", false),
            (b"declare const VERSION: string", "VERSION", false),
            (b"const enum Dir {}", "Dir", true),
            (b"interface Props {}", "Props", true),
            (b"type Id = string", "Id", true),
            (b"default class {}", "default", false),
        ];
        for (code, name, is_type) in cases {
            let (kw, _) = parse_local_declaration(code, 0).unwrap();
            assert_eq!((kw.name.as_str(), kw.is_type), (*name, *is_type));
        }
        assert!(parse_local_declaration(b"= foo", 0).is_none());
    }
}
