//! Byte-level cursor helpers shared by the extractor.
//!
//! Every helper takes the source and a cursor and returns the new cursor. None of them
//! read past the end of the input.

/// Upper bound on bytes visited while reading a parenthesized specifier.
const MAX_EXPRESSION_STEPS: usize = 1000;

pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

pub(crate) fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn skip_spaces(code: &[u8], mut i: usize) -> usize {
    while i < code.len() && is_whitespace(code[i]) {
        i += 1;
    }
    i
}

/// True when `word` starts at `i` and is not glued to neighbouring identifier bytes.
pub(crate) fn at_word(code: &[u8], i: usize, word: &str) -> bool {
    let word = word.as_bytes();
    if !code[i.min(code.len())..].starts_with(word) {
        return false;
    }
    let before_ok = i == 0 || !matches!(code[i - 1], b'.' | b'$') && !is_ident_char(code[i - 1]);
    let after_ok = code.get(i + word.len()).is_none_or(|&b| b != b'$' && !is_ident_char(b));
    before_ok && after_ok
}

/// Like [`at_word`] but only checks the trailing boundary.
pub(crate) fn starts_with_word(code: &[u8], i: usize, word: &str) -> bool {
    let word = word.as_bytes();
    code[i.min(code.len())..].starts_with(word)
        && code.get(i + word.len()).is_none_or(|&b| !is_ident_char(b))
}

/// Position right after the `//` comment starting at `start` (at its newline).
pub(crate) fn skip_line_comment(code: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i < code.len() && code[i] != b'\n' {
        i += 1;
    }
    i.min(code.len())
}

/// Position right after the `*/` closing the comment starting at `start`.
pub(crate) fn skip_block_comment(code: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < code.len() && !(code[i] == b'*' && code[i + 1] == b'/') {
        i += 1;
    }
    if i + 1 < code.len() { i + 2 } else { code.len() }
}

/// If a comment starts at `i`, return the position after it.
pub(crate) fn skip_comment_at(code: &[u8], i: usize) -> Option<usize> {
    if i + 1 >= code.len() || code[i] != b'/' {
        return None;
    }
    match code[i + 1] {
        b'/' => Some(skip_line_comment(code, i)),
        b'*' => Some(skip_block_comment(code, i)),
        _ => None,
    }
}

pub(crate) fn skip_spaces_and_comments(code: &[u8], mut i: usize) -> usize {
    loop {
        i = skip_spaces(code, i);
        match skip_comment_at(code, i) {
            Some(next) => i = next,
            None => return i,
        }
    }
}

/// Skip spaces and tabs then a `;`. Returns `i` unchanged when there is no semicolon.
pub(crate) fn skip_optional_semicolon(code: &[u8], i: usize) -> usize {
    let mut j = i;
    while j < code.len() && matches!(code[j], b' ' | b'\t') {
        j += 1;
    }
    if code.get(j) == Some(&b';') { j + 1 } else { i }
}

/// Position right after the string, template or quoted literal opening at `start`.
pub(crate) fn skip_string(code: &[u8], start: usize) -> usize {
    let quote = code[start];
    if quote == b'`' {
        return skip_template(code, start);
    }
    let mut i = start + 1;
    while i < code.len() {
        match code[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    code.len()
}

/// Template literal with `${ ... }` interpolations, which may nest strings and templates.
fn skip_template(code: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < code.len() {
        match code[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if code.get(i + 1) == Some(&b'{') => i = skip_interpolation(code, i + 2),
            _ => i += 1,
        }
    }
    code.len()
}

fn skip_interpolation(code: &[u8], mut i: usize) -> usize {
    let mut depth = 1usize;
    while i < code.len() {
        match code[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            b'\'' | b'"' | b'`' => i = skip_string(code, i),
            b'/' => i = skip_comment_at(code, i).unwrap_or(i + 1),
            _ => i += 1,
        }
    }
    code.len()
}

/// Skip a `{ ... }` block: advances to the first `{` then past its matching `}`.
pub(crate) fn skip_braced_block(code: &[u8], mut i: usize) -> usize {
    while i < code.len() && code[i] != b'{' {
        if let Some(next) = skip_comment_at(code, i) {
            i = next;
        } else {
            i += 1;
        }
    }
    if i >= code.len() {
        return i;
    }
    let mut depth = 1usize;
    i += 1;
    while i < code.len() && depth > 0 {
        match code[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
            }
            b'\'' | b'"' | b'`' => i = skip_string(code, i),
            b'/' => i = skip_comment_at(code, i).unwrap_or(i + 1),
            _ => i += 1,
        }
    }
    i
}

/// A string literal: contents and the byte range of the contents (quotes excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Literal {
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// Read the `'` or `"` literal at `i`. Returns the literal and the position after the
/// closing quote, or `None` when it is unterminated.
pub(crate) fn parse_string_literal(code: &[u8], i: usize) -> Option<(Literal, usize)> {
    let quote = code[i];
    let start = i + 1;
    let mut j = start;
    while j < code.len() && code[j] != quote {
        j += 1;
    }
    if j >= code.len() {
        return None;
    }
    let value = String::from_utf8_lossy(&code[start..j]).into_owned();
    Some((Literal { value, start, end: j }, j + 1))
}

/// Identifier at `i` as `(name, start, end)`; empty name when none starts there.
pub(crate) fn parse_identifier(code: &[u8], i: usize) -> (String, usize, usize) {
    if i >= code.len() {
        return (String::new(), i, i);
    }
    let mut end = i;
    while end < code.len() && is_ident_char(code[end]) {
        end += 1;
    }
    (String::from_utf8_lossy(&code[i..end]).into_owned(), i, end)
}

/// Read `( 'specifier' )` starting at or after `i`.
///
/// Accepts exactly one string literal surrounded by balanced parentheses and whitespace.
/// Anything else (identifiers, operators, templates, a second literal) rejects the
/// expression. Returns the literal if accepted and the position to resume scanning from.
pub(crate) fn parse_expression(code: &[u8], i: usize) -> (Option<Literal>, usize) {
    let mut i = skip_spaces(code, i);
    if code.get(i) != Some(&b'(') {
        return (None, i + 1);
    }
    i += 1;

    let mut parens = 1usize;
    let mut literal: Option<Literal> = None;
    let mut steps = 0usize;

    while i < code.len() {
        steps += 1;
        if steps > MAX_EXPRESSION_STEPS {
            return (None, i);
        }
        match code[i] {
            b'(' => {
                parens += 1;
                i += 1;
            }
            b')' => {
                parens -= 1;
                i += 1;
                if parens == 0 {
                    return (literal, i);
                }
            }
            b'\'' | b'"' => {
                if literal.is_some() {
                    return (None, i);
                }
                match parse_string_literal(code, i) {
                    Some((lit, next)) => {
                        steps += lit.end - lit.start;
                        literal = Some(lit);
                        i = next;
                    }
                    None => return (None, code.len()),
                }
            }
            b if is_whitespace(b) => i = skip_spaces(code, i),
            _ => return (None, i),
        }
    }

    (None, i)
}
