//! Literal-aware splitting of SQL text.
//!
//! Token passes (named parameters, the prefix macro, qualifier rewrites)
//! only ever touch [`Segment::Code`]; string literals and quoted identifiers
//! pass through untouched.

use crate::dialect::Dialect;

/// A piece of SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Plain SQL outside any quotes.
    Code(&'a str),
    /// A single-quoted string literal, quotes included.
    Literal(&'a str),
    /// A double-quoted or backtick-quoted identifier, quotes included.
    Identifier(&'a str),
}

impl<'a> Segment<'a> {
    /// Returns the raw text of the segment.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        match self {
            Self::Code(s) | Self::Literal(s) | Self::Identifier(s) => s,
        }
    }
}

/// Splits SQL text into code, literal and quoted-identifier segments.
///
/// An unterminated quote swallows the rest of the text.
#[must_use]
pub fn segments(sql: &str, dialect: Dialect) -> Vec<Segment<'_>> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' || b == b'`' {
            if start < i {
                out.push(Segment::Code(&sql[start..i]));
            }
            let backslash = dialect.backslash_escapes() && b != b'`';
            let end = closing_quote(bytes, i, b, backslash);
            let piece = &sql[i..end];
            out.push(if b == b'\'' {
                Segment::Literal(piece)
            } else {
                Segment::Identifier(piece)
            });
            start = end;
            i = end;
        } else {
            i += 1;
        }
    }

    if start < bytes.len() {
        out.push(Segment::Code(&sql[start..]));
    }
    out
}

/// Returns the index just past the quote closing the one at `open`.
fn closing_quote(bytes: &[u8], open: usize, quote: u8, backslash: bool) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Rebuilds `sql`, passing every code segment through `f`.
pub fn map_code(sql: &str, dialect: Dialect, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(sql.len());
    for segment in segments(sql, dialect) {
        match segment {
            Segment::Code(code) => out.push_str(&f(code)),
            other => out.push_str(other.text()),
        }
    }
    out
}

/// Collapses whitespace runs outside literals into single spaces and trims.
#[must_use]
pub fn collapse_whitespace(sql: &str, dialect: Dialect) -> String {
    let collapsed = map_code(sql, dialect, |code| {
        let mut out = String::with_capacity(code.len());
        let mut in_space = false;
        for c in code.chars() {
            if c.is_whitespace() {
                if !in_space {
                    out.push(' ');
                }
                in_space = true;
            } else {
                out.push(c);
                in_space = false;
            }
        }
        out
    });
    collapsed.trim().to_string()
}
