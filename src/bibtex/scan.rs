//! Single-pass scanning of a BibTeX entry span.
//!
//! [`scan_header`] reads `@kind{identifier,` from the first line and
//! [`FieldScanner`] walks the remaining text once, yielding every
//! `name = value` assignment in source order.

use std::ops::Range;
use tracing::trace;

/// Entry types that hold no bibliographic record.
const DIRECTIVES: [&str; 3] = ["comment", "preamble", "string"];

/// The opening line of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Header<'a> {
    pub(crate) kind: &'a str,
    pub(crate) identifier: &'a str,
    /// Byte range of the trimmed identifier within the span.
    pub(crate) identifier_range: Range<usize>,
    /// Byte offset just past the comma that ends the identifier.
    pub(crate) body_start: usize,
}

/// The entry type following the `@` marker.
pub(crate) fn entry_kind(span: &str) -> Option<&str> {
    let rest = span.strip_prefix('@')?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Whether an entry type is a directive (`@comment`, `@string`, `@preamble`).
pub(crate) fn is_directive(kind: &str) -> bool {
    DIRECTIVES.iter().any(|d| d.eq_ignore_ascii_case(kind))
}

/// Parses `@kind{identifier,` from the first line of a span.
///
/// Returns `None` when the first line holds no opening delimiter, no comma,
/// or only whitespace between them.
pub(crate) fn scan_header(span: &str) -> Option<Header<'_>> {
    let kind = entry_kind(span)?;
    let after_kind = 1 + kind.len();
    let first_line_end = span.find('\n').unwrap_or(span.len());
    let first_line = &span[..first_line_end];

    let open = after_kind
        + first_line[after_kind..].find(|c: char| !c.is_whitespace())?;
    if !matches!(first_line.as_bytes()[open], b'{' | b'(') {
        return None;
    }
    let comma = open + first_line[open..].find(',')?;

    let raw = &span[open + 1..comma];
    let identifier = raw.trim();
    if identifier.is_empty() {
        return None;
    }
    let start = open + 1 + (raw.len() - raw.trim_start().len());
    Some(Header {
        kind,
        identifier,
        identifier_range: start..start + identifier.len(),
        body_start: comma + 1,
    })
}

/// An [Iterator] over the `name = value` assignments of an entry body.
///
/// Values may be brace-delimited (nested braces are balanced), quoted, or a
/// bare token such as a number. Stretches that do not form an assignment are
/// skipped up to the next comma or line break. Iteration stops at the brace
/// (or parenthesis) closing the entry.
pub(crate) struct FieldScanner<'a> {
    body: &'a str,
    pos: usize,
}

impl<'a> FieldScanner<'a> {
    pub(crate) fn new(body: &'a str) -> Self {
        Self { body, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.body.as_bytes().get(self.pos).copied()
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    /// Skips past the next comma or line break.
    fn recover(&mut self) {
        let start = self.pos;
        self.skip_while(|b| b != b',' && b != b'\n');
        if self.pos < self.body.len() {
            self.pos += 1;
        }
        trace!(skipped = &self.body[start..self.pos], "unparsable text in entry body");
    }

    fn read_name(&mut self) -> &'a str {
        let start = self.pos;
        self.skip_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.'));
        &self.body[start..self.pos]
    }

    /// Reads a `{...}` value with balanced braces; an unterminated value runs to the end.
    fn read_braced(&mut self) -> &'a str {
        let start = self.pos + 1;
        let mut depth = 0usize;
        for (i, b) in self.body.as_bytes()[self.pos..].iter().enumerate() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let end = self.pos + i;
                        self.pos = end + 1;
                        return &self.body[start..end];
                    }
                }
                _ => {}
            }
        }
        self.pos = self.body.len();
        &self.body[start..]
    }

    /// Reads a `"..."` value; quotes inside braces or after a backslash do not terminate it.
    fn read_quoted(&mut self) -> &'a str {
        let start = self.pos + 1;
        let mut depth = 0usize;
        let mut escaped = false;
        for (i, b) in self.body.as_bytes()[start..].iter().enumerate() {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                b'"' if depth == 0 => {
                    let end = start + i;
                    self.pos = end + 1;
                    return &self.body[start..end];
                }
                _ => {}
            }
        }
        self.pos = self.body.len();
        &self.body[start..]
    }

    fn read_bare(&mut self) -> &'a str {
        let start = self.pos;
        self.skip_while(|b| !matches!(b, b',' | b'}' | b')' | b'\n'));
        &self.body[start..self.pos]
    }
}

impl<'a> Iterator for FieldScanner<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.skip_while(|b| b.is_ascii_whitespace() || b == b',');
            match self.peek() {
                None | Some(b'}') | Some(b')') => return None,
                _ => {}
            }

            let name = self.read_name();
            if name.is_empty() {
                self.recover();
                continue;
            }
            self.skip_while(|b| b.is_ascii_whitespace());
            if self.peek() != Some(b'=') {
                self.recover();
                continue;
            }
            self.pos += 1;
            self.skip_while(|b| b.is_ascii_whitespace());

            let value = match self.peek() {
                Some(b'{') => self.read_braced(),
                Some(b'"') => self.read_quoted(),
                _ => {
                    let value = self.read_bare();
                    if value.trim().is_empty() {
                        self.recover();
                        continue;
                    }
                    value
                }
            };
            return Some((name, value.trim()));
        }
    }
}
