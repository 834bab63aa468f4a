/// A contiguous slice of a bibliography starting at an entry marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span<'a> {
    /// 1-based line number of the marker.
    pub(crate) line: usize,
    /// The span text, up to (not including) the next marker.
    pub(crate) text: &'a str,
}

/// An [Iterator] which splits a bibliography into entry spans.
///
/// A marker is an `@` at the very start of the text or directly after a
/// line break. Text before the first marker is not part of any span, and
/// consecutive spans cover the rest of the input with no gaps, so
/// concatenating [preamble] with every span reproduces the input.
pub(crate) struct EntrySplit<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> EntrySplit<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let offset = first_marker(text);
        Self {
            text,
            offset,
            line: 1 + text[..offset].matches('\n').count(),
        }
    }
}

impl<'a> Iterator for EntrySplit<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.offset..];
        // The marker itself is at rest[0], so search from the next byte.
        let end = rest[1..]
            .find("\n@")
            .map_or(rest.len(), |i| i + 2);
        let span = Span {
            line: self.line,
            text: &rest[..end],
        };
        self.offset += end;
        self.line += span.text.matches('\n').count();
        Some(span)
    }
}

/// Byte offset of the first entry marker, or the text length if there is none.
fn first_marker(text: &str) -> usize {
    if text.starts_with('@') {
        0
    } else {
        text.find("\n@").map_or(text.len(), |i| i + 1)
    }
}

/// Text before the first entry marker.
pub(crate) fn preamble(text: &str) -> &str {
    &text[..first_marker(text)]
}
