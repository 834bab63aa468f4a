//! BibTeX format parser implementation.
//!
//! Splits a bibliography into entry spans at `@` markers and scans each span
//! once for its `name = value` assignments. Extraction is best-effort: a
//! missing field is `None`, a span without an identifier is skipped and
//! reported as a [`Diagnostic`], and text that matches no entry marker is
//! ignored.
//!
//! # Example
//!
//! ```
//! use bibtidy::{BibtexParser, RecordParser};
//!
//! let input = r#"@article{Smith2020,
//!   title = {Deep Learning for Control},
//!   author = {Smith, John and Doe, Jane},
//!   year = {2020}
//! }"#;
//!
//! let records = BibtexParser::new().parse(input).unwrap();
//! assert_eq!(records[0].identifier, "Smith2020");
//! assert_eq!(records[0].title.as_deref(), Some("Deep Learning for Control"));
//! assert_eq!(records[0].authors, vec!["Smith, John", "Doe, Jane"]);
//! assert_eq!(records[0].year, Some(2020));
//! ```

mod fields;
mod scan;
mod split;
mod structure;
mod writer;

pub use fields::BibtexField;
pub use writer::{format_entries, format_entry};

pub(crate) use scan::scan_header;
pub(crate) use split::{EntrySplit, Span, preamble};

use crate::bibtex::scan::{FieldScanner, entry_kind, is_directive};
use crate::bibtex::structure::RawBibtexEntry;
use crate::{BibError, Diagnostic, Record, RecordParser, Result};
use either::{Either, Left, Right};
use itertools::Itertools;
use std::path::Path;
use tracing::debug;

/// Longest excerpt of a malformed span kept in its diagnostic.
const EXCERPT_CHARS: usize = 60;

/// Parser for BibTeX bibliographies.
#[derive(Debug, Clone, Default)]
pub struct BibtexParser {}

/// Records extracted from a bibliography, with the spans that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub records: Vec<Record>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BibtexParser {
    /// Creates a new BibTeX parser instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use bibtidy::BibtexParser;
    /// let parser = BibtexParser::new();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lazily extracts records from `input`, silently skipping malformed spans.
    ///
    /// Calling this again on the same input yields the same sequence.
    pub fn records<'a>(&self, input: &'a str) -> Records<'a> {
        Records {
            spans: EntrySplit::new(input),
        }
    }

    /// Extracts every record and reports each skipped span.
    ///
    /// # Errors
    ///
    /// Returns [`BibError::EmptyInput`] if the input is empty or whitespace only.
    pub fn parse_with_diagnostics(&self, input: &str) -> Result<Parsed> {
        if input.trim().is_empty() {
            return Err(BibError::EmptyInput);
        }
        let (diagnostics, records): (Vec<_>, Vec<_>) = EntrySplit::new(input)
            .filter_map(|span| parse_span(&span))
            .partition_map(|parsed| parsed);
        debug!(
            records = records.len(),
            skipped = diagnostics.len(),
            "parsed bibliography"
        );
        Ok(Parsed {
            records,
            diagnostics,
        })
    }

    /// Reads and parses a bibliography file.
    ///
    /// # Errors
    ///
    /// Returns [`BibError::Io`] if the file cannot be read as UTF-8, or
    /// [`BibError::EmptyInput`] if it holds no text.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Record>> {
        let text = std::fs::read_to_string(path)?;
        self.parse(&text)
    }
}

impl RecordParser for BibtexParser {
    /// Parses a string containing zero or more BibTeX entries.
    ///
    /// # Errors
    ///
    /// Returns [`BibError::EmptyInput`] if the input is empty or whitespace only.
    fn parse(&self, input: &str) -> Result<Vec<Record>> {
        self.parse_with_diagnostics(input).map(|parsed| parsed.records)
    }
}

/// An [Iterator] over the records of a bibliography, created by
/// [`BibtexParser::records`].
pub struct Records<'a> {
    spans: EntrySplit<'a>,
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        self.spans.find_map(|span| match parse_span(&span) {
            Some(Right(record)) => Some(record),
            _ => None,
        })
    }
}

/// Extracts one span.
///
/// Returns `None` for directives (`@comment`, `@string`, `@preamble`), a
/// [`Diagnostic`] for a span without an identifier, and the record otherwise.
pub(crate) fn parse_span(span: &Span<'_>) -> Option<Either<Diagnostic, Record>> {
    let text = span.text.trim_end();
    if entry_kind(text).is_some_and(is_directive) {
        return None;
    }

    let Some(header) = scan_header(text) else {
        debug!(line = span.line, "skipping entry without identifier");
        let excerpt = text
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(EXCERPT_CHARS)
            .collect();
        return Some(Left(Diagnostic::MalformedEntry {
            line: span.line,
            excerpt,
        }));
    };

    let mut raw = RawBibtexEntry::new(header.kind, header.identifier, text);
    for (name, value) in FieldScanner::new(&text[header.body_start..]) {
        raw.add_data(BibtexField::from_name(name), value.to_string());
    }
    Some(Right(raw.into()))
}
