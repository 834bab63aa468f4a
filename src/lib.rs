//! A library for reading, deduplicating, and re-keying BibTeX bibliographies.
//!
//! `bibtidy` is the shared core behind a set of bibliography curation jobs:
//! checking a `.bib` file for duplicate titles or DOIs, removing duplicate
//! entries, renaming citation keys after their titles, and summarising a
//! publication list. Apart from [`BibtexParser::parse_file`], every operation
//! is a pure transformation over in-memory text and writing output is left
//! to the caller.
//!
//! # Key Features
//!
//! - **Best-effort extraction**: entries are split on `@` markers and scanned
//!   once for `name = {value}` pairs. Missing fields are `None`, never errors.
//! - **Key-based duplicate detection**: group or drop records sharing a DOI,
//!   a normalized title, or an identifier. Records without the key are never
//!   merged.
//! - **Identifier re-derivation**: build keys such as `deep_learning_for_control_2021`
//!   from title and year, rewriting only the key inside each entry's text.
//! - **Collaborator shapes**: scraper JSON hints, resolver metadata, LaTeX
//!   `\nocite` helpers, and publication statistics.
//!
//! # Basic Usage
//!
//! ```rust
//! use bibtidy::{BibtexParser, Deduplicator, DeduplicatorConfig, DuplicateKey, RecordParser};
//!
//! let input = "@article{A, title = {Foo Bar}, year = {2020}}\n\n\
//!              @article{B, title = {Foo  bar}, year = {2021}}";
//!
//! let records = BibtexParser::new().parse(input).unwrap();
//! assert_eq!(records.len(), 2);
//!
//! let deduplicator = Deduplicator::new().with_config(DeduplicatorConfig {
//!     key: DuplicateKey::NormalizedTitle,
//!     ..Default::default()
//! });
//! let groups = deduplicator.find_duplicates(&records);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].key, "foo bar");
//! ```
//!
//! # Re-keying
//!
//! ```rust
//! use bibtidy::Rekeyer;
//!
//! let rekeyer = Rekeyer::new();
//! let key = rekeyer.derive_identifier("A Very Long Descriptive Title Here", Some(2019));
//! assert_eq!(key.as_deref(), Some("a_very_long_descriptive_2019"));
//! ```
//!
//! # Error Handling
//!
//! Whole-batch failures (an unreadable file, empty input) are returned as
//! [`BibError`]. Problems with a single entry never abort a batch; they are
//! reported as [`Diagnostic`] values next to the successful results so the
//! caller can print counts of skipped records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub mod bibtex;
pub mod dedupe;
pub mod latex;
pub mod metadata;
mod regex;
pub mod rekey;
pub mod stats;
mod utils;

// Reexports
pub use bibtex::BibtexParser;
pub use dedupe::{Deduplicator, DeduplicatorConfig, DuplicateKey};
pub use rekey::{RekeyConfig, Rekeyer};

/// A specialized Result type for bibliography operations.
pub type Result<T> = std::result::Result<T, BibError>;

/// Errors that abort a whole operation.
#[derive(Error, Debug)]
pub enum BibError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input contains no text")]
    EmptyInput,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(String),
}

#[cfg(feature = "csv")]
impl From<csv::Error> for BibError {
    fn from(err: csv::Error) -> Self {
        BibError::Csv(err.to_string())
    }
}

/// A per-record problem that was recovered from locally.
///
/// Diagnostics are returned alongside results instead of failing the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A span started with an entry marker but had no recognizable identifier.
    #[error("skipped malformed entry at line {line}: {excerpt}")]
    MalformedEntry { line: usize, excerpt: String },

    /// A record has no value for the field used as the duplicate key.
    #[error("entry `{identifier}` has no {key}; treated as unique")]
    UnresolvedKey { identifier: String, key: DuplicateKey },

    /// Identifier re-derivation was requested for a record without a usable title.
    #[error("no title found for entry `{identifier}`; identifier left unchanged")]
    IrreducibleTitle { identifier: String },
}

/// One bibliographic entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Citation key, unique within its source collection
    pub identifier: String,
    /// Entry type as written in the source, e.g. `article`
    pub entry_kind: String,
    /// Title of the work
    pub title: Option<String>,
    /// Author names in source order
    pub authors: Vec<String>,
    /// Publication year, when numeric
    pub year: Option<i32>,
    /// Journal name
    pub journal: Option<String>,
    /// Digital Object Identifier as written in the source
    pub doi: Option<String>,
    /// Volume
    pub volume: Option<String>,
    /// Page range
    pub pages: Option<String>,
    /// Publisher
    pub publisher: Option<String>,
    /// Fields outside the fixed set, keyed by lowercase field name
    pub extra_fields: HashMap<String, Vec<String>>,
    /// The entry text exactly as it appeared in the source
    pub raw_text: String,
}

impl Record {
    /// The first listed author, if any.
    pub fn first_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }
}

/// Trait for implementing bibliography parsers.
pub trait RecordParser {
    /// Parse a string containing zero or more entries.
    ///
    /// # Errors
    ///
    /// Returns [`BibError::EmptyInput`] if the input holds no text at all.
    fn parse(&self, input: &str) -> Result<Vec<Record>>;
}
