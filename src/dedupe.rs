//! Record deduplicator implementation.
//!
//! Detects and removes duplicate bibliography records. Two records are
//! duplicates when they share the value of one caller-selected key:
//!
//! - [`DuplicateKey::Doi`]: the DOI string, compared exactly (or canonicalized
//!   with [`DeduplicatorConfig::normalize_doi`])
//! - [`DuplicateKey::NormalizedTitle`]: the title, lowercased with every
//!   whitespace run collapsed to one space
//! - [`DuplicateKey::Identifier`]: the citation key
//!
//! A record with no value for the key is never a duplicate of anything,
//! including other records without a value.
//!
//! ## Usage
//!
//! ```rust
//! use bibtidy::{BibtexParser, RecordParser};
//! use bibtidy::dedupe::{Deduplicator, DeduplicatorConfig, DuplicateKey};
//!
//! let input = "@article{x, title = {One}}\n@article{x, title = {Two}}\n@article{y, title = {Three}}";
//! let records = BibtexParser::new().parse(input).unwrap();
//!
//! let deduplicator = Deduplicator::new().with_config(DeduplicatorConfig {
//!     key: DuplicateKey::Identifier,
//!     ..Default::default()
//! });
//! let result = deduplicator.dedupe(records);
//!
//! assert_eq!(result.kept.len(), 2);
//! assert_eq!(result.kept[0].title.as_deref(), Some("One"));
//! assert_eq!(result.removed[0].title.as_deref(), Some("Two"));
//! ```
//!
//! ## Matching
//!
//! Title comparison is exact after normalization. Titles that differ in
//! punctuation or transliteration are not merged.

use crate::utils::{collapse_whitespace, format_doi};
use crate::{Diagnostic, Record, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// The field two records must share to count as duplicates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKey {
    /// Digital Object Identifier
    Doi,
    /// Lowercased title with whitespace runs collapsed
    #[default]
    NormalizedTitle,
    /// Citation key
    Identifier,
}

impl DuplicateKey {
    /// Name of the record field the key is read from.
    pub fn field_name(&self) -> &'static str {
        match self {
            DuplicateKey::Doi => "doi",
            DuplicateKey::NormalizedTitle => "title",
            DuplicateKey::Identifier => "identifier",
        }
    }

    /// The key value of a record, without any configured canonicalization.
    ///
    /// Returns `None` when the field is absent or blank.
    pub fn key_of(&self, record: &Record) -> Option<String> {
        let value = match self {
            DuplicateKey::Doi => record.doi.clone()?,
            DuplicateKey::NormalizedTitle => normalize_title(record.title.as_deref()?),
            DuplicateKey::Identifier => record.identifier.clone(),
        };
        (!value.trim().is_empty()).then_some(value)
    }
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Configuration options for the deduplication process.
///
/// All fields have defaults, so a configuration file only needs to name
/// what it changes.
///
/// # Examples
///
/// ```
/// use bibtidy::dedupe::{DeduplicatorConfig, DuplicateKey};
///
/// let config: DeduplicatorConfig = serde_json::from_str(r#"{"key": "doi"}"#).unwrap();
/// assert_eq!(config.key, DuplicateKey::Doi);
/// assert!(!config.normalize_doi);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeduplicatorConfig {
    /// The field compared between records.
    pub key: DuplicateKey,
    /// Compare DOIs after removing URL prefixes and `doi:` labels and
    /// lowercasing, instead of comparing the strings as written.
    pub normalize_doi: bool,
}

/// Core deduplication engine.
///
/// # Examples
///
/// ```
/// use bibtidy::dedupe::{Deduplicator, DeduplicatorConfig, DuplicateKey};
///
/// let config = DeduplicatorConfig {
///     key: DuplicateKey::Doi,
///     normalize_doi: true,
/// };
/// let deduplicator = Deduplicator::new().with_config(config);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    config: DeduplicatorConfig,
}

/// Records sharing one key value, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup<'a> {
    /// The shared key value
    pub key: String,
    /// Every record with that key; always at least two
    pub records: Vec<&'a Record>,
}

impl<'a> DuplicateGroup<'a> {
    /// The first record seen with this key, which deduplication keeps.
    pub fn unique(&self) -> &'a Record {
        self.records[0]
    }

    /// The records deduplication drops.
    pub fn duplicates(&self) -> &[&'a Record] {
        &self.records[1..]
    }
}

/// The outcome of [`Deduplicator::dedupe`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deduplicated {
    /// First-seen records, in input order
    pub kept: Vec<Record>,
    /// Dropped records, in input order
    pub removed: Vec<Record>,
    /// Records kept because they had no key value
    pub diagnostics: Vec<Diagnostic>,
}

impl Deduplicated {
    /// The kept entries as BibTeX text, separated by a blank line.
    pub fn to_bibtex(&self) -> String {
        self.kept.iter().map(|record| record.raw_text.as_str()).join("\n\n")
    }
}

/// Summary of the duplicate groups in a bibliography.
///
/// Serializes as
/// `{key, total_records, records_with_key, duplicate_groups, duplicates: {<key>: [{identifier, title?}]}}`
/// with groups in order of first occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub key: DuplicateKey,
    pub total_records: usize,
    pub records_with_key: usize,
    pub duplicate_groups: usize,
    #[serde(serialize_with = "serialize_groups")]
    pub duplicates: Vec<ReportGroup>,
}

/// One duplicate group of a [`DuplicateReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGroup {
    pub key: String,
    pub entries: Vec<ReportEntry>,
}

/// A record listed in a [`ReportGroup`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl DuplicateReport {
    /// Renders the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BibError::Json`](crate::BibError::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// Groups become a JSON object keyed by the shared value, in group order.
#[allow(clippy::ptr_arg)]
fn serialize_groups<S: Serializer>(
    groups: &Vec<ReportGroup>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(groups.iter().map(|group| (&group.key, &group.entries)))
}

/// Lowercases a title and collapses each whitespace run to a single space.
///
/// # Examples
///
/// ```
/// use bibtidy::dedupe::normalize_title;
///
/// assert_eq!(normalize_title("  Foo \n Bar "), "foo bar");
/// ```
pub fn normalize_title(title: &str) -> String {
    collapse_whitespace(&title.to_lowercase())
}

impl Deduplicator {
    /// Creates a new Deduplicator grouping by normalized title.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new Deduplicator with custom configuration.
    #[must_use]
    pub fn with_config(mut self, config: DeduplicatorConfig) -> Self {
        self.config = config;
        self
    }

    /// The value a record is grouped under, or `None` if it has none.
    pub fn key_of(&self, record: &Record) -> Option<String> {
        let value = self.config.key.key_of(record)?;
        if self.config.key == DuplicateKey::Doi && self.config.normalize_doi {
            return Some(format_doi(&value).unwrap_or_else(|| value.trim().to_lowercase()));
        }
        Some(value)
    }

    /// Groups records sharing a key value.
    ///
    /// Only groups with two or more records are returned, ordered by the
    /// position of their first record. Records without a key value are left
    /// out entirely.
    pub fn find_duplicates<'a>(&self, records: &'a [Record]) -> Vec<DuplicateGroup<'a>> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<DuplicateGroup<'a>> = Vec::new();

        for record in records {
            let Some(key) = self.key_of(record) else {
                continue;
            };
            match index.entry(key) {
                Entry::Occupied(slot) => groups[*slot.get()].records.push(record),
                Entry::Vacant(slot) => {
                    groups.push(DuplicateGroup {
                        key: slot.key().clone(),
                        records: vec![record],
                    });
                    slot.insert(groups.len() - 1);
                }
            }
        }

        groups.retain(|group| group.records.len() > 1);
        groups
    }

    /// Keeps the first record seen for each key value and drops the rest.
    ///
    /// Kept records stay in input order. A record without a key value is
    /// always kept and reported as [`Diagnostic::UnresolvedKey`].
    pub fn dedupe(&self, records: Vec<Record>) -> Deduplicated {
        let mut seen = HashSet::new();
        let mut result = Deduplicated::default();

        for record in records {
            match self.key_of(&record) {
                None => {
                    result.diagnostics.push(Diagnostic::UnresolvedKey {
                        identifier: record.identifier.clone(),
                        key: self.config.key,
                    });
                    result.kept.push(record);
                }
                Some(key) => {
                    if seen.insert(key) {
                        result.kept.push(record);
                    } else {
                        debug!(identifier = %record.identifier, key = %self.config.key, "dropping duplicate");
                        result.removed.push(record);
                    }
                }
            }
        }

        debug!(
            kept = result.kept.len(),
            removed = result.removed.len(),
            "deduplicated records"
        );
        result
    }

    /// Builds a serializable summary of the duplicate groups.
    pub fn report(&self, records: &[Record]) -> DuplicateReport {
        let groups = self.find_duplicates(records);
        let duplicates = groups
            .into_iter()
            .map(|group| ReportGroup {
                key: group.key,
                entries: group
                    .records
                    .iter()
                    .map(|record| ReportEntry {
                        identifier: record.identifier.clone(),
                        title: record.title.clone(),
                    })
                    .collect(),
            })
            .collect_vec();

        DuplicateReport {
            key: self.config.key,
            total_records: records.len(),
            records_with_key: records.iter().filter(|r| self.key_of(r).is_some()).count(),
            duplicate_groups: duplicates.len(),
            duplicates,
        }
    }
}
