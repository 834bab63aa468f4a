//! BibTeX intermediate data structures.
//!
//! The scanner collects every assignment of an entry into [`RawBibtexEntry`]
//! before any field is interpreted. Conversion into a [`Record`] then applies
//! the field rules:
//!
//! - **First-wins**: a field assigned more than once keeps its first value in
//!   the dedicated slot; later values are dropped for fixed fields and kept
//!   for extra fields.
//! - **Best-effort**: a year that is not a plain number becomes `None`.
//! - **Lossless remainder**: fields outside the fixed set go to `extra_fields`.

use crate::Record;
use crate::bibtex::fields::BibtexField;
use crate::utils::{parse_year, split_authors};
use std::collections::HashMap;

/// Structured raw data from one BibTeX entry.
#[derive(Debug, Clone)]
pub(crate) struct RawBibtexEntry {
    pub(crate) kind: String,
    pub(crate) identifier: String,
    /// Field values keyed by name, duplicates kept in source order.
    pub(crate) data: HashMap<BibtexField, Vec<String>>,
    pub(crate) raw_text: String,
}

impl RawBibtexEntry {
    pub(crate) fn new(kind: &str, identifier: &str, raw_text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            identifier: identifier.to_string(),
            data: HashMap::new(),
            raw_text: raw_text.to_string(),
        }
    }

    /// Add a field-value pair to the data.
    pub(crate) fn add_data(&mut self, field: BibtexField, value: String) {
        self.data.entry(field).or_default().push(value);
    }

    /// Remove and return the first value for a field.
    pub(crate) fn remove(&mut self, field: &BibtexField) -> Option<String> {
        self.data
            .remove(field)
            .and_then(|values| values.into_iter().next())
    }
}

impl From<RawBibtexEntry> for Record {
    fn from(mut raw: RawBibtexEntry) -> Self {
        let title = raw.remove(&BibtexField::Title);
        let authors = raw
            .remove(&BibtexField::Author)
            .map(|value| split_authors(&value))
            .unwrap_or_default();
        let year = raw
            .remove(&BibtexField::Year)
            .and_then(|value| parse_year(&value));
        let journal = raw.remove(&BibtexField::Journal);
        let doi = raw.remove(&BibtexField::Doi);
        let volume = raw.remove(&BibtexField::Volume);
        let pages = raw.remove(&BibtexField::Pages);
        let publisher = raw.remove(&BibtexField::Publisher);

        let extra_fields = raw
            .data
            .into_iter()
            .map(|(field, values)| (field.as_name().to_string(), values))
            .collect();

        Record {
            identifier: raw.identifier,
            entry_kind: raw.kind,
            title,
            authors,
            year,
            journal,
            doi,
            volume,
            pages,
            publisher,
            extra_fields,
            raw_text: raw.raw_text,
        }
    }
}
