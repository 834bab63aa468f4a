//! Rendering records back to BibTeX text.

use crate::Record;
use itertools::Itertools;

/// Formats a record as a BibTeX entry.
///
/// Fixed fields come first in a stable order (`title`, `author`, `journal`,
/// `year`, `doi`, `volume`, `pages`, `publisher`), followed by extra fields
/// sorted by name. Absent fields are omitted. The result has no trailing
/// newline.
///
/// # Examples
///
/// ```
/// use bibtidy::Record;
/// use bibtidy::bibtex::format_entry;
///
/// let record = Record {
///     identifier: "Smith2020".to_string(),
///     entry_kind: "article".to_string(),
///     title: Some("Deep Learning".to_string()),
///     year: Some(2020),
///     ..Default::default()
/// };
/// assert_eq!(
///     format_entry(&record),
///     "@article{Smith2020,\n  title = {Deep Learning},\n  year = {2020},\n}"
/// );
/// ```
pub fn format_entry(record: &Record) -> String {
    let kind = if record.entry_kind.is_empty() {
        "misc"
    } else {
        record.entry_kind.as_str()
    };
    let mut out = format!("@{kind}{{{},\n", record.identifier);

    let authors = (!record.authors.is_empty()).then(|| record.authors.iter().join(" and "));
    let year = record.year.map(|y| y.to_string());
    let fixed = [
        ("title", record.title.as_deref()),
        ("author", authors.as_deref()),
        ("journal", record.journal.as_deref()),
        ("year", year.as_deref()),
        ("doi", record.doi.as_deref()),
        ("volume", record.volume.as_deref()),
        ("pages", record.pages.as_deref()),
        ("publisher", record.publisher.as_deref()),
    ];
    for (name, value) in fixed {
        if let Some(value) = value {
            push_field(&mut out, name, value);
        }
    }

    for (name, values) in record.extra_fields.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        for value in values {
            push_field(&mut out, name, value);
        }
    }

    out.push('}');
    out
}

/// Formats records as BibTeX entries separated by a blank line.
pub fn format_entries(records: &[Record]) -> String {
    records.iter().map(format_entry).join("\n\n")
}

fn push_field(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!("  {name} = {{{value}}},\n"));
}
