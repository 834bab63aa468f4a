//! BibTeX field names with a dedicated slot in [`Record`](crate::Record).

use compact_str::CompactString;

/// BibTeX field names.
///
/// Names are matched case-insensitively; anything outside the fixed set is
/// kept as [`BibtexField::Other`] with its lowercase name.
#[non_exhaustive]
#[derive(Debug, Eq, PartialEq, Hash, Clone)]
pub enum BibtexField {
    /// title
    Title,
    /// author - `" and "`-separated list
    Author,
    /// year
    Year,
    /// journal
    Journal,
    /// doi
    Doi,
    /// volume
    Volume,
    /// pages
    Pages,
    /// publisher
    Publisher,
    /// Any other field
    Other(CompactString),
}

impl BibtexField {
    /// Convert a field name to a BibtexField.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        match name.as_str() {
            "title" => BibtexField::Title,
            "author" => BibtexField::Author,
            "year" => BibtexField::Year,
            "journal" => BibtexField::Journal,
            "doi" => BibtexField::Doi,
            "volume" => BibtexField::Volume,
            "pages" => BibtexField::Pages,
            "publisher" => BibtexField::Publisher,
            other => BibtexField::Other(CompactString::from(other)),
        }
    }

    /// Convert a BibtexField back to its lowercase field name.
    pub fn as_name(&self) -> &str {
        match self {
            BibtexField::Title => "title",
            BibtexField::Author => "author",
            BibtexField::Year => "year",
            BibtexField::Journal => "journal",
            BibtexField::Doi => "doi",
            BibtexField::Volume => "volume",
            BibtexField::Pages => "pages",
            BibtexField::Publisher => "publisher",
            BibtexField::Other(name) => name,
        }
    }
}
