//! Metadata supplied by collaborators outside the parser.
//!
//! Two shapes enter the pipeline from the outside:
//!
//! - [`ArticleHint`]: one item of a scraped publication list,
//!   `{doi, title?, authors?, year?, link?}`. Scrapers are loose about types,
//!   so `year` may be a number or a string and `authors` a comma-separated
//!   string or a list.
//! - [`WorkMetadata`]: what a DOI resolver returned for one work. It can be
//!   merged with a hint and turned into a [`Record`] with a generated key.

use crate::bibtex::format_entry;
use crate::regex::Regex;
use crate::utils::{family_name, format_doi, parse_year};
use crate::{Record, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static PREPRINT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(arxiv\.org|biorxiv\.org|bioarxiv\.org|medrxiv\.org|medarxiv\.org|chemrxiv\.org|psyarxiv\.org|socarxiv\.org|osf\.io|preprints\.org|researchsquare\.com|10\.48550/arxiv|10\.21203/rs\.|10\.20944/preprints|10\.26434/chemrxiv)",
    )
    .unwrap()
});

/// One scraped publication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleHint {
    /// DOI as scraped; empty when the scraper found none
    #[serde(default, deserialize_with = "deserialize_doi")]
    pub doi: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_authors")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_year")]
    pub year: Option<i32>,
    #[serde(default)]
    pub link: Option<String>,
}

impl ArticleHint {
    /// The DOI in canonical form, used to match hints with records.
    pub fn canonical_doi(&self) -> Option<String> {
        format_doi(&self.doi)
    }
}

/// Authors may be a comma-separated string or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrSeq {
    String(String),
    Seq(Vec<String>),
}

/// Years may be a number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum YearValue {
    Number(i64),
    Text(String),
}

fn deserialize_doi<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_authors<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    let names = match Option::<StringOrSeq>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrSeq::String(s)) => s.split(',').map(String::from).collect(),
        Some(StringOrSeq::Seq(v)) => v,
    };
    Ok(names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

fn deserialize_year<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i32>, D::Error> {
    Ok(match Option::<YearValue>::deserialize(deserializer)? {
        None => None,
        Some(YearValue::Number(n)) => i32::try_from(n).ok(),
        Some(YearValue::Text(s)) => parse_year(&s),
    })
}

/// Reads a scraped publication list, keeping only items with a DOI.
///
/// # Errors
///
/// Returns [`BibError::Json`](crate::BibError::Json) if the text is not a
/// JSON array of objects.
///
/// # Examples
///
/// ```
/// use bibtidy::metadata::read_hints;
///
/// let json = r#"[
///     {"doi": "10.1000/a", "title": "Found", "authors": "A. Smith, B. Jones", "year": "2021"},
///     {"doi": null, "title": "Not found"}
/// ]"#;
/// let hints = read_hints(json).unwrap();
/// assert_eq!(hints.len(), 1);
/// assert_eq!(hints[0].authors, vec!["A. Smith", "B. Jones"]);
/// assert_eq!(hints[0].year, Some(2021));
/// ```
pub fn read_hints(json: &str) -> Result<Vec<ArticleHint>> {
    let hints: Vec<ArticleHint> = serde_json::from_str(json)?;
    let total = hints.len();
    let hints: Vec<_> = hints
        .into_iter()
        .filter(|hint| !hint.doi.trim().is_empty())
        .collect();
    debug!(total, with_doi = hints.len(), "read article hints");
    Ok(hints)
}

/// Whether a DOI (or DOI URL) points at a preprint server.
///
/// # Examples
///
/// ```
/// use bibtidy::metadata::is_preprint;
///
/// assert!(is_preprint("10.48550/arXiv.2104.01234"));
/// assert!(!is_preprint("10.1109/ACCESS.2022.3226665"));
/// ```
pub fn is_preprint(doi: &str) -> bool {
    PREPRINT_REGEX.is_match(doi)
}

/// Bibliographic metadata returned by a DOI resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkMetadata {
    pub doi: String,
    pub title: Option<String>,
    /// Author names as "Given Family" or "Family, Given"
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub publisher: Option<String>,
}

impl WorkMetadata {
    /// Fills gaps from a scraped hint.
    ///
    /// The hint's year replaces the resolver's, since scraped profiles list
    /// the year of the final publication. Title and authors are only taken
    /// when the resolver has none.
    pub fn merge_hint(&mut self, hint: &ArticleHint) {
        if hint.year.is_some() {
            self.year = hint.year;
        }
        if self.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            if let Some(title) = &hint.title {
                self.title = Some(title.clone());
            }
        }
        if self.authors.is_empty() {
            self.authors = hint.authors.clone();
        }
    }

    /// Citation key from the first author's family name and the year,
    /// e.g. `Osinenko2022`; either part falls back to `Unknown`.
    pub fn citation_key(&self) -> String {
        let author = self
            .authors
            .first()
            .map(|name| family_name(name))
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown");
        match self.year {
            Some(year) => format!("{author}{year}"),
            None => format!("{author}Unknown"),
        }
    }

    /// Converts the metadata into an `article` record whose text is
    /// produced by [`format_entry`].
    pub fn into_record(self) -> Record {
        let identifier = self.citation_key();
        let extra_fields = self
            .issue
            .map(|issue| HashMap::from([("number".to_string(), vec![issue])]))
            .unwrap_or_default();
        let mut record = Record {
            identifier,
            entry_kind: "article".to_string(),
            title: self.title,
            authors: self.authors,
            year: self.year,
            journal: self.journal,
            doi: (!self.doi.is_empty()).then_some(self.doi),
            volume: self.volume,
            pages: self.pages,
            publisher: self.publisher,
            extra_fields,
            raw_text: String::new(),
        };
        record.raw_text = format_entry(&record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordParser;
    use crate::bibtex::BibtexParser;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[test]
    fn test_read_hints_shapes() {
        let json = r#"[
            {"doi": "10.1/a", "title": "A", "authors": ["Pavel Osinenko", " "], "year": 2020, "link": "https://example.org/a"},
            {"doi": "10.1/b", "authors": "Pavel Osinenko,Grigory Yaremenko", "year": "2021"},
            {"doi": "10.1/c", "year": "in press"},
            {"doi": "", "title": "Blank"},
            {"title": "Missing"}
        ]"#;
        let hints = read_hints(json).unwrap();

        assert_eq!(hints.len(), 3);
        assert_eq!(hints[0].authors, vec!["Pavel Osinenko"]);
        assert_eq!(hints[0].year, Some(2020));
        assert_eq!(hints[0].link.as_deref(), Some("https://example.org/a"));
        assert_eq!(hints[1].title, None);
        assert_eq!(hints[1].authors, vec!["Pavel Osinenko", "Grigory Yaremenko"]);
        assert_eq!(hints[1].year, Some(2021));
        assert_eq!(hints[2].year, None);
        assert!(hints[2].authors.is_empty());
    }

    #[test]
    fn test_read_hints_rejects_non_array() {
        assert!(matches!(
            read_hints(r#"{"doi": "10.1/a"}"#),
            Err(crate::BibError::Json(_))
        ));
    }

    #[test]
    fn test_canonical_doi() {
        let hint = ArticleHint {
            doi: "https://doi.org/10.1109/ACCESS.2022.1".to_string(),
            ..Default::default()
        };
        assert_eq!(hint.canonical_doi().as_deref(), Some("10.1109/access.2022.1"));
    }

    #[rstest]
    #[case("https://arxiv.org/abs/2104.01234", true)]
    #[case("10.48550/arXiv.2104.01234", true)]
    #[case("10.1101/2020.01.01.123456 biorxiv.org", true)]
    #[case("https://www.medrxiv.org/content/1", true)]
    #[case("10.21203/rs.3.rs-123/v1", true)]
    #[case("10.20944/preprints202101.0001.v1", true)]
    #[case("10.26434/chemrxiv-2021-abc", true)]
    #[case("https://osf.io/abcde", true)]
    #[case("10.1016/j.ifacol.2020.12.2286", false)]
    #[case("10.1109/TAC.2021.1", false)]
    fn test_is_preprint(#[case] doi: &str, #[case] expected: bool) {
        assert_eq!(is_preprint(doi), expected);
    }

    fn resolved() -> WorkMetadata {
        WorkMetadata {
            doi: "10.1109/access.2022.1".to_string(),
            title: Some("Effects of sampling".to_string()),
            authors: vec!["Pavel Osinenko".to_string(), "Dmitrii Dobriborsci".to_string()],
            journal: Some("IEEE Access".to_string()),
            year: Some(2021),
            volume: Some("10".to_string()),
            issue: Some("2".to_string()),
            pages: Some("1-12".to_string()),
            publisher: Some("IEEE".to_string()),
        }
    }

    #[test]
    fn test_merge_hint_prefers_hint_year() {
        let mut work = resolved();
        work.merge_hint(&ArticleHint {
            doi: work.doi.clone(),
            title: Some("Scraped title".to_string()),
            authors: vec!["Someone Else".to_string()],
            year: Some(2022),
            link: None,
        });
        assert_eq!(work.year, Some(2022));
        assert_eq!(work.title.as_deref(), Some("Effects of sampling"));
        assert_eq!(work.authors[0], "Pavel Osinenko");
    }

    #[test]
    fn test_merge_hint_fills_gaps() {
        let mut work = WorkMetadata {
            doi: "10.1/x".to_string(),
            title: Some(String::new()),
            year: Some(2019),
            ..Default::default()
        };
        work.merge_hint(&ArticleHint {
            doi: "10.1/x".to_string(),
            title: Some("Scraped title".to_string()),
            authors: vec!["Jane Doe".to_string()],
            year: None,
            link: None,
        });
        assert_eq!(work.year, Some(2019));
        assert_eq!(work.title.as_deref(), Some("Scraped title"));
        assert_eq!(work.authors, vec!["Jane Doe"]);
    }

    #[rstest]
    #[case(&["Pavel Osinenko"], Some(2022), "Osinenko2022")]
    #[case(&["Osinenko, Pavel"], Some(2022), "Osinenko2022")]
    #[case(&["Pavel Osinenko"], None, "OsinenkoUnknown")]
    #[case(&[], Some(2020), "Unknown2020")]
    #[case(&[], None, "UnknownUnknown")]
    fn test_citation_key(#[case] authors: &[&str], #[case] year: Option<i32>, #[case] expected: &str) {
        let work = WorkMetadata {
            authors: authors.iter().map(|a| a.to_string()).collect(),
            year,
            ..Default::default()
        };
        assert_eq!(work.citation_key(), expected);
    }

    #[test]
    fn test_into_record() {
        let record = resolved().into_record();
        assert_eq!(record.identifier, "Osinenko2021");
        assert_eq!(record.entry_kind, "article");
        assert_eq!(record.extra_fields["number"], vec!["2"]);

        let parsed = BibtexParser::new().parse(&record.raw_text).unwrap();
        assert_eq!(parsed, vec![record]);
    }
}
