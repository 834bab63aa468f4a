//! Publication statistics over a parsed bibliography.
//!
//! # Example
//!
//! ```
//! use bibtidy::{BibtexParser, RecordParser};
//! use bibtidy::stats::{PublicationStats, StatsConfig};
//!
//! let input = "@article{a, author = {Osinenko, Pavel}, title = {Control}, year = {2020}, journal = {Automatica}}\n\
//!              @article{b, author = {Doe, Jane and Osinenko, Pavel}, title = {Learning}, year = {2022}}";
//! let records = BibtexParser::new().parse(input).unwrap();
//!
//! let config = StatsConfig {
//!     author_patterns: vec!["osinenko".to_string()],
//!     ..Default::default()
//! };
//! let stats = PublicationStats::compute(&records, &config);
//! assert_eq!(stats.total_publications, 2);
//! assert_eq!(stats.first_author_publications, 1);
//! assert_eq!(stats.year_range, Some((2020, 2022)));
//! ```

use crate::dedupe::{Deduplicator, DeduplicatorConfig, DuplicateKey};
use crate::{Record, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A named group of keywords matched against titles and journal names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRule {
    pub name: String,
    /// Lowercase keywords; a record matches if any appears as a substring.
    pub keywords: Vec<String>,
}

impl TopicRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }
}

/// Configuration for [`PublicationStats::compute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Case-insensitive substrings identifying the profile owner as first author.
    pub author_patterns: Vec<String>,
    /// Number of journals and publishers listed.
    pub top_n: usize,
    /// Topics counted over titles and journal names.
    pub topics: Vec<TopicRule>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            author_patterns: Vec::new(),
            top_n: 10,
            topics: Vec::new(),
        }
    }
}

/// A name with its number of publications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub name: String,
    pub count: usize,
}

/// Values shared by more than one record, per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateValues {
    pub titles: Vec<String>,
    pub dois: Vec<String>,
    pub identifiers: Vec<String>,
}

/// Summary statistics of a publication list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicationStats {
    pub total_publications: usize,
    pub first_author_publications: usize,
    /// Earliest and latest known year
    pub year_range: Option<(i32, i32)>,
    /// Publications per year over the year range, to one decimal
    pub average_per_year: f64,
    pub by_year: BTreeMap<i32, usize>,
    pub first_author_by_year: BTreeMap<i32, usize>,
    pub top_journals: Vec<Ranked>,
    pub top_publishers: Vec<Ranked>,
    /// Topic counts in configuration order
    pub topics: Vec<Ranked>,
    pub duplicates: DuplicateValues,
}

impl PublicationStats {
    /// Computes the statistics of `records`.
    pub fn compute(records: &[Record], config: &StatsConfig) -> Self {
        let patterns = config
            .author_patterns
            .iter()
            .map(|p| p.to_lowercase())
            .collect_vec();
        let is_first_author = |record: &Record| {
            record.first_author().is_some_and(|author| {
                let author = author.to_lowercase();
                patterns.iter().any(|p| author.contains(p.as_str()))
            })
        };

        let mut by_year = BTreeMap::new();
        let mut first_author_by_year = BTreeMap::new();
        let mut first_author_publications = 0;
        for record in records {
            let first = is_first_author(record);
            if first {
                first_author_publications += 1;
            }
            if let Some(year) = record.year {
                *by_year.entry(year).or_insert(0) += 1;
                if first {
                    *first_author_by_year.entry(year).or_insert(0) += 1;
                }
            }
        }

        let year_range = by_year
            .keys()
            .next()
            .zip(by_year.keys().next_back())
            .map(|(&min, &max)| (min, max));
        let average_per_year = year_range.map_or(0.0, |(min, max)| {
            let span = f64::from(max) - f64::from(min) + 1.0;
            (records.len() as f64 / span * 10.0).round() / 10.0
        });

        let topics = config
            .topics
            .iter()
            .map(|topic| Ranked {
                name: topic.name.clone(),
                count: records
                    .iter()
                    .filter(|record| topic.matches(&topic_text(record)))
                    .count(),
            })
            .collect();

        Self {
            total_publications: records.len(),
            first_author_publications,
            year_range,
            average_per_year,
            by_year,
            first_author_by_year,
            top_journals: top_values(records.iter().filter_map(|r| r.journal.as_deref()), config.top_n),
            top_publishers: top_values(records.iter().filter_map(|r| r.publisher.as_deref()), config.top_n),
            topics,
            duplicates: DuplicateValues {
                titles: duplicate_values(records, DuplicateKey::NormalizedTitle),
                dois: duplicate_values(records, DuplicateKey::Doi),
                identifiers: duplicate_values(records, DuplicateKey::Identifier),
            },
        }
    }

    /// Renders the statistics as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BibError::Json`](crate::BibError::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes a `year,publications,first_author` CSV table, one row per year.
    ///
    /// # Errors
    ///
    /// Returns [`BibError::Csv`](crate::BibError::Csv) or
    /// [`BibError::Io`](crate::BibError::Io) if writing fails.
    #[cfg(feature = "csv")]
    pub fn write_year_table<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["year", "publications", "first_author"])?;
        for (year, count) in &self.by_year {
            let first = self.first_author_by_year.get(year).copied().unwrap_or(0);
            csv_writer.write_record([year.to_string(), count.to_string(), first.to_string()])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

fn topic_text(record: &Record) -> String {
    format!(
        "{} {}",
        record.title.as_deref().unwrap_or_default(),
        record.journal.as_deref().unwrap_or_default()
    )
    .to_lowercase()
}

/// Counts non-blank values; most frequent first, ties by name.
fn top_values<'a>(values: impl Iterator<Item = &'a str>, n: usize) -> Vec<Ranked> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| Ranked {
            name: name.to_string(),
            count,
        })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)))
        .take(n)
        .collect()
}

fn duplicate_values(records: &[Record], key: DuplicateKey) -> Vec<String> {
    Deduplicator::new()
        .with_config(DeduplicatorConfig {
            key,
            ..Default::default()
        })
        .find_duplicates(records)
        .into_iter()
        .map(|group| group.key)
        .collect()
}
