//! Identifier re-derivation.
//!
//! Replaces author-year citation keys with keys built from the start of the
//! title, e.g. `deep_learning_for_control_2021`. Only the identifier token
//! inside an entry's text is rewritten; every other byte is kept as is.
//!
//! # Example
//!
//! ```
//! use bibtidy::Rekeyer;
//!
//! let input = "% exported\n@article{Smith2020,\n  title = {Deep Learning: A Survey},\n  year = {2020}\n}\n";
//! let (output, outcome) = Rekeyer::new().rekey_text(input).unwrap();
//!
//! assert_eq!(output, "% exported\n@article{deep_learning_a_survey_2020,\n  title = {Deep Learning: A Survey},\n  year = {2020}\n}\n");
//! assert_eq!(outcome.renamed[0].old, "Smith2020");
//! ```

use crate::bibtex::{EntrySplit, parse_span, preamble, scan_header};
use crate::metadata::ArticleHint;
use crate::utils::format_doi;
use crate::{BibError, Diagnostic, Record, Result};
use either::{Left, Right};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Configuration for identifier re-derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RekeyConfig {
    /// Number of leading title words kept in the identifier.
    pub max_words: usize,
    /// Append `_<year>` when the year is known.
    pub append_year: bool,
}

impl Default for RekeyConfig {
    fn default() -> Self {
        Self {
            max_words: 4,
            append_year: true,
        }
    }
}

/// Derives identifiers from titles and rewrites them into entry text.
#[derive(Debug, Clone, Default)]
pub struct Rekeyer {
    config: RekeyConfig,
    /// Scraped hints keyed by canonical DOI.
    hints: HashMap<String, ArticleHint>,
}

/// An identifier change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Renamed {
    pub old: String,
    pub new: String,
}

/// Two records that leave a pass with the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    /// The derived identifier
    pub identifier: String,
    /// Original identifier of the record that took it first
    pub previous: String,
    /// Original identifier of the later record
    pub current: String,
}

/// The outcome of a re-keying run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RekeyOutcome {
    /// Every record, renamed where possible, in input order
    pub records: Vec<Record>,
    pub renamed: Vec<Renamed>,
    pub collisions: Vec<Collision>,
    /// Records left unchanged and spans that could not be read
    pub diagnostics: Vec<Diagnostic>,
}

impl RekeyOutcome {
    /// Old to new identifier mapping, for rewriting citations elsewhere.
    ///
    /// If one old identifier was renamed twice, the first rename wins.
    pub fn mapping(&self) -> HashMap<String, String> {
        let mut mapping = HashMap::with_capacity(self.renamed.len());
        for renamed in &self.renamed {
            mapping
                .entry(renamed.old.clone())
                .or_insert_with(|| renamed.new.clone());
        }
        mapping
    }
}

/// Replaces the identifier token of an entry's text.
///
/// Returns `None` if the text has no `@kind{identifier,` header.
///
/// # Examples
///
/// ```
/// use bibtidy::rekey::rewrite_identifier;
///
/// let text = "@article{ old , title = {T}}";
/// assert_eq!(rewrite_identifier(text, "new").as_deref(), Some("@article{ new , title = {T}}"));
/// ```
pub fn rewrite_identifier(text: &str, identifier: &str) -> Option<String> {
    let range = scan_header(text)?.identifier_range;
    let mut out = String::with_capacity(text.len() + identifier.len());
    out.push_str(&text[..range.start]);
    out.push_str(identifier);
    out.push_str(&text[range.end..]);
    Some(out)
}

impl Rekeyer {
    /// Creates a new Rekeyer keeping four title words and the year.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new Rekeyer with custom configuration.
    #[must_use]
    pub fn with_config(mut self, config: RekeyConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds scraped hints consulted for records without a usable title.
    ///
    /// Hints are matched by canonical DOI; the first hint for a DOI wins.
    #[must_use]
    pub fn with_hints(mut self, hints: Vec<ArticleHint>) -> Self {
        for hint in hints {
            if let Some(doi) = hint.canonical_doi() {
                self.hints.entry(doi).or_insert(hint);
            }
        }
        self
    }

    /// Builds an identifier from a title and an optional year.
    ///
    /// Everything but letters, digits and whitespace is dropped, the rest is
    /// lowercased, and the first words are joined with underscores. Returns
    /// `None` when no word remains.
    pub fn derive_identifier(&self, title: &str, year: Option<i32>) -> Option<String> {
        let cleaned: String = title
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let stem = cleaned
            .split_whitespace()
            .take(self.config.max_words)
            .join("_");
        if stem.is_empty() {
            return None;
        }
        match year {
            Some(year) if self.config.append_year => Some(format!("{stem}_{year}")),
            _ => Some(stem),
        }
    }

    /// The identifier a record should get, from its own title or else from
    /// the hint matching its DOI.
    pub fn identifier_for(&self, record: &Record) -> Option<String> {
        if let Some(identifier) = record
            .title
            .as_deref()
            .and_then(|title| self.derive_identifier(title, record.year))
        {
            return Some(identifier);
        }
        let hint = record
            .doi
            .as_deref()
            .and_then(format_doi)
            .and_then(|doi| self.hints.get(&doi))?;
        debug!(identifier = %record.identifier, "using scraped hint for identifier");
        self.derive_identifier(hint.title.as_deref()?, record.year.or(hint.year))
    }

    /// Re-derives the identifier of every record.
    ///
    /// Records without a usable title are passed through unchanged and
    /// reported as [`Diagnostic::IrreducibleTitle`].
    pub fn rekey(&self, records: Vec<Record>) -> RekeyOutcome {
        let mut run = Run::default();
        for record in records {
            let record = run.rekey_record(self, record);
            run.outcome.records.push(record);
        }
        run.outcome
    }

    /// Re-derives identifiers inside a whole bibliography.
    ///
    /// Text before the first entry, directives, and spans that cannot be
    /// read are copied unchanged; within entries only identifier tokens
    /// change.
    ///
    /// # Errors
    ///
    /// Returns [`BibError::EmptyInput`] if the input is empty or whitespace only.
    pub fn rekey_text(&self, text: &str) -> Result<(String, RekeyOutcome)> {
        if text.trim().is_empty() {
            return Err(BibError::EmptyInput);
        }

        let mut run = Run::default();
        let mut output = String::with_capacity(text.len());
        output.push_str(preamble(text));

        for span in EntrySplit::new(text) {
            match parse_span(&span) {
                Some(Right(record)) => {
                    let record = run.rekey_record(self, record);
                    match rewrite_identifier(span.text, &record.identifier) {
                        Some(rewritten) => output.push_str(&rewritten),
                        None => output.push_str(span.text),
                    }
                    run.outcome.records.push(record);
                }
                Some(Left(diagnostic)) => {
                    run.outcome.diagnostics.push(diagnostic);
                    output.push_str(span.text);
                }
                None => output.push_str(span.text),
            }
        }

        Ok((output, run.outcome))
    }
}

/// State of one re-keying pass.
#[derive(Default)]
struct Run {
    outcome: RekeyOutcome,
    /// Output identifier to the original identifier of its first owner.
    assigned: HashMap<String, String>,
}

impl Run {
    fn rekey_record(&mut self, rekeyer: &Rekeyer, mut record: Record) -> Record {
        let Some(identifier) = rekeyer.identifier_for(&record) else {
            warn!(identifier = %record.identifier, "no title found; identifier left unchanged");
            self.outcome.diagnostics.push(Diagnostic::IrreducibleTitle {
                identifier: record.identifier.clone(),
            });
            self.claim(record.identifier.clone(), &record.identifier);
            return record;
        };

        self.claim(identifier.clone(), &record.identifier);

        if identifier != record.identifier {
            debug!(old = %record.identifier, new = %identifier, "renaming entry");
            if let Some(raw_text) = rewrite_identifier(&record.raw_text, &identifier) {
                record.raw_text = raw_text;
            }
            self.outcome.renamed.push(Renamed {
                old: std::mem::replace(&mut record.identifier, identifier.clone()),
                new: identifier,
            });
        }
        record
    }

    /// Records that `current` leaves the pass as `identifier`, reporting a
    /// collision if an earlier record already did.
    fn claim(&mut self, identifier: String, current: &str) {
        match self.assigned.get(&identifier) {
            Some(previous) => {
                warn!(%identifier, previous = %previous, current, "identifier collides");
                self.outcome.collisions.push(Collision {
                    identifier,
                    previous: previous.clone(),
                    current: current.to_string(),
                });
            }
            None => {
                self.assigned.insert(identifier, current.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordParser;
    use crate::bibtex::BibtexParser;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("A Very Long Descriptive Title Here", Some(2019), "a_very_long_descriptive_2019")]
    #[case("Deep Learning", None, "deep_learning")]
    #[case("Effects of sampling and horizon", Some(2022), "effects_of_sampling_and_2022")]
    #[case("The {RNA} World: re-viewed", Some(1986), "the_rna_world_reviewed_1986")]
    #[case("  Spaced\n\tout   title ", None, "spaced_out_title")]
    #[case("snake_case_title here", None, "snakecasetitle_here")]
    #[case("Über Regelung", Some(2001), "über_regelung_2001")]
    fn test_derive_identifier(#[case] title: &str, #[case] year: Option<i32>, #[case] expected: &str) {
        assert_eq!(Rekeyer::new().derive_identifier(title, year).as_deref(), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("?!: -- ...")]
    fn test_derive_identifier_irreducible(#[case] title: &str) {
        assert_eq!(Rekeyer::new().derive_identifier(title, Some(2020)), None);
    }

    #[test]
    fn test_config() {
        let rekeyer = Rekeyer::new().with_config(RekeyConfig {
            max_words: 2,
            append_year: false,
        });
        assert_eq!(
            rekeyer.derive_identifier("A Very Long Title", Some(2019)).as_deref(),
            Some("a_very")
        );

        let config: RekeyConfig = serde_json::from_str(r#"{"max_words": 3}"#).unwrap();
        assert_eq!(config.max_words, 3);
        assert!(config.append_year);
    }

    #[rstest]
    #[case("@article{old, title = {T}}", "@article{new, title = {T}}")]
    #[case("@article{ old ,\n  title = {T}\n}", "@article{ new ,\n  title = {T}\n}")]
    #[case("@book(old,\n title = {T})", "@book(new,\n title = {T})")]
    fn test_rewrite_identifier(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(rewrite_identifier(text, "new").as_deref(), Some(expected));
    }

    #[test]
    fn test_rewrite_identifier_without_header() {
        assert_eq!(rewrite_identifier("not an entry", "new"), None);
    }

    #[test]
    fn test_rekey_renames_and_reports() {
        let input = "@article{Smith2020, title = {Deep Learning for Control}, year = {2020}}\n\
                     @misc{untitled, note = {no title}}\n\
                     @article{Doe2021, title = {Neural Networks}}";
        let records = BibtexParser::new().parse(input).unwrap();
        let outcome = Rekeyer::new().rekey(records);

        let ids = outcome.records.iter().map(|r| r.identifier.as_str()).collect_vec();
        assert_eq!(ids, vec!["deep_learning_for_control_2020", "untitled", "neural_networks"]);
        assert_eq!(
            outcome.records[0].raw_text,
            "@article{deep_learning_for_control_2020, title = {Deep Learning for Control}, year = {2020}}"
        );
        assert_eq!(
            outcome.renamed,
            vec![
                Renamed {
                    old: "Smith2020".to_string(),
                    new: "deep_learning_for_control_2020".to_string(),
                },
                Renamed {
                    old: "Doe2021".to_string(),
                    new: "neural_networks".to_string(),
                },
            ]
        );
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::IrreducibleTitle {
                identifier: "untitled".to_string(),
            }]
        );
        assert_eq!(outcome.mapping()["Smith2020"], "deep_learning_for_control_2020");
    }

    #[test]
    fn test_rekey_keeps_matching_identifier() {
        let input = "@article{deep_learning_2020, title = {Deep Learning}, year = {2020}}";
        let records = BibtexParser::new().parse(input).unwrap();
        let outcome = Rekeyer::new().rekey(records.clone());
        assert!(outcome.renamed.is_empty());
        assert_eq!(outcome.records, records);
    }

    #[test]
    fn test_rekey_round_trip_changes_only_identifier() {
        let input = r#"@article{osinenko2022effects,
  title={Effects of sampling and horizon in predictive reinforcement learning},
  author={Osinenko, Pavel and Dobriborsci, Dmitrii},
  journal={IEEE Access},
  volume={10},
  pages={127611--127618},
  year={2022},
  note = {kept   as    is}
}

@inproceedings{yaremenko2023,
  title = "Critic as Lyapunov function",
  author = {Yaremenko, Grigory},
  year = 2023
}
"#;
        let parser = BibtexParser::new();
        let before = parser.parse(input).unwrap();
        let (output, outcome) = Rekeyer::new().rekey_text(input).unwrap();
        let after = parser.parse(&output).unwrap();

        assert_eq!(outcome.renamed.len(), 2);
        assert_eq!(after.len(), before.len());
        for (old, new) in before.iter().zip(&after) {
            let expected = Record {
                identifier: new.identifier.clone(),
                raw_text: new.raw_text.clone(),
                ..old.clone()
            };
            assert_eq!(new, &expected);
        }
        assert_eq!(after[0].identifier, "effects_of_sampling_and_2022");
        assert_eq!(after[1].identifier, "critic_as_lyapunov_function_2023");
        assert_eq!(after, outcome.records);
        assert_eq!(
            output.replace("effects_of_sampling_and_2022", "osinenko2022effects")
                .replace("critic_as_lyapunov_function_2023", "yaremenko2023"),
            input
        );
    }

    #[test]
    fn test_rekey_text_preserves_unparsed_text() {
        let input = "Header line\n@comment{keep me}\n@broken entry\n@article{A, title = {Short}}\n\n";
        let (output, outcome) = Rekeyer::new().rekey_text(input).unwrap();

        assert_eq!(output, "Header line\n@comment{keep me}\n@broken entry\n@article{short, title = {Short}}\n\n");
        assert!(matches!(
            outcome.diagnostics.as_slice(),
            [Diagnostic::MalformedEntry { line: 3, .. }]
        ));
    }

    #[test]
    fn test_rekey_text_empty_input() {
        assert!(matches!(Rekeyer::new().rekey_text("\n  \n"), Err(BibError::EmptyInput)));
    }

    #[test]
    fn test_collisions_are_reported() {
        let input = "@article{A, title = {Same Title}, year = {2020}}\n@article{B, title = {Same  title!}, year = {2020}}";
        let records = BibtexParser::new().parse(input).unwrap();
        let outcome = Rekeyer::new().rekey(records);

        assert_eq!(outcome.records[0].identifier, "same_title_2020");
        assert_eq!(outcome.records[1].identifier, "same_title_2020");
        assert_eq!(
            outcome.collisions,
            vec![Collision {
                identifier: "same_title_2020".to_string(),
                previous: "A".to_string(),
                current: "B".to_string(),
            }]
        );
    }

    #[rstest]
    #[case(
        "@misc{same_title_2020, note = {no title}}\n@article{B, title = {Same Title}, year = {2020}}",
        "same_title_2020",
        "B"
    )]
    #[case(
        "@article{B, title = {Same Title}, year = {2020}}\n@misc{same_title_2020, note = {no title}}",
        "B",
        "same_title_2020"
    )]
    #[case(
        "@article{same_title_2020, title = {Same Title}, year = {2020}}\n@article{B, title = {Same Title}, year = {2020}}",
        "same_title_2020",
        "B"
    )]
    fn test_collisions_with_unchanged_identifiers(
        #[case] input: &str,
        #[case] previous: &str,
        #[case] current: &str,
    ) {
        let (output, outcome) = Rekeyer::new().rekey_text(input).unwrap();

        assert_eq!(output.matches("{same_title_2020,").count(), 2);
        assert_eq!(
            outcome.collisions,
            vec![Collision {
                identifier: "same_title_2020".to_string(),
                previous: previous.to_string(),
                current: current.to_string(),
            }]
        );
    }

    #[test]
    fn test_hint_supplies_missing_title() {
        let hints = vec![
            ArticleHint {
                doi: "https://doi.org/10.1000/ABC".to_string(),
                title: Some("Stabilizing Reinforcement Learning".to_string()),
                year: Some(2021),
                ..Default::default()
            },
            ArticleHint {
                doi: "10.1000/abc".to_string(),
                title: Some("Ignored duplicate hint".to_string()),
                ..Default::default()
            },
        ];
        let input = "@article{X, doi = {10.1000/abc}}\n@article{Y, doi = {10.1000/abc}, year = {2019}}\n@article{Z, doi = {10.1000/other}}";
        let records = BibtexParser::new().parse(input).unwrap();
        let outcome = Rekeyer::new().with_hints(hints).rekey(records);

        let ids = outcome.records.iter().map(|r| r.identifier.as_str()).collect_vec();
        assert_eq!(
            ids,
            vec![
                "stabilizing_reinforcement_learning_2021",
                "stabilizing_reinforcement_learning_2019",
                "Z",
            ]
        );
        assert_eq!(outcome.diagnostics.len(), 1);
    }
}
