use crate::regex::Regex;
use std::sync::LazyLock;

static DOI_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"10\.\d{4,9}/\S+").unwrap());

/// Collapses every whitespace run to a single space and trims both ends.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalizes a DOI by removing URL prefixes, `doi:` labels and `[doi]` suffixes.
///
/// Returns `None` when nothing shaped like a DOI is present.
///
/// # Arguments
///
/// * `doi_str` - The DOI string to format
pub(crate) fn format_doi(doi_str: &str) -> Option<String> {
    let doi = doi_str
        .trim()
        .trim_end_matches("[doi]")
        .replace(char::is_whitespace, "")
        .to_lowercase();

    DOI_REGEX.find(&doi).map(|m| m.as_str().to_string())
}

/// Parses a year value, accepting only plain ASCII digits.
pub(crate) fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Splits a BibTeX author list on the literal `" and "` separator.
pub(crate) fn split_authors(value: &str) -> Vec<String> {
    value
        .split(" and ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Family name of an author written as "Lastname, Firstname" or "Firstname Lastname".
pub(crate) fn family_name(name: &str) -> &str {
    match name.split_once(',') {
        Some((family, _)) => family.trim(),
        None => name.split_whitespace().last().unwrap_or(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("Foo  bar", "Foo bar")]
    #[case("  Foo\n\tbar  ", "Foo bar")]
    #[case("", "")]
    fn test_collapse_whitespace(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(collapse_whitespace(input), expected);
    }

    #[rstest]
    #[case("10.1000/test", Some("10.1000/test"))]
    #[case("10.1000/test [doi]", Some("10.1000/test"))]
    #[case("https://doi.org/10.1000/test", Some("10.1000/test"))]
    #[case("http://dx.doi.org/10.1000/TEST", Some("10.1000/test"))]
    #[case("doi: 10.1000/test", Some("10.1000/test"))]
    #[case("DOI:10.1016/j.ifacol.2020.12.2286", Some("10.1016/j.ifacol.2020.12.2286"))]
    #[case("", None)]
    #[case("invalid", None)]
    fn test_format_doi(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(format_doi(input).as_deref(), expected);
    }

    #[rstest]
    #[case("2020", Some(2020))]
    #[case(" 1998 ", Some(1998))]
    #[case("2020a", None)]
    #[case("in press", None)]
    #[case("", None)]
    fn test_parse_year(#[case] input: &str, #[case] expected: Option<i32>) {
        assert_eq!(parse_year(input), expected);
    }

    #[test]
    fn test_split_authors() {
        assert_eq!(
            split_authors("Pavel Osinenko and  Grigory Yaremenko and Ilya Osokin"),
            vec!["Pavel Osinenko", "Grigory Yaremenko", "Ilya Osokin"]
        );
        assert_eq!(split_authors("Smith, John"), vec!["Smith, John"]);
        assert!(split_authors("").is_empty());
    }

    #[test]
    fn test_split_authors_keeps_names_containing_and() {
        // Only the spaced separator splits; "Anderson" stays whole.
        assert_eq!(
            split_authors("Anderson, K. and Sandberg, H."),
            vec!["Anderson, K.", "Sandberg, H."]
        );
    }

    #[rstest]
    #[case("Smith, John", "Smith")]
    #[case("John Smith", "Smith")]
    #[case("von Neumann, John", "von Neumann")]
    #[case("Plato", "Plato")]
    #[case("", "")]
    fn test_family_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(family_name(input), expected);
    }
}
