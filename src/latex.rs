//! Helpers for LaTeX documents citing a bibliography.

use crate::Record;
use crate::regex::{Captures, Regex};
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static BIBLIOGRAPHY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\bibliography\{[^}]*\}").unwrap());

// \cite, \citep, \citet*, \nocite, \parencite[p.~3]{...}, ...
static CITE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\\[a-zA-Z]*cite[a-zA-Z]*\*?(?:\s*\[[^\]]*\])*\s*\{)([^}]*)(\})").unwrap()
});

/// One `\nocite{identifier}` line per record.
///
/// # Examples
///
/// ```
/// use bibtidy::Record;
/// use bibtidy::latex::nocite_commands;
///
/// let records = vec![
///     Record { identifier: "a".to_string(), ..Default::default() },
///     Record { identifier: "b".to_string(), ..Default::default() },
/// ];
/// assert_eq!(nocite_commands(&records), "\\nocite{a}\n\\nocite{b}");
/// ```
pub fn nocite_commands(records: &[Record]) -> String {
    records
        .iter()
        .map(|record| format!("\\nocite{{{}}}", record.identifier))
        .join("\n")
}

/// Inserts `commands` on their own line before the first `\bibliography{...}`.
///
/// Returns `None` if the document has no `\bibliography` command.
pub fn insert_before_bibliography(tex: &str, commands: &str) -> Option<String> {
    let found = BIBLIOGRAPHY_REGEX.find(tex)?;
    let mut out = String::with_capacity(tex.len() + commands.len() + 1);
    out.push_str(&tex[..found.start()]);
    if !commands.is_empty() {
        out.push_str(commands);
        out.push('\n');
    }
    out.push_str(&tex[found.start()..]);
    Some(out)
}

/// Rewrites citation keys inside `\cite`-like commands.
///
/// Every key found in `mapping` is replaced; other keys, optional `[...]`
/// arguments, and the spacing around keys are left alone. Returns the new
/// text and the number of keys replaced.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use bibtidy::latex::rewrite_citation_keys;
///
/// let mapping = HashMap::from([("Smith2020".to_string(), "deep_learning_2020".to_string())]);
/// let (tex, count) = rewrite_citation_keys(r"see \citep[p.~3]{Smith2020, Doe2021}", &mapping);
/// assert_eq!(tex, r"see \citep[p.~3]{deep_learning_2020, Doe2021}");
/// assert_eq!(count, 1);
/// ```
pub fn rewrite_citation_keys(tex: &str, mapping: &HashMap<String, String>) -> (String, usize) {
    let mut count = 0;
    let rewritten = CITE_REGEX
        .replace_all(tex, |caps: &Captures| {
            let keys = caps[2]
                .split(',')
                .map(|part| {
                    let key = part.trim();
                    match mapping.get(key) {
                        Some(new) => {
                            count += 1;
                            part.replacen(key, new, 1)
                        }
                        None => part.to_string(),
                    }
                })
                .join(",");
            format!("{}{}{}", &caps[1], keys, &caps[3])
        })
        .into_owned();
    debug!(count, "rewrote citation keys");
    (rewritten, count)
}
