//! Identifier helpers shared by the document and type generators.

use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid separator regex"));
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid identifier regex"));

/// Joins `parts` into a PascalCase identifier.
///
/// Parts are split on non-alphanumeric characters and before every run of capitals,
/// then each segment gets an upper-case first letter: `("/chat", "newMessage")` becomes
/// `ChatNewMessage`.
pub fn make_clean_id(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| SEPARATOR_RE.split(part))
        .flat_map(split_capital_runs)
        .map(upper_first)
        .collect()
}

/// Channel identifier of a namespace; the root namespace is `Root`
pub fn namespace_id(path: &str) -> String {
    let id = make_clean_id(&[path]);
    if id.is_empty() {
        "Root".to_string()
    } else {
        id
    }
}

/// Whether `name` can be used as a bare TypeScript property name
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

fn split_capital_runs(segment: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut previous_upper = false;
    for ch in segment.chars() {
        let upper = ch.is_ascii_uppercase();
        if (upper && !previous_upper) || out.is_empty() {
            out.push(String::new());
        }
        if let Some(last) = out.last_mut() {
            last.push(ch);
        }
        previous_upper = upper;
    }
    out
}

fn upper_first(segment: String) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => segment,
    }
}
