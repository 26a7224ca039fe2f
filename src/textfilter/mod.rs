//! The text-filter pipeline (`spec.md` §4.3), the largest single component:
//! a configurable rewrite of surface syntax (infix operators, brace/bracket
//! collection literals, bare numeric/string literals) into the canonical
//! call-based form the parser expects.
//!
//! Filters apply, in the caller-given order, across the whole source
//! (`spec.md`'s per-envelope active-filter-set resolution is simplified
//! here to a single whole-source resolution; see `DESIGN.md`). Comments,
//! string bodies, and `include<…>` payloads are masked out first so no
//! filter can alter bytes inside them.

mod collections;
mod implicit;
mod mask;
mod operators;
mod tokens;

use crate::registries;
use crate::transformrules::PathRule;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextFilterOptions {
    /// Ordered, enabled-by-default filter names.
    pub default_filters: Vec<String>,
    pub rules: Vec<PathRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    UnterminatedComment,
    UnterminatedString,
    UnterminatedIncludePayload,
    UnterminatedTemplateList,
    UnterminatedCollectionLiteral,
    MismatchedParentheses,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Error::UnterminatedComment => "unterminated comment",
            Error::UnterminatedString => "unterminated string literal",
            Error::UnterminatedIncludePayload => "unterminated include<…> payload",
            Error::UnterminatedTemplateList => "unterminated template list inside a collection literal",
            Error::UnterminatedCollectionLiteral => "unterminated collection literal",
            Error::MismatchedParentheses => "mismatched parentheses",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for Error {}

impl From<mask::Error> for Error {
    fn from(e: mask::Error) -> Self {
        match e {
            mask::Error::UnterminatedComment(_) => Error::UnterminatedComment,
            mask::Error::UnterminatedString(_) => Error::UnterminatedString,
            mask::Error::UnterminatedIncludePayload(_) => Error::UnterminatedIncludePayload,
        }
    }
}

/// The envelope-resolution leading transform list, if `source` opens with
/// one, scanned loosely (no full parse) purely to look for filter names.
fn leading_filter_names(source: &str) -> Vec<String> {
    let trimmed = source.trim_start();
    if !trimmed.starts_with('[') {
        return Vec::new();
    }
    let mut depth = 0i32;
    let mut names = Vec::new();
    let mut current = String::new();
    for c in trimmed.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    if !current.trim().is_empty() {
                        names.push(current.trim().to_string());
                    }
                    break;
                }
            }
            ',' if depth == 1 => {
                if !current.trim().is_empty() {
                    names.push(current.trim().to_string());
                }
                current.clear();
            }
            _ if depth >= 1 => current.push(c),
            _ => {}
        }
    }
    names
        .into_iter()
        .map(|n| n.split(['<', '(']).next().unwrap_or(&n).trim().to_string())
        .collect()
}

fn resolve_active_filters(source: &str, options: &TextFilterOptions) -> Vec<String> {
    let leading = leading_filter_names(source);
    let known_leading: Vec<String> = leading
        .iter()
        .filter(|n| registries::is_known_text_filter(n))
        .cloned()
        .collect();

    let mut active = if !known_leading.is_empty() {
        known_leading
    } else if let Some(rule) = crate::transformrules::best_match(&options.rules, "") {
        let from_rule: Vec<String> = rule
            .names
            .iter()
            .filter(|n| registries::is_known_text_filter(n))
            .cloned()
            .collect();
        if from_rule.is_empty() {
            options.default_filters.clone()
        } else {
            from_rule
        }
    } else {
        options.default_filters.clone()
    };

    // `append_operators`: admits `operators` into the active set once, if
    // the envelope's own explicit list names both.
    if leading.iter().any(|n| n == "append_operators") && !active.iter().any(|n| n == "operators")
    {
        active.push("operators".to_string());
    }
    active
}

/// Runs the configured filters over `source`, returning the rewritten text
/// ready for the lexer.
pub fn apply(source: &str, options: &TextFilterOptions) -> Result<String, Error> {
    let (masked, masks) = mask::mask(source)?;
    let active = resolve_active_filters(source, options);

    let mut current = masked;
    for filter in &active {
        current = match filter.as_str() {
            "collections" => collections::apply(&current)?,
            "operators" => operators::apply(&current)?,
            "implicit-i32" => implicit::implicit_i32(&current),
            "implicit-utf8" => implicit::implicit_utf8(&current, &masks),
            "append_operators" => current,
            _ => current,
        };
    }

    Ok(mask::unmask(&current, &masks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(filters: &[&str]) -> TextFilterOptions {
        TextFilterOptions {
            default_filters: filters.iter().map(|s| s.to_string()).collect(),
            rules: Vec::new(),
        }
    }

    #[test]
    fn full_pipeline_rewrites_operators_collections_and_implicit_suffixes() {
        let opts = options(&["collections", "operators", "implicit-i32", "implicit-utf8"]);
        let source = r#"main() { return(array<i32>{1, 2} ) }"#;
        let out = apply(source, &opts).unwrap();
        assert_eq!(out, "main() { return(array<i32>(1i32, 2i32)) }");
    }

    #[test]
    fn comments_and_strings_survive_byte_for_byte() {
        let opts = options(&["implicit-i32"]);
        let source = "a(1) // keep 5 as-is\nb(\"keep 6 too\")";
        let out = apply(source, &opts).unwrap();
        assert_eq!(out, "a(1i32) // keep 5 as-is\nb(\"keep 6 too\")");
    }

    #[test]
    fn envelope_leading_filter_list_overrides_the_default() {
        let opts = options(&["implicit-i32"]);
        let source = "[operators] main() { return(a + 1) }";
        let out = apply(source, &opts).unwrap();
        assert_eq!(out, "[operators] main() { return(plus(a, 1)) }");
    }

    #[test]
    fn append_operators_admits_operators_once() {
        let opts = options(&["implicit-i32"]);
        let source = "[append_operators] main() { return(a + 1) }";
        let out = apply(source, &opts).unwrap();
        assert_eq!(out, "[append_operators] main() { return(plus(a, 1)) }");
    }
}
