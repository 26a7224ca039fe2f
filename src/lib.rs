//! Front-end for a slash-path systems language: a synchronous pipeline of
//! text-filter rewriting, lexing, parsing, transform-rule application, and
//! semantic validation (`spec.md` §2). Each stage's error type is distinct;
//! [`compile`] aggregates them behind a single [`RoutecError`] for callers
//! that don't need to match on stage.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod ast;
pub mod common;
pub mod lexing;
pub mod parsing;
pub mod registries;
pub mod semantics;
pub mod strings;
pub mod textfilter;
pub mod transformrules;

use thiserror::Error as ThisError;

pub use ast::Program;

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum RoutecError {
    #[error("filter/rewrite error: {0}")]
    FilterRewrite(#[from] textfilter::Error),

    #[error("lexical error: {0}")]
    Lexical(#[from] lexing::Error),

    #[error("syntax error: {0}")]
    Syntactic(#[from] parsing::Error),

    #[error("semantic error: {0}")]
    Semantic(#[from] semantics::Error),
}

impl RoutecError {
    /// The `(category, message)` pair `spec.md` §7 requires every error to
    /// surface as.
    pub fn category(&self) -> &'static str {
        match self {
            RoutecError::FilterRewrite(_) => "filter/rewrite",
            RoutecError::Lexical(_) => "lexical",
            RoutecError::Syntactic(_) => "syntactic",
            RoutecError::Semantic(_) => "semantic",
        }
    }
}

/// The filters enabled when a source file opens with no leading transform
/// list and no transform rule overrides its envelope (`spec.md` §4.3's
/// "global default", left unspecified beyond the named filters — resolved
/// here to the four rewriting filters, `append_operators` being opt-in).
pub fn default_text_filters() -> Vec<String> {
    vec![
        "collections".to_string(),
        "operators".to_string(),
        "implicit-i32".to_string(),
        "implicit-utf8".to_string(),
    ]
}

#[derive(Clone, Debug)]
pub struct CompileOptions {
    pub text_filter: textfilter::TextFilterOptions,
    pub transform_rules: Vec<transformrules::PathRule>,
    pub validation: semantics::ValidationOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            text_filter: textfilter::TextFilterOptions {
                default_filters: default_text_filters(),
                rules: Vec::new(),
            },
            transform_rules: Vec::new(),
            validation: semantics::ValidationOptions::default(),
        }
    }
}

/// Runs the full pipeline: text filters, lexer, parser, transform-rule
/// engine, then the semantic validator. Fail-fast: the first stage to
/// error stops the pipeline (`spec.md` §5).
pub fn compile(source: &str, options: &CompileOptions) -> Result<Program, RoutecError> {
    log::debug!("text-filter pass starting ({} bytes)", source.len());
    let filtered = textfilter::apply(source, &options.text_filter)?;
    log::debug!("text-filter pass complete");

    log::debug!("lexing starting");
    let tokens = lexing::lex_all(&filtered)?;
    log::trace!("lexed {} tokens", tokens.len());

    log::debug!("parsing starting");
    let mut program = parsing::parse(tokens)?;
    log::debug!("parsing complete: {} top-level items", program.items.len());

    log::debug!("applying transform rules");
    transformrules::apply(&mut program, &options.transform_rules);

    log::debug!("running semantic validator");
    semantics::validate(&program, &options.validation)?;
    log::debug!("semantic validation passed");

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_program() {
        let program = compile("[return<int>]\nmain() { return(1i32) }\n", &CompileOptions::default()).unwrap();
        assert!(program.find_definition("/main").is_some());
    }

    #[test]
    fn surfaces_unbound_names_as_a_semantic_error() {
        let err = compile("main(){ return(a+b) }\n", &CompileOptions::default()).unwrap_err();
        assert_eq!(err.category(), "semantic");
    }

    #[test]
    fn surfaces_duplicate_definitions_as_a_semantic_error() {
        let err = compile("widget() { }\nwidget() { }\n", &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, RoutecError::Semantic(semantics::Error::DuplicateFullPath(_, _))));
    }
}
