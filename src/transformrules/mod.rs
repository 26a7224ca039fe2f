//! Path-scoped rule matching shared by the text-filter pipeline (`spec.md`
//! §4.3, selecting filter names) and the transform-rule engine proper
//! (`spec.md` §4.4, appending semantic transforms to the AST). Both apply
//! the same exact/wildcard/wildcard-recursive matching and last-match-wins
//! resolution over a list of `{path, wildcard?, recursive?, names}` rules;
//! only what the matched `names` mean to the caller differs.

use crate::ast::{Program, TopLevelItem, Transform, TransformPhase};
use crate::common::Position;

#[derive(Clone, Debug, PartialEq)]
pub struct PathRule {
    pub path: String,
    pub wildcard: bool,
    pub recursive: bool,
    pub names: Vec<String>,
}

impl PathRule {
    pub fn matches(&self, full_path: &str) -> bool {
        if !self.wildcard {
            return self.path == full_path;
        }
        let Some(remainder) = full_path
            .strip_prefix(&self.path)
            .filter(|r| !r.is_empty())
        else {
            return false;
        };
        let remainder = remainder.strip_prefix('/').unwrap_or(remainder);
        if remainder.is_empty() {
            return false;
        }
        if self.recursive {
            true
        } else {
            !remainder.contains('/')
        }
    }
}

/// The last rule in source order whose pattern matches `full_path`, per
/// `spec.md` §4.4's "last matching rule wins".
pub fn best_match<'a>(rules: &'a [PathRule], full_path: &str) -> Option<&'a PathRule> {
    rules.iter().filter(|r| r.matches(full_path)).last()
}

/// Applies every rule to every `Definition`/`Execution` in `program`,
/// appending matched names as `Semantic`-phase transforms (`spec.md` §4.4).
pub fn apply(program: &mut Program, rules: &[PathRule]) {
    for item in &mut program.items {
        let (full_path, transforms, position): (&str, &mut Vec<Transform>, Position) = match item {
            TopLevelItem::Definition(d) => (&d.full_path, &mut d.transforms, d.position),
            TopLevelItem::Execution(e) => (&e.full_path, &mut e.transforms, e.position),
            TopLevelItem::Import(_) => continue,
        };
        if let Some(rule) = best_match(rules, full_path) {
            for name in &rule.names {
                transforms.push(Transform::new(name.clone(), TransformPhase::Semantic, position));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rule_requires_equality() {
        let rule = PathRule {
            path: "/a/b".to_string(),
            wildcard: false,
            recursive: false,
            names: vec!["x".to_string()],
        };
        assert!(rule.matches("/a/b"));
        assert!(!rule.matches("/a/b/c"));
    }

    #[test]
    fn non_recursive_wildcard_matches_single_segment_only() {
        let rule = PathRule {
            path: "/a".to_string(),
            wildcard: true,
            recursive: false,
            names: vec![],
        };
        assert!(rule.matches("/a/b"));
        assert!(!rule.matches("/a/b/c"));
    }

    #[test]
    fn recursive_wildcard_matches_any_remainder() {
        let rule = PathRule {
            path: "/a".to_string(),
            wildcard: true,
            recursive: true,
            names: vec![],
        };
        assert!(rule.matches("/a/b/c/d"));
    }

    #[test]
    fn last_matching_rule_wins() {
        let rules = vec![
            PathRule {
                path: "/a".to_string(),
                wildcard: true,
                recursive: true,
                names: vec!["first".to_string()],
            },
            PathRule {
                path: "/a/b".to_string(),
                wildcard: false,
                recursive: false,
                names: vec!["second".to_string()],
            },
        ];
        let matched = best_match(&rules, "/a/b").unwrap();
        assert_eq!(matched.names, vec!["second".to_string()]);
    }
}
