//! Redirect rule matching.
//!
//! # Responsibilities
//! - Compile `RedirectRule`s into one-to-one, pattern and mirror variants
//! - Compute the target location for a request path and query string
//!
//! # Design Decisions
//! - Source and request path are compared without their trailing slash
//! - First matching rule in document order wins
//! - Pattern rules without a `*` in their source never match

use axum::http::StatusCode;
use serde::Serialize;

use crate::snapshot::{RedirectRule, RedirectType};

/// A redirect to send back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub location: String,
    pub permanent: bool,
}

impl Redirect {
    pub fn status(&self) -> StatusCode {
        if self.permanent {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::FOUND
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RedirectKind {
    /// Whole-path match.
    OneToOne { source: String },
    /// `source` is the text before the wildcard; the remainder replaces `*` in the target.
    Pattern { prefix: String },
    /// Prefix strip-and-replace; the remainder is appended to the target.
    Mirror { prefix: String },
}

#[derive(Debug, Clone)]
struct CompiledRedirect {
    kind: RedirectKind,
    target: String,
    preserve_query: bool,
    permanent: bool,
}

impl CompiledRedirect {
    fn compile(rule: &RedirectRule) -> Option<Self> {
        if let Some(problem) = rule_problem(rule) {
            tracing::warn!(source = %rule.source_path, problem, "Redirect rule ignored");
            return None;
        }
        let source = strip_trailing_slash(&rule.source_path);
        let kind = match rule.redirect_type {
            RedirectType::OneToOne => RedirectKind::OneToOne {
                source: source.to_string(),
            },
            RedirectType::Pattern => RedirectKind::Pattern {
                prefix: source.strip_suffix('*')?.to_string(),
            },
            RedirectType::Mirror => RedirectKind::Mirror {
                prefix: source.to_string(),
            },
        };

        Some(Self {
            kind,
            target: rule.target_path.clone(),
            preserve_query: rule.preserve_query,
            permanent: rule.is_permanent(),
        })
    }

    fn target_for(&self, path: &str) -> Option<String> {
        match &self.kind {
            RedirectKind::OneToOne { source } => {
                (strip_trailing_slash(path) == source).then(|| self.target.clone())
            }
            RedirectKind::Pattern { prefix } => path
                .strip_prefix(prefix.as_str())
                .map(|suffix| self.target.replacen('*', suffix, 1)),
            RedirectKind::Mirror { prefix } => path
                .strip_prefix(prefix.as_str())
                .map(|suffix| format!("{}{}", self.target, suffix)),
        }
    }
}

/// Ordered redirect rules for one snapshot.
#[derive(Debug, Clone, Default)]
pub struct RedirectTable {
    rules: Vec<CompiledRedirect>,
}

impl RedirectTable {
    pub fn compile(rules: &[RedirectRule]) -> Self {
        Self {
            rules: rules.iter().filter_map(CompiledRedirect::compile).collect(),
        }
    }

    /// First redirect that applies to `path`, with the query appended when requested.
    pub fn find(&self, path: &str, query: Option<&str>) -> Option<Redirect> {
        self.rules.iter().find_map(|rule| {
            let mut location = rule.target_for(path)?;
            if rule.preserve_query {
                if let Some(query) = query.filter(|q| !q.is_empty()) {
                    append_query(&mut location, query);
                }
            }
            Some(Redirect {
                location,
                permanent: rule.permanent,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Why `rule` can never match, if it can't.
pub fn rule_problem(rule: &RedirectRule) -> Option<&'static str> {
    match rule.redirect_type {
        RedirectType::Pattern if !strip_trailing_slash(&rule.source_path).ends_with('*') => {
            Some("pattern source must end with `*`")
        }
        _ => None,
    }
}

fn strip_trailing_slash(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

/// Appends `query` with `?`, or `&` when the location already has a query.
pub fn append_query(location: &mut String, query: &str) {
    location.push(if location.contains('?') { '&' } else { '?' });
    location.push_str(query);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: RedirectType, source: &str, target: &str, preserve_query: bool) -> RedirectRule {
        RedirectRule {
            source_path: source.to_string(),
            target_path: target.to_string(),
            redirect_type: kind,
            preserve_query,
            permanent: None,
        }
    }

    #[test]
    fn test_one_to_one_preserve_query() {
        let table = RedirectTable::compile(&[rule(RedirectType::OneToOne, "/old", "/new", true)]);
        let redirect = table.find("/old", Some("x=1")).unwrap();
        assert_eq!(redirect.location, "/new?x=1");
        assert_eq!(redirect.status(), StatusCode::MOVED_PERMANENTLY);
    }

    #[test]
    fn test_one_to_one_drops_query() {
        let table = RedirectTable::compile(&[rule(RedirectType::OneToOne, "/old", "/new", false)]);
        let redirect = table.find("/old", Some("x=1")).unwrap();
        assert_eq!(redirect.location, "/new");
    }

    #[test]
    fn test_one_to_one_ignores_trailing_slash() {
        let table = RedirectTable::compile(&[rule(RedirectType::OneToOne, "/old/", "/new/", false)]);
        assert!(table.find("/old", None).is_some());
        assert!(table.find("/old/", None).is_some());
        assert!(table.find("/old/more", None).is_none());
    }

    #[test]
    fn test_query_appended_with_ampersand() {
        let table = RedirectTable::compile(&[rule(RedirectType::OneToOne, "/old", "/new?ref=a", true)]);
        let redirect = table.find("/old", Some("x=1")).unwrap();
        assert_eq!(redirect.location, "/new?ref=a&x=1");
    }

    #[test]
    fn test_pattern_redirect() {
        let table = RedirectTable::compile(&[rule(RedirectType::Pattern, "/old/*", "/new/*", false)]);
        let redirect = table.find("/old/abc", None).unwrap();
        assert_eq!(redirect.location, "/new/abc");
        assert!(table.find("/other/abc", None).is_none());
    }

    #[test]
    fn test_pattern_without_wildcard_never_matches() {
        let table = RedirectTable::compile(&[rule(RedirectType::Pattern, "/old", "/new", false)]);
        assert!(table.is_empty());
        assert!(table.find("/old", None).is_none());

        assert!(rule_problem(&rule(RedirectType::Pattern, "/old", "/new", false)).is_some());
        assert!(rule_problem(&rule(RedirectType::Pattern, "/old/*/", "/new/*", false)).is_none());
        assert!(rule_problem(&rule(RedirectType::OneToOne, "/old", "/new", false)).is_none());
    }

    #[test]
    fn test_mirror_redirect() {
        let table = RedirectTable::compile(&[rule(RedirectType::Mirror, "/blog/", "https://blog.example.com", true)]);
        let redirect = table.find("/blog/2024/post/", Some("utm=x")).unwrap();
        assert_eq!(redirect.location, "https://blog.example.com/2024/post/?utm=x");
    }

    #[test]
    fn test_temporary_redirect() {
        let mut temporary = rule(RedirectType::OneToOne, "/sale", "/pricing", false);
        temporary.permanent = Some(false);
        let table = RedirectTable::compile(&[temporary]);
        assert_eq!(table.find("/sale/", None).unwrap().status(), StatusCode::FOUND);
    }

    #[test]
    fn test_first_match_wins() {
        let table = RedirectTable::compile(&[
            rule(RedirectType::Mirror, "/a", "/first", false),
            rule(RedirectType::OneToOne, "/a/b", "/second", false),
        ]);
        assert_eq!(table.find("/a/b", None).unwrap().location, "/first/b");
    }
}
