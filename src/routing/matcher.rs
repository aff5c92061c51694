//! Route matching logic.
//!
//! # Responsibilities
//! - Compile `RouteRule`s into exact and prefix variants
//! - Resolve a request path to an application key
//! - Always produce an answer (catch-all application)
//!
//! # Design Decisions
//! - Exact rules form their own tier, checked before any prefix rule
//! - Prefix rules are ordered longest-first; equal lengths keep document order
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

use crate::snapshot::defaults::DEFAULT_CATCH_ALL_APP;
use crate::snapshot::RouteRule;

/// A compiled route rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledRoute {
    /// Matches only when the path equals `path`.
    Exact { path: String, app: String },
    /// Matches any path starting with `prefix`.
    Prefix { prefix: String, app: String },
}

impl CompiledRoute {
    fn from_rule(rule: &RouteRule) -> Self {
        if rule.exact {
            CompiledRoute::Exact {
                path: rule.path.clone(),
                app: rule.app.clone(),
            }
        } else {
            CompiledRoute::Prefix {
                prefix: rule.path.strip_suffix('*').unwrap_or(&rule.path).to_string(),
                app: rule.app.clone(),
            }
        }
    }

    /// Returns true if `path` is owned by this route.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            CompiledRoute::Exact { path: expected, .. } => path == expected,
            CompiledRoute::Prefix { prefix, .. } => path.starts_with(prefix.as_str()),
        }
    }

    pub fn app(&self) -> &str {
        match self {
            CompiledRoute::Exact { app, .. } | CompiledRoute::Prefix { app, .. } => app,
        }
    }
}

/// Ordered route table for one snapshot.
#[derive(Debug, Clone)]
pub struct RouteTable {
    /// Exact tier first, then prefixes by descending length.
    routes: Vec<CompiledRoute>,
    catch_all: String,
}

impl RouteTable {
    /// Compile and order a route document.
    pub fn compile(rules: &[RouteRule]) -> Self {
        let mut exact = Vec::new();
        let mut prefixes = Vec::new();

        for rule in rules {
            match CompiledRoute::from_rule(rule) {
                route @ CompiledRoute::Exact { .. } => exact.push(route),
                route @ CompiledRoute::Prefix { .. } => prefixes.push(route),
            }
        }

        // Stable sort: equal-length prefixes keep their document order.
        prefixes.sort_by_key(|route| match route {
            CompiledRoute::Prefix { prefix, .. } => std::cmp::Reverse(prefix.len()),
            CompiledRoute::Exact { .. } => std::cmp::Reverse(usize::MAX),
        });

        exact.extend(prefixes);

        Self {
            routes: exact,
            catch_all: catch_all_app(rules),
        }
    }

    /// Application owning `path`, or the catch-all application.
    pub fn find(&self, path: &str) -> &str {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(CompiledRoute::app)
            .unwrap_or(&self.catch_all)
    }

    pub fn catch_all(&self) -> &str {
        &self.catch_all
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRoute> {
        self.routes.iter()
    }
}

/// An explicitly flagged rule wins; otherwise the last root prefix rule.
fn catch_all_app(rules: &[RouteRule]) -> String {
    rules
        .iter()
        .find(|rule| rule.catch_all)
        .or_else(|| {
            rules
                .iter()
                .rev()
                .find(|rule| !rule.exact && (rule.path == "/" || rule.path == "/*"))
        })
        .map(|rule| rule.app.clone())
        .unwrap_or_else(|| DEFAULT_CATCH_ALL_APP.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(path: &str, app: &str, exact: bool) -> RouteRule {
        RouteRule::new(path, app, exact)
    }

    #[test]
    fn test_docs_scenario() {
        let table = RouteTable::compile(&[rule("/", "core", true), rule("/docs*", "docs", false)]);

        assert_eq!(table.find("/docs/guide"), "docs");
        assert_eq!(table.find("/docs"), "docs");
        assert_eq!(table.find("/"), "core");
        assert_eq!(table.find("/unknown"), DEFAULT_CATCH_ALL_APP);
    }

    #[test]
    fn test_empty_table_uses_catch_all() {
        let table = RouteTable::compile(&[]);
        assert!(table.is_empty());
        assert_eq!(table.find("/anything"), DEFAULT_CATCH_ALL_APP);
        assert_eq!(table.find("/"), DEFAULT_CATCH_ALL_APP);
    }

    #[test]
    fn test_exact_beats_prefix_with_identical_path() {
        // Prefix listed first and of identical length: exactness still wins.
        let table = RouteTable::compile(&[
            rule("/pricing", "marketing", false),
            rule("/pricing", "core", true),
        ]);

        assert_eq!(table.find("/pricing"), "core");
        assert_eq!(table.find("/pricing/enterprise"), "marketing");
    }

    #[test]
    fn test_exact_beats_longer_prefix() {
        let table = RouteTable::compile(&[
            rule("/a*", "short", false),
            rule("/a", "exact", true),
            rule("/a/b/c", "long", false),
        ]);
        assert_eq!(table.find("/a"), "exact");
        assert_eq!(table.find("/a/b/c/d"), "long");
        assert_eq!(table.find("/a/x"), "short");
    }

    #[test]
    fn test_longest_prefix_first() {
        let table = RouteTable::compile(&[
            rule("/", "root", false),
            rule("/docs", "docs", false),
            rule("/docs/api", "api", false),
        ]);

        assert_eq!(table.find("/docs/api/v1"), "api");
        assert_eq!(table.find("/docs/guide"), "docs");
        assert_eq!(table.find("/blog"), "root");
    }

    #[test]
    fn test_equal_length_prefixes_keep_document_order() {
        let table = RouteTable::compile(&[rule("/ab", "first", false), rule("/ab*", "second", false)]);
        assert_eq!(table.find("/abc"), "first");
    }

    #[test]
    fn test_catch_all_inference() {
        let table = RouteTable::compile(&[rule("/docs", "docs", false), rule("/*", "web", false)]);
        assert_eq!(table.catch_all(), "web");

        let mut flagged = rule("/x", "flagged", false);
        flagged.catch_all = true;
        let table = RouteTable::compile(&[rule("/", "root", false), flagged]);
        assert_eq!(table.catch_all(), "flagged");
    }
}
