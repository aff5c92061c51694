//! Path-based `Cache-Control` selection.

use crate::snapshot::CacheRules;

/// A compiled cache rule pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePattern {
    /// `*` matches any run of characters; anchored at both ends.
    Glob(Vec<String>),
    /// Non-wildcard patterns match as a path suffix.
    Suffix(String),
}

impl CachePattern {
    pub fn compile(pattern: &str) -> Self {
        if pattern.contains('*') {
            CachePattern::Glob(pattern.split('*').map(str::to_string).collect())
        } else {
            CachePattern::Suffix(pattern.to_string())
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            CachePattern::Suffix(suffix) => path.ends_with(suffix.as_str()),
            CachePattern::Glob(parts) => glob_matches(parts, path),
        }
    }
}

/// `parts` is the pattern split on `*`, so it always has at least two entries.
fn glob_matches(parts: &[String], path: &str) -> bool {
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return path.is_empty(),
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return path == first,
    };

    let Some(mut remaining) = path.strip_prefix(first.as_str()) else {
        return false;
    };
    if remaining.len() < last.len() {
        return false;
    }
    let tail_start = remaining.len() - last.len();
    if !remaining.is_char_boundary(tail_start) || &remaining[tail_start..] != last.as_str() {
        return false;
    }
    remaining = &remaining[..tail_start];

    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    true
}

/// Ordered cache rules for one snapshot. First match wins.
#[derive(Debug, Clone)]
pub struct CacheControlRules {
    rules: Vec<(CachePattern, String)>,
    default_directive: String,
}

impl CacheControlRules {
    pub fn compile(rules: &CacheRules) -> Self {
        Self {
            rules: rules
                .rules
                .iter()
                .map(|rule| (CachePattern::compile(&rule.pattern), rule.cache_control.clone()))
                .collect(),
            default_directive: rules.default_directive.clone(),
        }
    }

    pub fn directive_for(&self, path: &str) -> &str {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, directive)| directive.as_str())
            .unwrap_or(&self.default_directive)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_patterns() {
        let pattern = CachePattern::compile("/_mk-www-*/*");
        assert!(pattern.matches("/_mk-www-core/chunk.js"));
        assert!(pattern.matches("/_mk-www-/"));
        assert!(!pattern.matches("/_mk-www-core"));
        assert!(!pattern.matches("/static/_mk-www-core/x"));

        let pattern = CachePattern::compile("*.xml");
        assert!(pattern.matches("/sitemap.xml"));
        assert!(!pattern.matches("/sitemap.xml.gz"));

        let pattern = CachePattern::compile("/a/*/b/*/c");
        assert!(pattern.matches("/a/x/b/y/c"));
        assert!(!pattern.matches("/a/x/c"));
    }

    #[test]
    fn test_suffix_patterns() {
        let pattern = CachePattern::compile("robots.txt");
        assert!(pattern.matches("/robots.txt"));
        assert!(!pattern.matches("/robots.txt/"));
    }

    #[test]
    fn test_default_rules() {
        let rules = CacheControlRules::compile(&CacheRules::default());
        assert_eq!(rules.directive_for("/_next/static/app.js"), "public, max-age=31536000, immutable");
        assert_eq!(rules.directive_for("/feed.xml"), "no-cache, no-store, must-revalidate");
        assert_eq!(rules.directive_for("/pricing/"), "public, max-age=0, must-revalidate");
    }

    #[test]
    fn test_first_rule_wins() {
        let rules = CacheControlRules::compile(&CacheRules {
            rules: vec![
                crate::snapshot::CacheRule {
                    pattern: "/static/*".into(),
                    cache_control: "first".into(),
                },
                crate::snapshot::CacheRule {
                    pattern: "*.css".into(),
                    cache_control: "second".into(),
                },
            ],
            default_directive: "fallback".into(),
        });
        assert_eq!(rules.directive_for("/static/site.css"), "first");
        assert_eq!(rules.directive_for("/site.css"), "second");
        assert_eq!(rules.directive_for("/page/"), "fallback");
    }
}
