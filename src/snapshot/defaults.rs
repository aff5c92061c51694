//! Built-in configuration used when the config backend is unreachable.

use crate::snapshot::schema::{CacheRule, CacheRules, CorsPolicy, CspDomain, RouteRule};

/// Application served when no route matches and the table names no catch-all.
pub const DEFAULT_CATCH_ALL_APP: &str = "kitchen-sink";

/// Version label of the built-in snapshot.
pub const DEFAULT_VERSION: &str = "default";

/// Root and major application paths, ending with the catch-all.
pub fn default_routes() -> Vec<RouteRule> {
    let mut routes = vec![RouteRule::new("/", "core", true)];
    routes.extend(
        [
            ("/home", "core"),
            ("/pricing", "core"),
            ("/downloads", "core"),
            ("/enterprise", "core"),
            ("/_mk-www-core/", "core"),
            ("/lp", "lp"),
            ("/_mk-www-lp/", "lp"),
            ("/platform", "platform"),
            ("/_mk-www-platform/", "platform"),
            ("/templates", "templates"),
            ("/_mk-www-templates/", "templates"),
            ("/release-notes", "release-notes"),
            ("/_mk-www-release-notes/", "release-notes"),
            ("/_mk-www-kitchen-sink/", "kitchen-sink"),
        ]
        .into_iter()
        .map(|(path, app)| RouteRule::new(path, app, false)),
    );

    let mut catch_all = RouteRule::new("/", DEFAULT_CATCH_ALL_APP, false);
    catch_all.catch_all = true;
    routes.push(catch_all);
    routes
}

pub fn default_csp_domains() -> Vec<CspDomain> {
    [
        ("https://www.googletagmanager.com", "GTM"),
        ("https://www.google-analytics.com", "GoogleAnalytics"),
        ("https://cdn.amplitude.com", "Amplitude"),
    ]
    .into_iter()
    .map(|(url, service)| CspDomain {
        url: url.to_string(),
        service: Some(service.to_string()),
    })
    .collect()
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "HEAD".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["*".to_string()],
            expose_headers: Vec::new(),
            max_age: Some(86_400),
        }
    }
}

const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const REVALIDATE: &str = "public, max-age=0, must-revalidate";

impl Default for CacheRules {
    fn default() -> Self {
        let rules = [
            ("*.xml", "no-cache, no-store, must-revalidate"),
            ("*.html", REVALIDATE),
            ("/_next/static/*", IMMUTABLE),
            ("/_mk-www-*/*", IMMUTABLE),
            ("/static/*", IMMUTABLE),
        ]
        .into_iter()
        .map(|(pattern, cache_control)| CacheRule {
            pattern: pattern.to_string(),
            cache_control: cache_control.to_string(),
        })
        .collect();

        Self {
            rules,
            default_directive: REVALIDATE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes_end_with_catch_all() {
        let routes = default_routes();
        let last = routes.last().unwrap();
        assert_eq!(last.app, DEFAULT_CATCH_ALL_APP);
        assert!(last.catch_all);
        assert!(routes[0].exact);
    }
}
