//! Content security policy construction.

use url::Url;

use crate::snapshot::CspDomain;

/// Ordered, de-duplicated list of CSP sources.
#[derive(Debug, Clone, Default)]
struct SourceList(Vec<String>);

impl SourceList {
    fn with(sources: &[&str]) -> Self {
        let mut list = Self::default();
        for source in sources {
            list.add(source);
        }
        list
    }

    fn add(&mut self, source: &str) {
        if !self.0.iter().any(|s| s == source) {
            self.0.push(source.to_string());
        }
    }

    fn directive(&self, name: &str) -> String {
        format!("{} {}", name, self.0.join(" "))
    }
}

/// Builds the policy: a fixed baseline plus the origin of every allowed domain
/// in `script-src`, `connect-src` and `img-src`.
pub fn build_csp(domains: &[CspDomain]) -> String {
    let mut script = SourceList::with(&["'self'", "'unsafe-inline'", "'unsafe-eval'"]);
    let mut connect = SourceList::with(&["'self'"]);
    let mut img = SourceList::with(&["'self'", "data:", "blob:"]);
    let style = SourceList::with(&["'self'", "'unsafe-inline'"]);
    let font = SourceList::with(&["'self'", "data:"]);
    let frame = SourceList::with(&["'self'"]);

    for domain in domains {
        let origin = match Url::parse(&domain.url) {
            Ok(url) if url.has_host() => url.origin().ascii_serialization(),
            _ => {
                tracing::warn!(url = %domain.url, "Skipping invalid CSP domain");
                continue;
            }
        };
        script.add(&origin);
        connect.add(&origin);
        img.add(&origin);
    }

    [
        "default-src 'self'".to_string(),
        script.directive("script-src"),
        style.directive("style-src"),
        img.directive("img-src"),
        font.directive("font-src"),
        connect.directive("connect-src"),
        frame.directive("frame-src"),
        "object-src 'none'".to_string(),
        "base-uri 'self'".to_string(),
    ]
    .join("; ")
}
