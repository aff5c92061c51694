//! Offline checks for a published document directory.
//!
//! Walks `{root}/{env}/www/*.json` for each environment and reports, per
//! document, whether it parses and makes sense. Used by `edge-cli validate`
//! before documents are uploaded; nothing here touches the running router.
//!
//! A missing environment directory or document is skipped, not an error,
//! since optional documents fall back to built-ins at runtime.

use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;

use crate::routing::redirect::rule_problem;
use crate::snapshot::schema::OriginsDocument;
use crate::snapshot::{CacheRules, CorsPolicy, CspDomain, RedirectRule, RouteRule};
use crate::store::documents::{document_path, Document};

/// Environments checked when none is named.
pub const DEFAULT_ENVIRONMENTS: [&str; 3] = ["production", "beta", "preview"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Valid,
    Missing,
    /// Every problem found, not just the first.
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub environment: String,
    pub document: Document,
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Environments whose directory does not exist.
    pub skipped: Vec<String>,
    pub documents: Vec<DocumentReport>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents
            .iter()
            .filter(|report| matches!(report.status, DocumentStatus::Invalid(_)))
    }
}

/// Check the unversioned documents of each environment under `root`.
pub fn validate_directory(root: &Path, environments: &[&str]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for &environment in environments {
        if !root.join(environment).join("www").is_dir() {
            report.skipped.push(environment.to_string());
            continue;
        }

        for document in Document::ALL {
            let path = root.join(document_path(environment, None, document));
            let status = match std::fs::read(&path) {
                Ok(bytes) => match validate_document(document, &bytes) {
                    Ok(()) => DocumentStatus::Valid,
                    Err(problems) => DocumentStatus::Invalid(problems),
                },
                Err(e) if e.kind() == ErrorKind::NotFound => DocumentStatus::Missing,
                Err(e) => DocumentStatus::Invalid(vec![format!("read failed: {}", e)]),
            };
            report.documents.push(DocumentReport {
                environment: environment.to_string(),
                document,
                status,
            });
        }
    }

    report
}

/// Parse `bytes` as `document` and collect every semantic problem.
pub fn validate_document(document: Document, bytes: &[u8]) -> Result<(), Vec<String>> {
    let problems = match document {
        Document::Routes => route_problems(&parse::<Vec<RouteRule>>(bytes)?),
        Document::Redirects => redirect_problems(&parse::<Vec<RedirectRule>>(bytes)?),
        Document::Origins => origin_problems(&parse::<OriginsDocument>(bytes)?),
        Document::CspDomains => csp_problems(&parse::<Vec<CspDomain>>(bytes)?),
        Document::CorsConfig => {
            parse::<CorsPolicy>(bytes)?;
            Vec::new()
        }
        Document::CacheRules => cache_problems(&parse::<CacheRules>(bytes)?),
    };

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Vec<String>> {
    serde_json::from_slice(bytes).map_err(|e| vec![e.to_string()])
}

fn route_problems(routes: &[RouteRule]) -> Vec<String> {
    let mut problems = Vec::new();
    for (i, route) in routes.iter().enumerate() {
        if !route.path.starts_with('/') {
            problems.push(format!("[{}].path: must start with /", i));
        }
        if route.app.trim().is_empty() {
            problems.push(format!("[{}].app: must not be empty", i));
        }
    }
    problems
}

fn redirect_problems(rules: &[RedirectRule]) -> Vec<String> {
    let mut problems = Vec::new();
    for (i, rule) in rules.iter().enumerate() {
        if !rule.source_path.starts_with('/') {
            problems.push(format!("[{}].sourcePath: must start with /", i));
        }
        if rule.target_path.is_empty() {
            problems.push(format!("[{}].targetPath: must not be empty", i));
        }
        if let Some(problem) = rule_problem(rule) {
            problems.push(format!("[{}].sourcePath: {}", i, problem));
        }
    }
    problems
}

fn origin_problems(document: &OriginsDocument) -> Vec<String> {
    let mut apps: Vec<_> = document.origins.iter().collect();
    apps.sort_by(|a, b| a.0.cmp(b.0));

    apps.into_iter()
        .filter(|(_, origin)| origin.domain_name.trim().is_empty())
        .map(|(app, _)| format!("origins.{}.domainName: must not be empty", app))
        .collect()
}

fn csp_problems(domains: &[CspDomain]) -> Vec<String> {
    domains
        .iter()
        .enumerate()
        .filter(|(_, domain)| domain.url.trim().is_empty())
        .map(|(i, _)| format!("[{}].url: must not be empty", i))
        .collect()
}

fn cache_problems(rules: &CacheRules) -> Vec<String> {
    let mut problems = Vec::new();
    for (i, rule) in rules.rules.iter().enumerate() {
        if rule.pattern.is_empty() {
            problems.push(format!("rules[{}].pattern: must not be empty", i));
        }
        if rule.cache_control.trim().is_empty() {
            problems.push(format!("rules[{}].cacheControl: must not be empty", i));
        }
    }
    problems
}
