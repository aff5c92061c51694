use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::path::{Path, PathBuf};

use edge_router::store::validate::{validate_directory, DocumentStatus, DEFAULT_ENVIRONMENTS};

#[derive(Parser)]
#[command(name = "edge-cli")]
#[command(about = "Management CLI for the edge router", long_about = None)]
struct Cli {
    #[arg(short, long, env = "EDGE_ADMIN_URL", default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key; not needed for `validate`.
    #[arg(short, long, env = "EDGE_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Router status and live config version
    Status,
    /// Summary of the live config snapshot
    Config,
    /// Re-fetch the config snapshot now
    Refresh,
    /// Show the routing decision for a request without forwarding it
    Resolve {
        path: String,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        query: Option<String>,
    },
    /// Drop all cached preview origins
    PurgePreviews,
    /// Check a document directory offline, before publishing it
    Validate {
        directory: PathBuf,
        /// Only this environment instead of production, beta and preview
        #[arg(long)]
        environment: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Config => client.get(format!("{}/admin/config", base)),
        Commands::Refresh => client.post(format!("{}/admin/refresh", base)),
        Commands::Resolve { path, host, query } => {
            let mut params = vec![("path", path)];
            if let Some(host) = host {
                params.push(("host", host));
            }
            if let Some(query) = query {
                params.push(("query", query));
            }
            client.get(format!("{}/admin/resolve", base)).query(&params)
        }
        Commands::PurgePreviews => client.delete(format!("{}/admin/preview-cache", base)),
        Commands::Validate { directory, environment } => {
            return validate(&directory, environment.as_deref());
        }
    };

    let key = cli.key.as_deref().ok_or("admin key required (--key or EDGE_ADMIN_KEY)")?;
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", key))?,
    );

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn validate(directory: &Path, environment: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let environments = match environment {
        Some(environment) => vec![environment],
        None => DEFAULT_ENVIRONMENTS.to_vec(),
    };
    let report = validate_directory(directory, &environments);

    for environment in &report.skipped {
        println!("Skipping {}/www (directory not found)", environment);
    }
    let mut current = None;
    for document in &report.documents {
        if current != Some(document.environment.as_str()) {
            current = Some(document.environment.as_str());
            println!("\nValidating {}/www:", document.environment);
        }
        let name = document.document.name();
        match &document.status {
            DocumentStatus::Valid => println!("  - {}.json: OK", name),
            DocumentStatus::Missing => println!("  - {}.json: SKIPPED (file not found)", name),
            DocumentStatus::Invalid(problems) => {
                println!("  - {}.json: FAILED", name);
                for problem in problems {
                    println!("      {}", problem);
                }
            }
        }
    }

    if report.is_valid() {
        println!("\nValidation PASSED");
        Ok(())
    } else {
        println!("\nValidation FAILED");
        std::process::exit(1);
    }
}
