//! VirusTotal triage CLI — looks up files (by content hash) or a URL
//! on VirusTotal and prints a risk rating with a technical report.
//!
//! Usage:
//!   vt-triage suspicious.exe
//!   vt-triage dropper.bin payload.dll --format json
//!   vt-triage --url http://example.com/download --include-unreliable

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use triage_core::triage::{self, ExcludedEngines};
use triage_core::virustotal::{self, VirusTotalClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}. Use 'text' or 'json'.")),
        }
    }
}

#[derive(Parser)]
#[command(name = "vt-triage")]
#[command(about = "VirusTotal scan report triage")]
struct Cli {
    /// Files to look up (hashed locally, never uploaded)
    paths: Vec<PathBuf>,

    /// URL to look up instead of (or alongside) files
    #[arg(long)]
    url: Option<String>,

    /// Keep results from engines with known high false-positive rates
    #[arg(long)]
    include_unreliable: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.paths.is_empty() && cli.url.is_none() {
        error!("nothing to scan: pass file paths or --url");
        return ExitCode::FAILURE;
    }

    let mut client = match VirusTotalClient::from_env() {
        Ok(client) => client,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let excluded = if cli.include_unreliable {
        ExcludedEngines::none()
    } else {
        ExcludedEngines::default()
    };

    let mut failed = false;
    for path in &cli.paths {
        if let Err(err) = triage_file(&mut client, path, &excluded, cli.format) {
            error!("{}: {err:#}", path.display());
            failed = true;
        }
    }
    if let Some(url) = &cli.url {
        if let Err(err) = triage_url(&mut client, url, &excluded, cli.format) {
            error!("{url}: {err:#}");
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn triage_file(
    client: &mut VirusTotalClient,
    path: &Path,
    excluded: &ExcludedEngines,
    format: OutputFormat,
) -> Result<()> {
    let hash = virustotal::sha256_file(path)?;
    info!("looking up {} ({hash})", path.display());
    let response = client.file_report(&hash)?;
    report_target(&response, &path.display().to_string(), excluded, format)
}

fn triage_url(
    client: &mut VirusTotalClient,
    url: &str,
    excluded: &ExcludedEngines,
    format: OutputFormat,
) -> Result<()> {
    info!("looking up {url}");
    let response = client.url_report(url)?;
    report_target(&response, url, excluded, format)
}

fn report_target(
    response: &serde_json::Value,
    target: &str,
    excluded: &ExcludedEngines,
    format: OutputFormat,
) -> Result<()> {
    let Some(report) = virustotal::extract_scans(response)? else {
        warn!("{target}: no report available yet");
        return Ok(());
    };

    let scans = triage::exclude_unreliable(report.scans, excluded);
    let verdict = triage::classify(&scans)?;
    let detail = triage::render(&scans, Some(target), report.permalink.as_deref())?;

    match format {
        OutputFormat::Text => {
            println!("Risk rating: {verdict}");
            println!("{detail}");
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "target": target,
                "risk_rating": verdict,
                "technical_detail": detail,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
