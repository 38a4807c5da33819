//! VirusTotal public API (v2) client for fetching scan reports.
//!
//! File reports are looked up by content hash, URL reports by the URL
//! itself; nothing is ever uploaded. The API key is read from the
//! `VIRUSTOTAL_API_KEY` environment variable. Built-in rate limiting
//! keeps requests under the free-tier 4 req/min limit.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::triage::ScanResultSet;

const VT_API_BASE: &str = "https://www.virustotal.com/vtapi/v2";

/// Minimum interval between API calls (15.5 seconds = ~3.87 req/min, safely under 4/min).
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(15_500);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scan data extracted from a successful report response.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub scans: ScanResultSet,
    pub permalink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    response_code: Option<i64>,
    #[serde(default)]
    scans: ScanResultSet,
    permalink: Option<String>,
}

#[derive(Debug)]
pub struct VirusTotalClient {
    api_key: String,
    client: reqwest::blocking::Client,
    last_request: Option<Instant>,
}

impl VirusTotalClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            bail!("VirusTotal API key is empty");
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api_key,
            client,
            last_request: None,
        })
    }

    /// Create a client from the `VIRUSTOTAL_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("VIRUSTOTAL_API_KEY")
            .context("VIRUSTOTAL_API_KEY environment variable not set")?;
        Self::new(api_key)
    }

    /// Enforce rate limiting by sleeping if needed.
    fn rate_limit(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < RATE_LIMIT_INTERVAL {
                std::thread::sleep(RATE_LIMIT_INTERVAL - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }

    /// Fetch the raw scan report for a file hash (MD5, SHA-1, or SHA-256).
    pub fn file_report(&mut self, resource: &str) -> Result<serde_json::Value> {
        self.get_report("file/report", resource)
    }

    /// Fetch the raw scan report for a URL.
    pub fn url_report(&mut self, url: &str) -> Result<serde_json::Value> {
        self.get_report("url/report", url)
    }

    fn get_report(&mut self, endpoint: &str, resource: &str) -> Result<serde_json::Value> {
        self.rate_limit();

        let url = format!("{VT_API_BASE}/{endpoint}");
        let resp = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("resource", resource)])
            .send()
            .context("VirusTotal API request failed")?;

        let status = resp.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            bail!("VirusTotal API rate limit exceeded (HTTP 204)");
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            bail!("VirusTotal API error (HTTP {status}): {body}");
        }

        resp.json().context("Failed to parse VirusTotal response")
    }
}

/// Extract the per-engine scans from a raw report response.
///
/// Returns `Ok(None)` when the provider has no report for the resource
/// (`response_code != 1`); the triage core must not be invoked in that
/// case. Responses that are not a report object at all are an error.
pub fn extract_scans(response: &serde_json::Value) -> Result<Option<ScanReport>> {
    let report: RawReport = serde_json::from_value(response.clone())
        .context("Unexpected VirusTotal response shape")?;
    if report.response_code != Some(1) {
        return Ok(None);
    }
    Ok(Some(ScanReport {
        scans: report.scans,
        permalink: report.permalink,
    }))
}

/// Compute the SHA-256 hash of a file, for report lookup by content.
pub fn sha256_file(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};

    let data = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let hash = Sha256::digest(&data);
    Ok(format!("{:x}", hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sha256_file_known_content() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();
        tmp.flush().unwrap();

        let hash = sha256_file(tmp.path()).unwrap();
        // SHA-256 of "hello world"
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn sha256_file_not_found() {
        let result = sha256_file(Path::new("/nonexistent/file"));
        assert!(result.is_err());
    }

    #[test]
    fn extract_scans_from_report() {
        let json = serde_json::json!({
            "response_code": 1,
            "resource": "abc123",
            "permalink": "https://www.virustotal.com/gui/file/abc123",
            "scans": {
                "EngineA": {"detected": false, "version": "1.0"},
                "EngineB": {"detected": true, "result": "Trojan.GenericKD"}
            }
        });

        let report = extract_scans(&json).unwrap().expect("report present");
        assert_eq!(report.scans.len(), 2);
        assert_eq!(report.scans["EngineA"].detected, Some(false));
        assert_eq!(report.scans["EngineB"].detected, Some(true));
        assert_eq!(
            report.permalink.as_deref(),
            Some("https://www.virustotal.com/gui/file/abc123")
        );
    }

    #[test]
    fn extract_scans_no_report_available() {
        let json = serde_json::json!({
            "response_code": 0,
            "verbose_msg": "The requested resource is not among the finished, queued or pending scans"
        });
        assert!(extract_scans(&json).unwrap().is_none());
    }

    #[test]
    fn extract_scans_missing_response_code() {
        let json = serde_json::json!({"scans": {}});
        assert!(extract_scans(&json).unwrap().is_none());
    }

    #[test]
    fn extract_scans_report_without_scans_field() {
        // response_code 1 but no scans map: valid report, zero engines
        let json = serde_json::json!({"response_code": 1});
        let report = extract_scans(&json).unwrap().expect("report present");
        assert!(report.scans.is_empty());
        assert!(report.permalink.is_none());
    }

    #[test]
    fn extract_scans_rejects_non_object_response() {
        let json = serde_json::json!("not a report");
        assert!(extract_scans(&json).is_err());
    }

    #[test]
    fn client_rejects_empty_api_key() {
        let result = VirusTotalClient::new("");
        assert!(result.is_err());
        assert!(
            format!("{}", result.unwrap_err()).contains("empty"),
            "Error should mention empty key"
        );
    }
}
