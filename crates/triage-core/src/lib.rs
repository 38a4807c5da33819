//! triage-core — shared library for VirusTotal scan triage.
//!
//! Provides the scan-result interpretation core (exclusion of
//! unreliable engines, risk classification, technical-report
//! rendering) and the VirusTotal API client used by the CLI frontend.

pub mod markdown;
pub mod triage;
pub mod virustotal;
