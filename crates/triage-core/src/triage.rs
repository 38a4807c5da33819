//! Scan-result interpretation: filtering unreliable engines, deriving
//! a risk verdict, and rendering the technical report.
//!
//! All three operations are pure functions over a [`ScanResultSet`];
//! the only configuration is the set of excluded engine names. The
//! verdict and the report read the same (possibly filtered) set but do
//! not depend on each other.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::markdown;

/// Engines known to report a large number of false positives; their
/// verdicts are dropped by the default [`ExcludedEngines`] set.
const DEFAULT_EXCLUDED: &[&str] = &["K7GW", "TrendMicro-HouseCall"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriageError {
    /// A per-engine report lacks the `detected` flag. Surfaced instead
    /// of defaulting to "not detected", which could mask a malicious
    /// verdict.
    #[error("scan result for engine {engine:?} is missing the `detected` field")]
    MissingDetectionField { engine: String },
}

/// One detection engine's report within a scan.
///
/// `detected` is required by the triage contract but optional at the
/// deserialization boundary; [`classify`] and [`render`] reject
/// entries where it is absent. All other provider fields ride along
/// untouched and are never inspected.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanResult {
    pub detected: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ScanResult {
    pub fn new(detected: bool) -> Self {
        Self {
            detected: Some(detected),
            extra: serde_json::Map::new(),
        }
    }
}

/// Per-engine results keyed by engine name.
///
/// A `BTreeMap` keeps report rows in a stable alphabetical order no
/// matter how the provider ordered them.
pub type ScanResultSet = BTreeMap<String, ScanResult>;

/// Binary severity classification of a scanned artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskVerdict {
    High,
    Secure,
}

impl fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskVerdict::High => f.write_str("HIGH"),
            RiskVerdict::Secure => f.write_str("SECURE"),
        }
    }
}

/// Engine names whose results are removed before triage.
///
/// Immutable once built; pass alternate sets in tests instead of
/// patching a global.
#[derive(Debug, Clone)]
pub struct ExcludedEngines(BTreeSet<String>);

impl Default for ExcludedEngines {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED.iter().copied())
    }
}

impl ExcludedEngines {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// An empty set, for callers that want every engine kept.
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, engine: &str) -> bool {
        self.0.contains(engine)
    }
}

/// Drop results from excluded engines.
///
/// Entries whose engine name is not excluded pass through unchanged.
/// Idempotent; an excluded engine missing from `scans` is not an
/// error.
pub fn exclude_unreliable(mut scans: ScanResultSet, excluded: &ExcludedEngines) -> ScanResultSet {
    scans.retain(|engine, _| !excluded.contains(engine));
    scans
}

/// Classify a scan as [`RiskVerdict::High`] when any engine flagged
/// the artifact, [`RiskVerdict::Secure`] otherwise (including the
/// empty set).
pub fn classify(scans: &ScanResultSet) -> Result<RiskVerdict, TriageError> {
    let mut detected_any = false;
    for (engine, result) in scans {
        match result.detected {
            Some(true) => detected_any = true,
            Some(false) => {}
            None => {
                return Err(TriageError::MissingDetectionField {
                    engine: engine.clone(),
                })
            }
        }
    }
    if detected_any {
        Ok(RiskVerdict::High)
    } else {
        Ok(RiskVerdict::Secure)
    }
}

/// Render the technical report for a scan.
///
/// The body is a markdown table with one `Malicious`/`Safe` row per
/// engine. A non-empty `target` adds a leading header line; a
/// non-empty `report_link` adds a trailing link sentence. The input
/// set is not filtered here; callers apply [`exclude_unreliable`]
/// first when exclusion is wanted.
pub fn render(
    scans: &ScanResultSet,
    target: Option<&str>,
    report_link: Option<&str>,
) -> Result<String, TriageError> {
    let mut rows = Vec::with_capacity(scans.len());
    for (engine, result) in scans {
        let label = match result.detected {
            Some(true) => "Malicious",
            Some(false) => "Safe",
            None => {
                return Err(TriageError::MissingDetectionField {
                    engine: engine.clone(),
                })
            }
        };
        rows.push(vec![engine.clone(), label.to_string()]);
    }

    let mut detail = String::new();
    if let Some(target) = target.filter(|t| !t.is_empty()) {
        detail.push_str(&format!("Analysis of the target `{target}`:\n"));
    }
    detail.push_str(&markdown::table(&["Antivirus", "Result"], &rows));
    if let Some(link) = report_link.filter(|l| !l.is_empty()) {
        detail.push_str(&format!(
            "\nFor more details, visit the [scan report]({link})."
        ));
    }
    Ok(detail)
}
