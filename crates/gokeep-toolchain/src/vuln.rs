use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use serde::Deserialize;

use gokeep_core::Vulnerability;

/// One value from the `govulncheck -json` stream. The scanner emits a
/// concatenated sequence of single-key objects.
#[derive(Debug, Deserialize)]
struct StreamEntry {
    #[serde(default)]
    osv: Option<OsvEntry>,
    #[serde(default)]
    finding: Option<Finding>,
}

#[derive(Debug, Deserialize)]
struct OsvEntry {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    details: String,
}

#[derive(Debug, Deserialize)]
struct Finding {
    osv: String,
    #[serde(default)]
    trace: Vec<TraceFrame>,
}

#[derive(Debug, Deserialize)]
struct TraceFrame {
    #[serde(default)]
    function: Option<String>,
}

/// Collect the vulnerabilities that actually affect the scanned binary:
/// findings whose trace reaches a vulnerable function. OSV entries
/// without such a finding are informational and dropped.
pub fn parse_vulncheck_output(output: &str) -> Result<Vec<Vulnerability>> {
    let mut summaries: BTreeMap<String, String> = BTreeMap::new();
    let mut affected: BTreeSet<String> = BTreeSet::new();

    for entry in serde_json::Deserializer::from_str(output).into_iter::<StreamEntry>() {
        let entry = entry.context("failed to parse vulnerability scanner output")?;
        if let Some(osv) = entry.osv {
            let text = if osv.summary.is_empty() {
                osv.details
            } else {
                osv.summary
            };
            summaries.insert(osv.id, text);
        }
        if let Some(finding) = entry.finding {
            let reaches_symbol = finding
                .trace
                .iter()
                .any(|frame| frame.function.as_deref().is_some_and(|f| !f.is_empty()));
            if reaches_symbol {
                affected.insert(finding.osv);
            }
        }
    }

    Ok(affected
        .into_iter()
        .map(|id| Vulnerability {
            url: format!("https://pkg.go.dev/vuln/{id}"),
            details: summaries.get(&id).cloned().unwrap_or_default(),
            id,
        })
        .collect())
}
