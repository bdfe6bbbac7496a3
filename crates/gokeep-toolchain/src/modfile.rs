use anyhow::{anyhow, Context, Result};
use semver::Version;

use gokeep_core::parse_go_version;

/// The slice of a `go.mod` manifest this system cares about: the module
/// declaration, its deprecation notice, and retraction intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleManifest {
    pub module_path: String,
    pub deprecated: Option<String>,
    pub retractions: Vec<Retraction>,
}

/// An inclusive retraction interval. Single-version retractions are
/// stored as a degenerate interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retraction {
    pub low: Version,
    pub high: Version,
    pub rationale: Option<String>,
}

impl Retraction {
    pub fn contains(&self, version: &Version) -> bool {
        *version >= self.low && *version <= self.high
    }
}

impl ModuleManifest {
    /// Line-based parse of a `go.mod` file. Only `module` directives,
    /// `// Deprecated:` notices, and `retract` directives (single,
    /// range, and block form) are interpreted; everything else is
    /// skipped.
    pub fn parse(input: &str) -> Result<Self> {
        let mut manifest = Self::default();
        let mut pending_deprecation: Option<String> = None;
        let mut in_retract_block = false;

        for raw_line in input.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if in_retract_block {
                if line.starts_with(')') {
                    in_retract_block = false;
                    continue;
                }
                manifest.retractions.push(parse_retraction(line)?);
                continue;
            }

            if let Some(notice) = line.strip_prefix("// Deprecated:") {
                pending_deprecation = Some(notice.trim().to_string());
                continue;
            }
            if line.starts_with("//") {
                continue;
            }

            if let Some(rest) = line.strip_prefix("module ") {
                manifest.module_path = rest.trim().trim_matches('"').to_string();
                manifest.deprecated = pending_deprecation.take();
                continue;
            }

            if let Some(rest) = line.strip_prefix("retract ") {
                let rest = rest.trim();
                if rest == "(" {
                    in_retract_block = true;
                    continue;
                }
                manifest.retractions.push(parse_retraction(rest)?);
            }
        }

        if in_retract_block {
            return Err(anyhow!("unterminated retract block in go.mod"));
        }
        if manifest.module_path.is_empty() {
            return Err(anyhow!("go.mod is missing a module directive"));
        }
        Ok(manifest)
    }

    /// The rationale for retracting `version`, when any interval covers
    /// it. An empty rationale maps to a fixed marker so callers can
    /// still report the retraction.
    pub fn retraction_for(&self, version: &Version) -> Option<String> {
        self.retractions
            .iter()
            .find(|retraction| retraction.contains(version))
            .map(|retraction| {
                retraction
                    .rationale
                    .clone()
                    .unwrap_or_else(|| "retracted by module author".to_string())
            })
    }
}

fn parse_retraction(line: &str) -> Result<Retraction> {
    let (spec, rationale) = match line.split_once("//") {
        Some((spec, comment)) => (spec.trim(), Some(comment.trim().to_string())),
        None => (line.trim(), None),
    };
    let rationale = rationale.filter(|comment| !comment.is_empty());

    if let Some(range) = spec.strip_prefix('[') {
        let range = range
            .strip_suffix(']')
            .ok_or_else(|| anyhow!("unterminated retract range: {line}"))?;
        let (low, high) = range
            .split_once(',')
            .ok_or_else(|| anyhow!("retract range needs two versions: {line}"))?;
        let low = parse_go_version(low.trim())
            .with_context(|| format!("invalid retract range start: {line}"))?;
        let high = parse_go_version(high.trim())
            .with_context(|| format!("invalid retract range end: {line}"))?;
        return Ok(Retraction {
            low,
            high,
            rationale,
        });
    }

    let version =
        parse_go_version(spec).with_context(|| format!("invalid retract version: {line}"))?;
    Ok(Retraction {
        low: version.clone(),
        high: version,
        rationale,
    })
}
