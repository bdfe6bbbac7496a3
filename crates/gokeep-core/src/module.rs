use std::fmt;

use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

/// A module version as the Go toolchain reports it: either the `latest`
/// query sentinel or a concrete `v`-prefixed semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleVersion {
    Latest,
    Semantic(Version),
}

impl ModuleVersion {
    pub fn parse(input: &str) -> Result<Self> {
        if input == "latest" {
            return Ok(Self::Latest);
        }
        Ok(Self::Semantic(parse_go_version(input)?))
    }

    pub fn as_semantic(&self) -> Option<&Version> {
        match self {
            Self::Latest => None,
            Self::Semantic(version) => Some(version),
        }
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Semantic(version) => write!(f, "v{version}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub path: String,
    pub version: ModuleVersion,
}

impl Module {
    pub fn new(path: impl Into<String>, version: ModuleVersion) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    pub fn latest(path: impl Into<String>) -> Self {
        Self::new(path, ModuleVersion::Latest)
    }

    /// Major line of this module as declared by its path suffix: `/vN`
    /// means N, no suffix means the v0/v1 line.
    pub fn path_major(&self) -> u64 {
        strip_major_suffix(&self.path).1
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}

/// Parse a Go-style version string (`v1.2.3`, `v0.0.0-2024...-abcdef`).
pub fn parse_go_version(input: &str) -> Result<Version> {
    let trimmed = input
        .strip_prefix('v')
        .ok_or_else(|| anyhow!("version must start with 'v': {input}"))?;
    Version::parse(trimmed).with_context(|| format!("invalid semantic version: {input}"))
}

pub fn render_go_version(version: &Version) -> String {
    format!("v{version}")
}

/// Split a module path into its base and its major line. `/vN` suffixes
/// only exist for N >= 2; a trailing path segment that merely looks like
/// `v1` or `v0` is part of the base, per the ecosystem convention.
pub fn strip_major_suffix(path: &str) -> (&str, u64) {
    let Some((base, last)) = path.rsplit_once('/') else {
        return (path, 1);
    };
    let Some(digits) = last.strip_prefix('v') else {
        return (path, 1);
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return (path, 1);
    }
    match digits.parse::<u64>() {
        Ok(major) if major >= 2 => (base, major),
        _ => (path, 1),
    }
}

/// The module path of the base module's `major` line.
pub fn module_path_for_major(path: &str, major: u64) -> String {
    let (base, _) = strip_major_suffix(path);
    if major <= 1 {
        base.to_string()
    } else {
        format!("{base}/v{major}")
    }
}

pub fn module_base_path(path: &str) -> &str {
    strip_major_suffix(path).0
}

/// The next major line to probe during major-version resolution.
pub fn next_major(current: u64) -> u64 {
    if current <= 1 {
        2
    } else {
        current + 1
    }
}

/// Pseudo-versions are commit-derived: the prerelease ends with a
/// 14-digit UTC timestamp and a 12-character hex revision, e.g.
/// `v0.0.0-20240101120000-abcdef123456`.
pub fn is_pseudo_version(version: &str) -> bool {
    let Ok(parsed) = parse_go_version(version) else {
        return false;
    };
    let pre = parsed.pre.as_str();
    if pre.is_empty() {
        return false;
    }
    let mut parts = pre.rsplit('.');
    let Some(tail) = parts.next() else {
        return false;
    };
    let Some((timestamp, revision)) = tail.rsplit_once('-') else {
        return false;
    };
    // The timestamp segment may itself follow a pre-release tag, e.g.
    // v1.2.3-pre.0.20240101120000-abcdef123456.
    let timestamp = timestamp.rsplit('-').next().unwrap_or(timestamp);
    timestamp.len() == 14
        && timestamp.bytes().all(|b| b.is_ascii_digit())
        && revision.len() == 12
        && revision.bytes().all(|b| b.is_ascii_hexdigit())
}
