use anyhow::Result;
use semver::Version;

use crate::error::Error;
use crate::module::parse_go_version;

/// A user-facing binary request: a name plus an optional version
/// constraint (`rg`, `rg@v14`, `rg@v14.1`, `rg@v14.1.0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub name: String,
    pub constraint: Option<VersionConstraint>,
}

impl Binary {
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, constraint) = match spec.split_once('@') {
            Some((name, raw)) => (name, Some(VersionConstraint::parse(raw)?)),
            None => (spec, None),
        };
        if name.is_empty() {
            return Err(Error::InvalidVersion(spec.to_string()).into());
        }
        Ok(Self {
            name: name.to_string(),
            constraint,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        match &self.constraint {
            None => true,
            Some(constraint) => constraint.matches(version),
        }
    }
}

/// A bare major (`vN`), a major.minor (`vN.M`), or a full version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    Exact(Version),
    Major(u64),
    MajorMinor(u64, u64),
}

impl VersionConstraint {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersion(input.to_string());
        let digits = input.strip_prefix('v').ok_or_else(invalid)?;
        if digits.is_empty() {
            return Err(invalid().into());
        }

        let parts: Vec<&str> = digits.split('.').collect();
        let numeric = |part: &str| -> Result<u64> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid().into());
            }
            part.parse().map_err(|_| invalid().into())
        };

        match parts.as_slice() {
            [major] => Ok(Self::Major(numeric(major)?)),
            [major, minor] => Ok(Self::MajorMinor(numeric(major)?, numeric(minor)?)),
            _ => Ok(Self::Exact(parse_go_version(input).map_err(|_| invalid())?)),
        }
    }

    /// Interval test: `vN` matches `[vN.0.0, v(N+1).0.0)`; `vN.M`
    /// matches `[vN.M.0, vN.(M+1).0)`; a full version matches exactly.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(exact) => version == exact,
            Self::Major(major) => version.major == *major,
            Self::MajorMinor(major, minor) => {
                version.major == *major && version.minor == *minor
            }
        }
    }

    /// The major line this constraint names, when it names one.
    pub fn major(&self) -> u64 {
        match self {
            Self::Exact(version) => version.major,
            Self::Major(major) => *major,
            Self::MajorMinor(major, _) => *major,
        }
    }
}
