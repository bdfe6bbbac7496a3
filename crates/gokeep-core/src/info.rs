use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::module::Module;

/// Discovered, immutable-per-snapshot facts about one on-disk
/// executable. Recomputed on every query, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryInfo {
    pub name: String,
    /// Path as found in the external or managed directory.
    pub full_path: PathBuf,
    /// Resolved symlink target, or `full_path` when not a symlink.
    pub install_path: PathBuf,
    pub package_path: String,
    pub module: Module,
    /// Content checksum; empty means the binary is orphaned (built from
    /// an uncommitted or unverifiable source).
    pub module_sum: String,
    pub go_version: String,
    pub commit_revision: Option<String>,
    pub commit_time: Option<String>,
    pub os: String,
    pub arch: String,
    pub feature: String,
    pub env_vars: BTreeMap<String, String>,
    pub is_managed: bool,
}

impl BinaryInfo {
    pub fn is_orphaned(&self) -> bool {
        self.module_sum.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryUpgradeInfo {
    pub binary: BinaryInfo,
    pub latest_module: Module,
    pub is_upgrade_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vulnerability {
    pub id: String,
    pub url: String,
    pub details: String,
}

/// Independent findings for one binary. Every field degrades to
/// false/empty when its check cannot run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BinaryDiagnostic {
    pub name: String,
    pub full_path: PathBuf,
    pub not_in_path: bool,
    pub duplicates_in_path: Vec<PathBuf>,
    pub not_managed: bool,
    pub is_pseudo_version: bool,
    pub not_built_with_go_modules: bool,
    pub is_orphaned: bool,
    pub go_version_mismatch: Option<String>,
    pub platform_mismatch: Option<String>,
    pub retracted: Option<String>,
    pub deprecated: Option<String>,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl BinaryDiagnostic {
    pub fn has_issues(&self) -> bool {
        self.not_in_path
            || !self.duplicates_in_path.is_empty()
            || self.not_managed
            || self.is_pseudo_version
            || self.not_built_with_go_modules
            || self.is_orphaned
            || self.go_version_mismatch.is_some()
            || self.platform_mismatch.is_some()
            || self.retracted.is_some()
            || self.deprecated.is_some()
            || !self.vulnerabilities.is_empty()
    }
}
