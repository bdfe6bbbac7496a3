use std::collections::BTreeMap;

use anyhow::Result;
use gokeep_core::Error;

/// Embedded build metadata read from an executable via
/// `go version -m <path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub go_version: String,
    pub package_path: String,
    pub module_path: String,
    pub module_version: String,
    /// Content checksum; empty for binaries built from uncommitted or
    /// replaced sources.
    pub module_sum: String,
    pub settings: BTreeMap<String, String>,
}

/// Build settings bucketed the way reports consume them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSettings {
    pub os: String,
    pub arch: String,
    /// Architecture feature level, e.g. `GOAMD64=v1`.
    pub feature: String,
    pub env_vars: BTreeMap<String, String>,
    pub commit_revision: Option<String>,
    pub commit_time: Option<String>,
}

const FEATURE_KEYS: &[&str] = &["GOAMD64", "GOARM", "GOARM64", "GO386", "GOMIPS", "GOPPC64"];

impl BuildInfo {
    /// Parse the tab-indented report `go version -m` prints. The first
    /// line names the file and its Go version; detail lines are
    /// tab-separated records.
    pub fn parse(path_label: &str, output: &str) -> Result<Self> {
        let mut lines = output.lines();
        let header = lines
            .next()
            .ok_or_else(|| Error::BinaryNotFound(path_label.to_string()))?;
        let go_version = header
            .rsplit_once(": ")
            .map(|(_, version)| version.trim())
            .filter(|version| version.starts_with("go"))
            .ok_or_else(|| Error::BinaryNotFound(path_label.to_string()))?
            .to_string();

        let mut package_path = None;
        let mut module_path = None;
        let mut module_version = None;
        let mut module_sum = String::new();
        let mut settings = BTreeMap::new();

        for line in lines {
            let Some(record) = line.strip_prefix('\t') else {
                continue;
            };
            let fields: Vec<&str> = record.split('\t').collect();
            match fields.as_slice() {
                ["path", value] => package_path = Some(value.to_string()),
                ["mod", path, version, rest @ ..] => {
                    module_path = Some(path.to_string());
                    module_version = Some(version.to_string());
                    if let Some(sum) = rest.first() {
                        module_sum = sum.to_string();
                    }
                }
                ["build", setting] => {
                    if let Some((key, value)) = setting.split_once('=') {
                        settings.insert(key.to_string(), value.to_string());
                    }
                }
                _ => {}
            }
        }

        let (Some(package_path), Some(module_path), Some(module_version)) =
            (package_path, module_path, module_version)
        else {
            return Err(Error::BuiltWithoutGoModules(path_label.to_string()).into());
        };

        Ok(Self {
            go_version,
            package_path,
            module_path,
            module_version,
            module_sum,
            settings,
        })
    }

    pub fn classify_settings(&self) -> BuildSettings {
        let mut classified = BuildSettings::default();
        for (key, value) in &self.settings {
            match key.as_str() {
                "GOOS" => classified.os = value.clone(),
                "GOARCH" => classified.arch = value.clone(),
                "vcs.revision" => classified.commit_revision = Some(value.clone()),
                "vcs.time" => classified.commit_time = Some(value.clone()),
                key if FEATURE_KEYS.contains(&key) => {
                    classified.feature = format!("{key}={value}");
                }
                key if key.starts_with("GO") || key == "CGO_ENABLED" => {
                    classified
                        .env_vars
                        .insert(key.to_string(), value.clone());
                }
                _ => {}
            }
        }
        classified
    }
}
