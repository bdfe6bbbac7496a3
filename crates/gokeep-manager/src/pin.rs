use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use tracing::debug;

use gokeep_core::{parse_go_version, Binary, Error, Kind};
use gokeep_toolchain::{System, Toolchain};

use crate::install::external_entry_name;
use crate::manager::BinaryManager;

/// One managed version of a name: the `<name>@<version>` file plus its
/// parsed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ManagedVersion {
    pub path: PathBuf,
    pub version: Version,
}

impl<S: System, T: Toolchain> BinaryManager<S, T> {
    /// Pin a binary: among the managed versions of `binary.name` that
    /// satisfy the constraint, pick the highest and point the alias the
    /// kind selects at it. Replaces any previous alias at that exact
    /// target.
    pub fn pin_binary(&self, binary: &Binary, kind: Kind) -> Result<PathBuf> {
        let candidates = self.managed_versions(&binary.name)?;
        let winner = candidates
            .into_iter()
            .filter(|candidate| binary.matches(&candidate.version))
            .max_by(|a, b| a.version.cmp(&b.version))
            .ok_or_else(|| Error::BinaryNotFound(binary.name.clone()))?;

        let alias = kind.alias_name(&binary.name, &winner.version);
        debug!(alias, target = %winner.path.display(), "pinning alias");
        let alias_path = self
            .workspace
            .external_bin_path()
            .join(external_entry_name(&alias));

        match self.system().remove_file(&alias_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to remove {}", alias_path.display()))
            }
        }
        self.system()
            .symlink(&winner.path, &alias_path)
            .with_context(|| {
                format!(
                    "failed to link {} -> {}",
                    alias_path.display(),
                    winner.path.display()
                )
            })?;
        Ok(alias_path)
    }

    /// Every `<name>@<version>` file for `name` in the managed store.
    pub(crate) fn managed_versions(&self, name: &str) -> Result<Vec<ManagedVersion>> {
        let mut versions = Vec::new();
        for path in self.list_binary_paths(true)? {
            let Some((entry_name, version)) = parse_managed_file_name(&path) else {
                continue;
            };
            if entry_name == name {
                versions.push(ManagedVersion { path, version });
            }
        }
        Ok(versions)
    }
}

/// Split a managed store filename back into name and version.
pub(crate) fn parse_managed_file_name(path: &Path) -> Option<(String, Version)> {
    let file_name = path.file_name()?.to_str()?;
    let file_name = file_name.strip_suffix(".exe").unwrap_or(file_name);
    let (name, version) = file_name.split_once('@')?;
    let version = parse_go_version(version).ok()?;
    Some((name.to_string(), version))
}
