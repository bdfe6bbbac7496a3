use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use gokeep_toolchain::{System, Toolchain};

use crate::manager::BinaryManager;

/// Uninstall distinguishes "removed" from "there was nothing to
/// remove"; the latter is a reported condition, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed(PathBuf),
    NotInstalled(String),
}

impl<S: System, T: Toolchain> BinaryManager<S, T> {
    /// Remove the external directory's entry for `name`.
    pub fn uninstall_binary(&self, name: &str) -> Result<UninstallOutcome> {
        let entry = self.external_entry_path(name);
        match self.system().remove_file(&entry) {
            Ok(()) => Ok(UninstallOutcome::Removed(entry)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(UninstallOutcome::NotInstalled(name.to_string()))
            }
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", entry.display()))
            }
        }
    }

    /// Reclaim managed versions of `name` that no symlink in the
    /// external directory references. The default entry and every pin
    /// alias count as live references, so pinned versions always
    /// survive.
    pub fn prune_binary(&self, name: &str) -> Result<Vec<PathBuf>> {
        let live = self.live_symlink_targets()?;
        let mut removed = Vec::new();

        for candidate in self.managed_versions(name)? {
            if live.contains(&candidate.path) {
                continue;
            }
            self.system()
                .remove_file(&candidate.path)
                .with_context(|| format!("failed to prune {}", candidate.path.display()))?;
            debug!(path = %candidate.path.display(), "pruned managed version");
            removed.push(candidate.path);
        }

        removed.sort();
        Ok(removed)
    }

    /// Resolved targets of every symlink in the external directory.
    fn live_symlink_targets(&self) -> Result<Vec<PathBuf>> {
        let external = self.workspace.external_bin_path().to_path_buf();
        let entries = match self.system().read_dir(&external) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", external.display()))
            }
        };

        let mut targets = Vec::new();
        for entry in entries {
            let Ok(metadata) = self.system().lstat(&entry) else {
                continue;
            };
            if !metadata.file_type().is_symlink() {
                continue;
            }
            targets.push(self.resolve_install_path(&entry));
        }
        Ok(targets)
    }
}
