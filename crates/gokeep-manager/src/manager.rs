use anyhow::Result;

use gokeep_core::{BinaryDiagnostic, BinaryUpgradeInfo};
use gokeep_toolchain::{System, Toolchain};

use crate::orchestrator::{BatchOutcome, Orchestrator};
use crate::workspace::Workspace;

/// The binary manager: discovery, diagnosis, version resolution, and
/// the install/upgrade/migrate/pin/uninstall/prune operations against
/// the dual-location store. Per-operation logic lives in the sibling
/// modules; bulk fan-out goes through [`Orchestrator`].
pub struct BinaryManager<S, T> {
    pub(crate) system: S,
    pub(crate) toolchain: T,
    pub(crate) workspace: Workspace,
}

impl<S: System, T: Toolchain> BinaryManager<S, T> {
    pub fn new(system: S, toolchain: T, workspace: Workspace) -> Self {
        Self {
            system,
            toolchain,
            workspace,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub(crate) fn system(&self) -> &S {
        &self.system
    }

    pub(crate) fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Diagnose every binary in the external directory. Results come
    /// back sorted by name; the first hard error (if any) rides along
    /// after all targets have been processed.
    pub fn diagnose_all(&self, parallelism: usize) -> Result<BatchOutcome<BinaryDiagnostic>> {
        let paths = self.list_binary_paths(false)?;
        let mut outcome = Orchestrator::new(parallelism)
            .run(paths, |path| self.diagnose_binary(path));
        outcome.results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(outcome)
    }

    /// Resolve upgrade availability for every binary in the external
    /// directory.
    pub fn list_outdated(
        &self,
        check_major: bool,
        parallelism: usize,
    ) -> Result<BatchOutcome<BinaryUpgradeInfo>> {
        let infos = self.all_binary_infos(false)?;
        let mut outcome = Orchestrator::new(parallelism)
            .run(infos, |info| self.upgrade_info_for(info.clone(), check_major));
        outcome
            .results
            .sort_by(|a, b| a.binary.name.cmp(&b.binary.name));
        Ok(outcome)
    }

    /// Upgrade every binary that has a newer version available.
    pub fn upgrade_all(
        &self,
        check_major: bool,
        parallelism: usize,
    ) -> Result<BatchOutcome<BinaryUpgradeInfo>> {
        let infos = self.all_binary_infos(false)?;
        let mut outcome = Orchestrator::new(parallelism)
            .run(infos, |info| self.upgrade_binary(info.clone(), check_major));
        outcome
            .results
            .sort_by(|a, b| a.binary.name.cmp(&b.binary.name));
        Ok(outcome)
    }
}
