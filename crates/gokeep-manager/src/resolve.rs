use anyhow::Result;

use gokeep_core::{
    is_module_not_found, module_path_for_major, next_major, BinaryInfo, BinaryUpgradeInfo, Module,
};
use gokeep_toolchain::{System, Toolchain};

use crate::manager::BinaryManager;

impl<S: System, T: Toolchain> BinaryManager<S, T> {
    /// Latest version on the module's own major line: a single query.
    pub fn latest_minor_version(&self, module: &Module) -> Result<Module> {
        self.toolchain().latest_module_version(&module.path)
    }

    /// Walk major lines forward from the module until the toolchain
    /// reports "module not found", returning the last line that
    /// resolved. Any other error aborts the walk; a gap in published
    /// majors is a ceiling, a proxy failure is not.
    pub fn latest_major_version(&self, module: &Module) -> Result<Module> {
        let mut latest = self.latest_minor_version(module)?;
        let mut major = latest.path_major();

        loop {
            major = next_major(major);
            let candidate_path = module_path_for_major(&latest.path, major);
            match self.toolchain().latest_module_version(&candidate_path) {
                Ok(resolved) => latest = resolved,
                Err(err) if is_module_not_found(&err) => return Ok(latest),
                Err(err) => return Err(err),
            }
        }
    }

    /// Upgrade availability for one discovered binary, by semantic
    /// version comparison of current against latest.
    pub fn upgrade_info_for(
        &self,
        binary: BinaryInfo,
        check_major: bool,
    ) -> Result<BinaryUpgradeInfo> {
        let latest_module = if check_major {
            self.latest_major_version(&binary.module)?
        } else {
            self.latest_minor_version(&binary.module)?
        };

        let is_upgrade_available = match (
            binary.module.version.as_semantic(),
            latest_module.version.as_semantic(),
        ) {
            (Some(current), Some(latest)) => latest > current,
            _ => false,
        };

        Ok(BinaryUpgradeInfo {
            binary,
            latest_module,
            is_upgrade_available,
        })
    }

    /// Upgrade availability for the binary at `path`.
    pub fn binary_upgrade_info(
        &self,
        path: &std::path::Path,
        check_major: bool,
    ) -> Result<BinaryUpgradeInfo> {
        let info = self.binary_info(path)?;
        self.upgrade_info_for(info, check_major)
    }
}
