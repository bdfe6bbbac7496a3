use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use gokeep_core::{BinaryInfo, BinaryUpgradeInfo, Error, Package};
use gokeep_toolchain::{System, Toolchain};

use crate::discover::binary_name;
use crate::manager::BinaryManager;

impl<S: System, T: Toolchain> BinaryManager<S, T> {
    /// Install (or reinstall) a package into the managed store and
    /// point the external directory's default entry at it.
    ///
    /// The build lands in a uniquely named staging directory first; the
    /// external entry is only touched after the artifact has been
    /// renamed into the managed store, so a failed build or metadata
    /// read leaves the previously reachable binary untouched. Between
    /// removing the old entry and creating the new symlink there is a
    /// narrow window where the name resolves to nothing; rename-replace
    /// over a symlink is not portable, so that window is accepted.
    pub fn install_package(&self, package: &Package) -> Result<BinaryInfo> {
        self.workspace.ensure_base_dirs(self.system())?;
        let staging = self.make_staging_dir()?;

        let result = self.install_into_staging(package, &staging);

        // Best-effort cleanup regardless of outcome.
        if let Err(err) = self.system().remove_all(&staging) {
            warn!(dir = %staging.display(), error = %err, "failed to clean staging directory");
        }

        result
    }

    fn install_into_staging(&self, package: &Package, staging: &Path) -> Result<BinaryInfo> {
        self.toolchain()
            .install(staging, &package.import_path(), &package.module.version)
            .with_context(|| format!("failed to build {package}"))?;

        let artifact = self.staged_artifact(staging)?;
        let built = self.toolchain().build_info(&artifact)?;
        let name = binary_name(&artifact);
        debug!(name, version = built.module_version, "built binary in staging");

        let managed_path = self
            .workspace
            .managed_bin_path()
            .join(managed_file_name(&name, &built.module_version));
        self.system()
            .rename(&artifact, &managed_path)
            .with_context(|| {
                format!("failed to move built binary into {}", managed_path.display())
            })?;

        self.replace_default_entry(&name, &managed_path)?;
        self.binary_info(&self.external_entry_path(&name))
    }

    /// Swap the external directory's default entry for `name` to a
    /// symlink at `target`, tolerating a missing previous entry.
    pub(crate) fn replace_default_entry(&self, name: &str, target: &Path) -> Result<()> {
        let entry = self.external_entry_path(name);
        match self.system().remove_file(&entry) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to remove {}", entry.display()))
            }
        }
        self.system().symlink(target, &entry).with_context(|| {
            format!(
                "failed to link {} -> {}",
                entry.display(),
                target.display()
            )
        })
    }

    /// Upgrade one binary when a newer version is available, keeping
    /// the original sub-package and re-targeting the resolved major
    /// line.
    pub fn upgrade_binary(
        &self,
        binary: BinaryInfo,
        check_major: bool,
    ) -> Result<BinaryUpgradeInfo> {
        let package_path = binary.package_path.clone();
        let module = binary.module.clone();
        let upgrade = self.upgrade_info_for(binary, check_major)?;
        if !upgrade.is_upgrade_available {
            return Ok(upgrade);
        }

        let package = Package::from_package_path(&package_path, module)
            .for_module(upgrade.latest_module.clone());
        self.install_package(&package)?;
        Ok(upgrade)
    }

    /// Convert an unmanaged binary into a managed one without
    /// rebuilding it: rename into the store, leave a symlink behind.
    pub fn migrate_binary(&self, path: &Path) -> Result<BinaryInfo> {
        let info = self.binary_info(path)?;
        if info.is_managed {
            return Err(Error::BinaryAlreadyManaged(info.name).into());
        }
        self.workspace.ensure_base_dirs(self.system())?;

        let managed_path = self
            .workspace
            .managed_bin_path()
            .join(managed_file_name(&info.name, &info.module.version.to_string()));
        self.system()
            .rename(path, &managed_path)
            .with_context(|| format!("failed to move {} into the managed store", path.display()))?;
        self.system().symlink(&managed_path, path).with_context(|| {
            format!(
                "failed to link {} -> {}",
                path.display(),
                managed_path.display()
            )
        })?;

        self.binary_info(path)
    }

    pub(crate) fn external_entry_path(&self, name: &str) -> PathBuf {
        self.workspace
            .external_bin_path()
            .join(external_entry_name(name))
    }

    fn make_staging_dir(&self) -> Result<PathBuf> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let dir = self
            .workspace
            .temp_path()
            .join(format!("install-{}-{nanos}", std::process::id()));
        self.system()
            .mkdir_all(&dir)
            .with_context(|| format!("failed creating staging dir: {}", dir.display()))?;
        Ok(dir)
    }

    fn staged_artifact(&self, staging: &Path) -> Result<PathBuf> {
        let executables: Vec<PathBuf> = self
            .system()
            .read_dir(staging)
            .with_context(|| format!("failed to read staging dir {}", staging.display()))?
            .into_iter()
            .filter(|path| self.system().is_executable(path))
            .collect();

        match executables.as_slice() {
            [artifact] => Ok(artifact.clone()),
            [] => Err(anyhow!(
                "build produced no executable in {}",
                staging.display()
            )),
            _ => Err(anyhow!(
                "build produced multiple executables in {}",
                staging.display()
            )),
        }
    }
}

/// Managed store filename: `<name>@<version>`, keeping the Windows
/// extension after the version so the executable test still holds.
pub(crate) fn managed_file_name(name: &str, version: &str) -> String {
    if cfg!(windows) {
        format!("{name}@{version}.exe")
    } else {
        format!("{name}@{version}")
    }
}

pub(crate) fn external_entry_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}
