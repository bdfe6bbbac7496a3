use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use gokeep_core::{BinaryInfo, Module, ModuleVersion};
use gokeep_toolchain::{System, Toolchain};

use crate::manager::BinaryManager;

impl<S: System, T: Toolchain> BinaryManager<S, T> {
    /// Executable files in the external directory, or in the managed
    /// store when `managed` is set.
    pub fn list_binary_paths(&self, managed: bool) -> Result<Vec<PathBuf>> {
        let dir = if managed {
            self.workspace.managed_bin_path()
        } else {
            self.workspace.external_bin_path().to_path_buf()
        };

        let entries = match self.system().read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", dir.display()))
            }
        };

        Ok(entries
            .into_iter()
            .filter(|path| self.system().is_executable(path))
            .collect())
    }

    /// Extract provenance for one executable. The symlink (if any) is
    /// followed once to find the install path; a read-link failure
    /// falls back to the original path.
    pub fn binary_info(&self, path: &Path) -> Result<BinaryInfo> {
        let info = self.toolchain().build_info(path)?;
        let install_path = self.resolve_install_path(path);
        let is_managed = install_path.starts_with(self.workspace.managed_bin_path());

        let settings = info.classify_settings();
        let module = Module::new(
            info.module_path.clone(),
            ModuleVersion::parse(&info.module_version)
                .with_context(|| format!("binary {} reports an unparseable module version", path.display()))?,
        );

        Ok(BinaryInfo {
            name: binary_name(path),
            full_path: path.to_path_buf(),
            install_path,
            package_path: info.package_path,
            module,
            module_sum: info.module_sum,
            go_version: info.go_version,
            commit_revision: settings.commit_revision,
            commit_time: settings.commit_time,
            os: settings.os,
            arch: settings.arch,
            feature: settings.feature,
            env_vars: settings.env_vars,
            is_managed,
        })
    }

    /// Provenance for every binary in the selected directory. A
    /// per-binary metadata failure skips that binary instead of
    /// aborting the listing; this best-effort contract keeps bulk
    /// reports usable next to unreadable strays.
    pub fn all_binary_infos(&self, managed: bool) -> Result<Vec<BinaryInfo>> {
        let mut infos = Vec::new();
        for path in self.list_binary_paths(managed)? {
            match self.binary_info(&path) {
                Ok(info) => infos.push(info),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping binary without readable metadata");
                }
            }
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    /// The upstream repository for a binary, from the module origin
    /// with a module-path-derived fallback.
    pub fn binary_repository(&self, path: &Path) -> Result<String> {
        let info = self.binary_info(path)?;
        match self
            .toolchain()
            .module_origin(&info.module.path, &info.module.version)
        {
            Ok(origin) => Ok(origin.url),
            Err(err) if gokeep_core::is_module_not_found(&err) => {
                Ok(fallback_repository(&info.module.path))
            }
            Err(err)
                if matches!(
                    err.downcast_ref::<gokeep_core::Error>(),
                    Some(gokeep_core::Error::OriginUnavailable(_))
                ) =>
            {
                Ok(fallback_repository(&info.module.path))
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) fn resolve_install_path(&self, path: &Path) -> PathBuf {
        let Ok(metadata) = self.system().lstat(path) else {
            return path.to_path_buf();
        };
        if !metadata.file_type().is_symlink() {
            return path.to_path_buf();
        }
        match self.system().read_link(path) {
            Ok(target) if target.is_absolute() => target,
            Ok(target) => path
                .parent()
                .map(|parent| parent.join(&target))
                .unwrap_or(target),
            Err(_) => path.to_path_buf(),
        }
    }
}

fn fallback_repository(module_path: &str) -> String {
    format!("https://{}", gokeep_core::module_base_path(module_path))
}

/// User-facing name of an on-disk entry: the file name without the
/// Windows extension and without a managed `@version` suffix.
pub(crate) fn binary_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = file_name
        .strip_suffix(".exe")
        .unwrap_or(&file_name)
        .to_string();
    match file_name.split_once('@') {
        Some((name, _)) => name.to_string(),
        None => file_name,
    }
}
