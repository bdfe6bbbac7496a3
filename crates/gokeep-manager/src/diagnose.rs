use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use gokeep_core::{is_pseudo_version, BinaryDiagnostic, BinaryInfo, Error, ModuleVersion};
use gokeep_toolchain::{System, Toolchain};

use crate::discover::binary_name;
use crate::install::external_entry_name;
use crate::manager::BinaryManager;

impl<S: System, T: Toolchain> BinaryManager<S, T> {
    /// Evaluate every independent check for one binary. A binary built
    /// without module support short-circuits: nothing else can be
    /// learned about it, so only that finding is set. Module-file and
    /// vulnerability lookups are hard checks whose errors abort the
    /// diagnosis; everything else degrades to an empty finding.
    pub fn diagnose_binary(&self, path: &Path) -> Result<BinaryDiagnostic> {
        let info = match self.binary_info(path) {
            Ok(info) => info,
            Err(err)
                if matches!(
                    err.downcast_ref::<Error>(),
                    Some(Error::BuiltWithoutGoModules(_))
                ) =>
            {
                return Ok(BinaryDiagnostic {
                    name: binary_name(path),
                    full_path: path.to_path_buf(),
                    not_built_with_go_modules: true,
                    ..BinaryDiagnostic::default()
                });
            }
            Err(err) => return Err(err),
        };

        let (not_in_path, duplicates_in_path) = self.path_findings(&info);

        let mut diagnostic = BinaryDiagnostic {
            name: info.name.clone(),
            full_path: info.full_path.clone(),
            not_in_path,
            duplicates_in_path,
            not_managed: !info.is_managed,
            is_pseudo_version: is_pseudo_version(&info.module.version.to_string()),
            is_orphaned: info.is_orphaned(),
            ..BinaryDiagnostic::default()
        };

        if let Ok(toolchain_version) = self.toolchain().go_version() {
            if info.go_version != toolchain_version {
                diagnostic.go_version_mismatch = Some(format!(
                    "built with {}, toolchain is {toolchain_version}",
                    info.go_version
                ));
            }
        }
        if let (Ok(os), Ok(arch)) = (self.toolchain().go_os(), self.toolchain().go_arch()) {
            if !info.os.is_empty()
                && !info.arch.is_empty()
                && (info.os != os || info.arch != arch)
            {
                diagnostic.platform_mismatch = Some(format!(
                    "built for {}/{}, running on {os}/{arch}",
                    info.os, info.arch
                ));
            }
        }

        // Retraction, deprecation and vulnerability data only exist for
        // binaries with a verifiable checksum.
        if !info.is_orphaned() {
            let manifest = self
                .toolchain()
                .module_file(&info.module.path, &ModuleVersion::Latest)
                .with_context(|| {
                    format!("failed to fetch module file for {}", info.module.path)
                })?;
            if let Some(current) = info.module.version.as_semantic() {
                diagnostic.retracted = manifest.retraction_for(current);
            }
            diagnostic.deprecated = manifest.deprecated;

            diagnostic.vulnerabilities = self
                .toolchain()
                .vuln_check(&info.install_path)
                .with_context(|| {
                    format!("vulnerability scan failed for {}", info.install_path.display())
                })?;
        }

        Ok(diagnostic)
    }

    /// PATH membership and duplicates: scan every directory on PATH for
    /// an entry with the binary's name, dedupe by resolved install
    /// path, and report when more than one distinct match exists.
    fn path_findings(&self, info: &BinaryInfo) -> (bool, Vec<PathBuf>) {
        let entry_name = external_entry_name(&info.name);
        let mut matches: Vec<PathBuf> = Vec::new();
        let mut seen: BTreeSet<PathBuf> = BTreeSet::new();

        for dir in self.system().path_entries() {
            let candidate = dir.join(&entry_name);
            if !self.system().is_executable(&candidate) {
                continue;
            }
            let resolved = self.resolve_install_path(&candidate);
            if seen.insert(resolved) {
                matches.push(candidate);
            }
        }

        let not_in_path = matches.is_empty();
        let duplicates = if matches.len() > 1 { matches } else { Vec::new() };
        (not_in_path, duplicates)
    }
}
