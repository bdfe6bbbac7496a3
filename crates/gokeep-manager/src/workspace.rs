use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use gokeep_toolchain::System;

/// Resolved locations of the two binary stores: the toolchain-owned
/// external directory and the internally managed base with its `bin/`
/// and `tmp/` subdirectories. Resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    external_bin: PathBuf,
    base: PathBuf,
}

impl Workspace {
    pub fn new(external_bin: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            external_bin: external_bin.into(),
            base: base.into(),
        }
    }

    /// Precedence for the external directory: `GOBIN`, then
    /// `GOPATH/bin`, then the home-directory default `~/go/bin`.
    pub fn resolve(system: &impl System) -> Result<Self> {
        let external_bin = if let Some(gobin) = system.env_var("GOBIN") {
            PathBuf::from(gobin)
        } else if let Some(gopath) = system.env_var("GOPATH") {
            PathBuf::from(gopath).join("bin")
        } else {
            home_dir(system)?.join("go").join("bin")
        };

        let base = if cfg!(windows) {
            let app_data = system
                .env_var("LOCALAPPDATA")
                .context("LOCALAPPDATA is not set; cannot resolve managed store")?;
            PathBuf::from(app_data).join("gokeep")
        } else {
            home_dir(system)?.join(".gokeep")
        };

        Ok(Self { external_bin, base })
    }

    pub fn external_bin_path(&self) -> &Path {
        &self.external_bin
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// The managed store: `<name>@<version>` files live here.
    pub fn managed_bin_path(&self) -> PathBuf {
        self.base.join("bin")
    }

    /// Root for uniquely named per-install staging directories.
    pub fn temp_path(&self) -> PathBuf {
        self.base.join("tmp")
    }

    pub fn ensure_base_dirs(&self, system: &impl System) -> Result<()> {
        for dir in [
            self.external_bin.clone(),
            self.base.clone(),
            self.managed_bin_path(),
            self.temp_path(),
        ] {
            system
                .mkdir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

fn home_dir(system: &impl System) -> Result<PathBuf> {
    let key = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    let home = system
        .env_var(key)
        .with_context(|| format!("{key} is not set; cannot resolve home directory"))?;
    Ok(PathBuf::from(home))
}
