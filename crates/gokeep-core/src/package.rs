use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::module::{module_path_for_major, Module, ModuleVersion};

/// A buildable command: a module plus an optional sub-path to the main
/// package, serialized as `module/subpath@version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub module: Module,
    pub subpath: Option<String>,
}

impl Package {
    pub fn new(module: Module, subpath: Option<String>) -> Self {
        Self { module, subpath }
    }

    /// Parse a user-supplied install spec: `import/path[@version]`, a
    /// missing version defaulting to `latest`. Where the module ends
    /// and the sub-path begins is unknown until build metadata reports
    /// it, so the whole import path stands in as the module path.
    pub fn from_spec(spec: &str) -> Result<Self> {
        let (path, version) = match spec.rsplit_once('@') {
            Some((path, raw)) => (path, ModuleVersion::parse(raw)?),
            None => (spec, ModuleVersion::Latest),
        };
        if path.is_empty() {
            return Err(anyhow!("install spec is missing an import path: {spec}"));
        }
        Ok(Self {
            module: Module::new(path, version),
            subpath: None,
        })
    }

    /// Split a package path into module path and sub-path given the
    /// module path reported by build metadata.
    pub fn from_package_path(package_path: &str, module: Module) -> Self {
        let subpath = package_path
            .strip_prefix(module.path.as_str())
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|rest| !rest.is_empty())
            .map(ToOwned::to_owned);
        Self { module, subpath }
    }

    /// The import path passed to the build tool.
    pub fn import_path(&self) -> String {
        match &self.subpath {
            Some(subpath) => format!("{}/{}", self.module.path, subpath),
            None => self.module.path.clone(),
        }
    }

    /// The same command re-targeted at another major line of the module:
    /// the `/vN` segment is swapped between the stripped base and the
    /// original sub-path.
    pub fn for_module(&self, module: Module) -> Self {
        Self {
            module,
            subpath: self.subpath.clone(),
        }
    }

    pub fn with_version(&self, version: ModuleVersion) -> Self {
        Self {
            module: Module::new(self.module.path.clone(), version),
            subpath: self.subpath.clone(),
        }
    }

    /// Re-derive the import path for a resolved major line, keeping the
    /// sub-path suffix.
    pub fn import_path_for_major(&self, major: u64) -> String {
        let module_path = module_path_for_major(&self.module.path, major);
        match &self.subpath {
            Some(subpath) => format!("{module_path}/{subpath}"),
            None => module_path,
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.import_path(), self.module.version)
    }
}
