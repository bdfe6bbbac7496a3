mod buildinfo;
mod gocli;
mod modfile;
mod system;
mod vuln;

pub use buildinfo::{BuildInfo, BuildSettings};
pub use gocli::{GoCli, ModuleOrigin, Toolchain};
pub use modfile::{ModuleManifest, Retraction};
pub use system::{OsSystem, System};
pub use vuln::parse_vulncheck_output;

#[cfg(test)]
mod tests;
