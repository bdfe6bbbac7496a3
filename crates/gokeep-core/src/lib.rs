mod binary;
mod error;
mod info;
mod kind;
mod module;
mod package;

pub use binary::{Binary, VersionConstraint};
pub use error::{is_module_not_found, Error};
pub use info::{BinaryDiagnostic, BinaryInfo, BinaryUpgradeInfo, Vulnerability};
pub use kind::Kind;
pub use module::{
    is_pseudo_version, module_base_path, module_path_for_major, next_major, parse_go_version,
    render_go_version, strip_major_suffix, Module, ModuleVersion,
};
pub use package::Package;

#[cfg(test)]
mod tests;
