use thiserror::Error;

/// Recognized, user-facing failure conditions. Everything else travels
/// as a generic `anyhow::Error` with context.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("binary not found: {0}")]
    BinaryNotFound(String),
    #[error("binary is already managed: {0}")]
    BinaryAlreadyManaged(String),
    #[error("binary was built without go module support: {0}")]
    BuiltWithoutGoModules(String),
    #[error("module not found: {0}")]
    ModuleNotFound(String),
    #[error("module information unavailable: {0}")]
    ModuleInfoUnavailable(String),
    #[error("module origin unavailable: {0}")]
    OriginUnavailable(String),
    #[error("invalid version: {0}")]
    InvalidVersion(String),
}

/// True when the error chain bottoms out in `ModuleNotFound`. Version
/// resolution uses this to distinguish "no further majors exist" from a
/// hard toolchain failure.
pub fn is_module_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<Error>(), Some(Error::ModuleNotFound(_)))
}
