mod diagnose;
mod discover;
mod install;
mod manager;
mod orchestrator;
mod pin;
mod resolve;
mod uninstall;
mod workspace;

pub use manager::BinaryManager;
pub use orchestrator::{BatchOutcome, Orchestrator};
pub use uninstall::UninstallOutcome;
pub use workspace::Workspace;
