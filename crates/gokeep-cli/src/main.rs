use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use gokeep_core::{Binary, BinaryInfo, Error, Kind, Package};
use gokeep_manager::{BinaryManager, UninstallOutcome, Workspace};
use gokeep_toolchain::{GoCli, OsSystem, System, Toolchain};

mod render;

#[cfg(test)]
mod tests;

use render::{
    bulk_progress, current_output_style, format_diagnostic_lines, format_info_lines,
    format_outdated_lines, render_status_line, OutputStyle,
};

/// Ceiling for any single `go` or `govulncheck` invocation.
const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Parser, Debug)]
#[command(name = "gokeep")]
#[command(about = "Lifecycle manager for Go-built executables", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, e.g. `debug` or `gokeep_manager=trace`.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Force plain output even on a terminal.
    #[arg(long, global = true)]
    plain: bool,
    /// Worker threads for bulk operations; defaults to the CPU count.
    #[arg(long, short = 'j', global = true)]
    parallelism: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List installed binaries with their build provenance.
    List {
        /// Emit machine-readable JSON instead of formatted lines.
        #[arg(long)]
        json: bool,
    },
    /// Show binaries with a newer version available.
    Outdated {
        /// Also walk `/vN` major lines beyond the current one.
        #[arg(long)]
        major: bool,
        #[arg(long)]
        json: bool,
    },
    /// Diagnose every binary for drift and risk findings.
    Doctor {
        /// Show clean binaries too, not only those with findings.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Build a package and install it into the managed store.
    Install {
        /// Import path with optional version, e.g. `example.com/tool/cmd/tool@v1.2.3`.
        spec: String,
    },
    /// Upgrade one binary, or every binary with `--all`.
    Upgrade {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        all: bool,
        /// Also walk `/vN` major lines beyond the current one.
        #[arg(long)]
        major: bool,
    },
    /// Adopt an externally installed binary into the managed store.
    Migrate {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
    /// Pin a version-constrained alias, e.g. `rg@v14`.
    Pin {
        spec: String,
        #[arg(long, value_enum, default_value_t = PinKind::Major)]
        kind: PinKind,
    },
    /// Remove a binary's entry from the external directory.
    Uninstall { name: String },
    /// Remove managed versions no alias references, for one name or all.
    Prune {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
    /// Print the gokeep version.
    Version,
    /// Generate shell completions.
    Completions { shell: Shell },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PinKind {
    Latest,
    Major,
    Minor,
}

impl From<PinKind> for Kind {
    fn from(kind: PinKind) -> Self {
        match kind {
            PinKind::Latest => Kind::Latest,
            PinKind::Major => Kind::Major,
            PinKind::Minor => Kind::Minor,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    run_cli(cli)
}

fn init_tracing(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("invalid log filter: {filter}"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
    Ok(())
}

fn open_manager() -> Result<BinaryManager<OsSystem, GoCli>> {
    let workspace = Workspace::resolve(&OsSystem)?;
    debug!(
        external = %workspace.external_bin_path().display(),
        base = %workspace.base_path().display(),
        "resolved workspace"
    );
    let toolchain = GoCli::new().with_timeout(SUBPROCESS_TIMEOUT);
    Ok(BinaryManager::new(OsSystem, toolchain, workspace))
}

fn parallelism_for(cli: &Cli) -> usize {
    cli.parallelism.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1)
    })
}

fn run_cli(cli: Cli) -> Result<()> {
    let style = current_output_style(cli.plain);
    let parallelism = parallelism_for(&cli);

    match cli.command {
        Commands::List { json } => {
            let manager = open_manager()?;
            let infos = manager.all_binary_infos(false)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&infos)?);
            } else if infos.is_empty() {
                println!("No binaries installed");
            } else {
                for line in format_info_lines(&infos, style) {
                    println!("{line}");
                }
            }
        }
        Commands::Outdated { major, json } => {
            let manager = open_manager()?;
            let outcome = manager.list_outdated(major, parallelism)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.results)?);
            } else {
                for line in format_outdated_lines(&outcome.results, style) {
                    println!("{line}");
                }
            }
            return finish_batch(outcome.first_error);
        }
        Commands::Doctor { all, json } => {
            let manager = open_manager()?;
            let outcome = manager.diagnose_all(parallelism)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.results)?);
            } else {
                for line in format_diagnostic_lines(&outcome.results, all, style) {
                    println!("{line}");
                }
            }
            return finish_batch(outcome.first_error);
        }
        Commands::Install { spec } => {
            let manager = open_manager()?;
            let package = Package::from_spec(&spec)?;
            let installed = manager.install_package(&package)?;
            println!(
                "{}",
                render_status_line(
                    style,
                    "ok",
                    &format!("installed {} {}", installed.name, installed.module.version),
                )
            );
        }
        Commands::Upgrade { name, all, major } => {
            let manager = open_manager()?;
            if all {
                let outcome = manager.upgrade_all(major, parallelism)?;
                for upgrade in &outcome.results {
                    print_upgrade_outcome(upgrade, style);
                }
                return finish_batch(outcome.first_error);
            }
            let name = require_name(name, "upgrade")?;
            let info = find_binary(&manager, &name)?;
            let upgrade = manager.upgrade_binary(info, major)?;
            print_upgrade_outcome(&upgrade, style);
        }
        Commands::Migrate { name, all } => {
            let manager = open_manager()?;
            if all {
                return migrate_all(&manager, style);
            }
            let name = require_name(name, "migrate")?;
            let info = find_binary(&manager, &name)?;
            let migrated = manager.migrate_binary(&info.full_path)?;
            println!(
                "{}",
                render_status_line(
                    style,
                    "ok",
                    &format!("migrated {} into the managed store", migrated.name),
                )
            );
        }
        Commands::Pin { spec, kind } => {
            let manager = open_manager()?;
            let binary = Binary::parse(&spec)?;
            let alias = manager.pin_binary(&binary, kind.into())?;
            println!(
                "{}",
                render_status_line(
                    style,
                    "ok",
                    &format!("pinned {} -> {}", alias.display(), binary.name),
                )
            );
        }
        Commands::Uninstall { name } => {
            let manager = open_manager()?;
            match manager.uninstall_binary(&name)? {
                UninstallOutcome::Removed(path) => {
                    println!(
                        "{}",
                        render_status_line(style, "ok", &format!("removed {}", path.display()))
                    );
                }
                UninstallOutcome::NotInstalled(name) => {
                    println!("{name} is not installed");
                }
            }
        }
        Commands::Prune { name, all } => {
            let manager = open_manager()?;
            let names = if all {
                managed_names(&manager)?
            } else {
                BTreeSet::from([require_name(name, "prune")?])
            };
            let mut removed_total = 0_usize;
            for name in names {
                for path in manager.prune_binary(&name)? {
                    removed_total += 1;
                    println!(
                        "{}",
                        render_status_line(style, "ok", &format!("pruned {}", path.display()))
                    );
                }
            }
            if removed_total == 0 {
                println!("Nothing to prune");
            }
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "gokeep", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn require_name(name: Option<String>, verb: &str) -> Result<String> {
    name.ok_or_else(|| anyhow::anyhow!("{verb} needs a binary name, or pass --all"))
}

fn find_binary<S: System, T: Toolchain>(
    manager: &BinaryManager<S, T>,
    name: &str,
) -> Result<BinaryInfo> {
    manager
        .all_binary_infos(false)?
        .into_iter()
        .find(|info| info.name == name)
        .ok_or_else(|| Error::BinaryNotFound(name.to_string()).into())
}

/// Names present in the managed store, derived from `name@version` files.
fn managed_names<S: System, T: Toolchain>(
    manager: &BinaryManager<S, T>,
) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for path in manager.list_binary_paths(true)? {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if let Some((name, _)) = file_name.split_once('@') {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}

fn migrate_all<S: System, T: Toolchain>(
    manager: &BinaryManager<S, T>,
    style: OutputStyle,
) -> Result<()> {
    let candidates: Vec<BinaryInfo> = manager
        .all_binary_infos(false)?
        .into_iter()
        .filter(|info| !info.is_managed)
        .collect();
    if candidates.is_empty() {
        println!("Nothing to migrate");
        return Ok(());
    }

    let progress = bulk_progress(style, "migrate", candidates.len() as u64);
    let mut first_error: Option<anyhow::Error> = None;
    for (index, info) in candidates.iter().enumerate() {
        match manager.migrate_binary(&info.full_path) {
            Ok(migrated) => {
                progress.suspend(|| {
                    println!(
                        "{}",
                        render_status_line(
                            style,
                            "ok",
                            &format!("migrated {} into the managed store", migrated.name),
                        )
                    );
                });
            }
            Err(err) => {
                progress.suspend(|| {
                    println!(
                        "{}",
                        render_status_line(
                            style,
                            "fail",
                            &format!("could not migrate {}: {err:#}", info.name),
                        )
                    );
                });
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        progress.set_position(index as u64 + 1);
    }
    progress.finish_and_clear();
    finish_batch(first_error)
}

fn print_upgrade_outcome(upgrade: &gokeep_core::BinaryUpgradeInfo, style: OutputStyle) {
    if upgrade.is_upgrade_available {
        println!(
            "{}",
            render_status_line(
                style,
                "ok",
                &format!(
                    "upgraded {} {} -> {}",
                    upgrade.binary.name, upgrade.binary.module.version, upgrade.latest_module.version,
                ),
            )
        );
    } else {
        println!(
            "{}",
            render_status_line(
                style,
                "step",
                &format!(
                    "{} is up to date ({})",
                    upgrade.binary.name, upgrade.binary.module.version
                ),
            )
        );
    }
}

/// Results have already been printed; a recorded error still fails the
/// command so partial batches are never mistaken for clean runs.
fn finish_batch(first_error: Option<anyhow::Error>) -> Result<()> {
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
