use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use gokeep_core::{
    BinaryDiagnostic, BinaryInfo, BinaryUpgradeInfo, Kind, Module, ModuleVersion, Vulnerability,
};

use crate::render::{
    current_output_style, format_diagnostic_lines, format_info_lines, format_outdated_lines,
    render_status_line, OutputStyle,
};
use crate::{Cli, Commands, PinKind};

fn sample_info(name: &str, version: &str, managed: bool) -> BinaryInfo {
    let module = Module::new(
        format!("example.com/{name}"),
        ModuleVersion::parse(version).expect("must parse"),
    );
    BinaryInfo {
        name: name.to_string(),
        full_path: PathBuf::from(format!("/home/u/go/bin/{name}")),
        install_path: PathBuf::from(format!("/home/u/.gokeep/bin/{name}@{version}")),
        package_path: format!("example.com/{name}/cmd/{name}"),
        module,
        module_sum: "h1:abc=".to_string(),
        go_version: "go1.22.1".to_string(),
        commit_revision: None,
        commit_time: None,
        os: "linux".to_string(),
        arch: "amd64".to_string(),
        feature: String::new(),
        env_vars: BTreeMap::new(),
        is_managed: managed,
    }
}

fn upgrade_for(info: BinaryInfo, latest: &str, available: bool) -> BinaryUpgradeInfo {
    let latest_module = Module::new(
        info.module.path.clone(),
        ModuleVersion::parse(latest).expect("must parse"),
    );
    BinaryUpgradeInfo {
        binary: info,
        latest_module,
        is_upgrade_available: available,
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn cli_parses_bulk_flags() {
    let cli = Cli::try_parse_from(["gokeep", "-j", "4", "outdated", "--major"])
        .expect("must parse");
    assert_eq!(cli.parallelism, Some(4));
    assert!(matches!(
        cli.command,
        Commands::Outdated {
            major: true,
            json: false
        }
    ));
}

#[test]
fn cli_rejects_name_combined_with_all() {
    assert!(Cli::try_parse_from(["gokeep", "upgrade", "rg", "--all"]).is_err());
    assert!(Cli::try_parse_from(["gokeep", "prune", "rg", "--all"]).is_err());
}

#[test]
fn cli_pin_defaults_to_major_kind() {
    let cli = Cli::try_parse_from(["gokeep", "pin", "rg@v14"]).expect("must parse");
    let Commands::Pin { spec, kind } = cli.command else {
        panic!("expected a pin command");
    };
    assert_eq!(spec, "rg@v14");
    assert_eq!(kind, PinKind::Major);
}

#[test]
fn pin_kind_maps_onto_alias_granularity() {
    assert_eq!(Kind::from(PinKind::Latest), Kind::Latest);
    assert_eq!(Kind::from(PinKind::Major), Kind::Major);
    assert_eq!(Kind::from(PinKind::Minor), Kind::Minor);
}

#[test]
fn forced_plain_mode_wins_over_terminal_detection() {
    assert_eq!(current_output_style(true), OutputStyle::Plain);
}

#[test]
fn status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "installed rg v14.1.0"),
        "installed rg v14.1.0"
    );
}

#[test]
fn status_line_rich_carries_a_badge() {
    let line = render_status_line(OutputStyle::Rich, "ok", "installed rg v14.1.0");
    assert!(line.contains(" ok "));
    assert!(line.ends_with("installed rg v14.1.0"));
}

#[test]
fn info_lines_mark_unmanaged_binaries() {
    let infos = vec![
        sample_info("rg", "v14.1.0", true),
        sample_info("stray", "v0.3.0", false),
    ];
    let lines = format_info_lines(&infos, OutputStyle::Plain);
    assert_eq!(lines[0], "rg v14.1.0 example.com/rg");
    assert_eq!(lines[1], "stray v0.3.0 example.com/stray (unmanaged)");
}

#[test]
fn outdated_lines_report_an_empty_set() {
    let upgrades = vec![upgrade_for(sample_info("rg", "v14.1.0", true), "v14.1.0", false)];
    let lines = format_outdated_lines(&upgrades, OutputStyle::Plain);
    assert_eq!(lines, vec!["All binaries are up to date".to_string()]);
}

#[test]
fn outdated_lines_show_the_version_jump() {
    let upgrades = vec![
        upgrade_for(sample_info("rg", "v14.0.0", true), "v14.1.0", true),
        upgrade_for(sample_info("fd", "v9.0.0", true), "v9.0.0", false),
    ];
    let lines = format_outdated_lines(&upgrades, OutputStyle::Plain);
    assert_eq!(lines[0], "rg v14.0.0 -> v14.1.0 (example.com/rg)");
    assert_eq!(lines[1], "1 of 2 binaries outdated");
}

#[test]
fn diagnostic_lines_hide_clean_binaries_by_default() {
    let clean = BinaryDiagnostic {
        name: "rg".to_string(),
        full_path: PathBuf::from("/home/u/go/bin/rg"),
        ..BinaryDiagnostic::default()
    };
    let lines = format_diagnostic_lines(&[clean.clone()], false, OutputStyle::Plain);
    assert_eq!(lines, vec!["0 of 1 binaries have findings".to_string()]);

    let lines = format_diagnostic_lines(&[clean], true, OutputStyle::Plain);
    assert_eq!(lines[0], "rg: ok");
}

#[test]
fn diagnostic_lines_enumerate_findings() {
    let diagnostic = BinaryDiagnostic {
        name: "stray".to_string(),
        full_path: PathBuf::from("/home/u/go/bin/stray"),
        not_managed: true,
        is_pseudo_version: true,
        retracted: Some("broken builds".to_string()),
        vulnerabilities: vec![Vulnerability {
            id: "GO-2024-1234".to_string(),
            url: "https://pkg.go.dev/vuln/GO-2024-1234".to_string(),
            details: "exploitable parser".to_string(),
        }],
        ..BinaryDiagnostic::default()
    };
    let lines = format_diagnostic_lines(&[diagnostic], false, OutputStyle::Plain);
    assert!(lines[0].starts_with("stray"));
    assert!(lines.iter().any(|line| line.contains("not managed")));
    assert!(lines.iter().any(|line| line.contains("pseudo-version")));
    assert!(lines.iter().any(|line| line.contains("broken builds")));
    assert!(lines.iter().any(|line| line.contains("GO-2024-1234")));
    assert_eq!(lines.last().map(String::as_str), Some("1 of 1 binaries have findings"));
}

#[test]
fn module_support_finding_suppresses_the_rest() {
    let diagnostic = BinaryDiagnostic {
        name: "legacy".to_string(),
        full_path: PathBuf::from("/home/u/go/bin/legacy"),
        not_built_with_go_modules: true,
        ..BinaryDiagnostic::default()
    };
    let lines = format_diagnostic_lines(&[diagnostic], false, OutputStyle::Plain);
    assert!(lines
        .iter()
        .any(|line| line.contains("built without module support")));
    assert_eq!(lines.len(), 3);
}
