use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};

use gokeep_core::{BinaryDiagnostic, BinaryInfo, BinaryUpgradeInfo};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

/// Rich output only on a terminal, and never when `NO_COLOR` is set or
/// the caller forced plain mode.
pub fn current_output_style(force_plain: bool) -> OutputStyle {
    if force_plain || std::env::var_os("NO_COLOR").is_some() {
        return OutputStyle::Plain;
    }
    if std::io::stdout().is_terminal() {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

fn ok_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightGreen.into()))
        .effects(Effects::BOLD)
}

fn warn_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightYellow.into()))
        .effects(Effects::BOLD)
}

fn fail_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightRed.into()))
        .effects(Effects::BOLD)
}

fn step_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::BrightBlue.into()))
}

fn name_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn dim_style() -> Style {
    Style::new().effects(Effects::DIMMED)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn status_badge(status: &str) -> (Style, &'static str) {
    match status {
        "ok" => (ok_style(), " ok "),
        "warn" => (warn_style(), "warn"),
        "fail" => (fail_style(), "fail"),
        _ => (step_style(), "step"),
    }
}

/// One status line: unadorned in plain mode, an ASCII badge in rich
/// mode.
pub fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => {
            let (badge_style, badge) = status_badge(status);
            format!("[{}] {message}", colorize(badge_style, badge))
        }
    }
}

pub fn format_info_lines(infos: &[BinaryInfo], style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::with_capacity(infos.len());
    for info in infos {
        let name = match style {
            OutputStyle::Plain => info.name.clone(),
            OutputStyle::Rich => colorize(name_style(), &info.name),
        };
        let origin = match style {
            OutputStyle::Plain => info.module.path.clone(),
            OutputStyle::Rich => colorize(dim_style(), &info.module.path),
        };
        let marker = if info.is_managed { "" } else { " (unmanaged)" };
        lines.push(format!(
            "{name} {} {origin}{marker}",
            info.module.version
        ));
    }
    lines
}

pub fn format_outdated_lines(upgrades: &[BinaryUpgradeInfo], style: OutputStyle) -> Vec<String> {
    let outdated: Vec<&BinaryUpgradeInfo> = upgrades
        .iter()
        .filter(|upgrade| upgrade.is_upgrade_available)
        .collect();
    if outdated.is_empty() {
        return vec!["All binaries are up to date".to_string()];
    }

    let mut lines = Vec::with_capacity(outdated.len() + 1);
    for upgrade in &outdated {
        let name = match style {
            OutputStyle::Plain => upgrade.binary.name.clone(),
            OutputStyle::Rich => colorize(name_style(), &upgrade.binary.name),
        };
        lines.push(format!(
            "{name} {} -> {} ({})",
            upgrade.binary.module.version, upgrade.latest_module.version, upgrade.latest_module.path,
        ));
    }
    lines.push(format!(
        "{} of {} binaries outdated",
        HumanCount(outdated.len() as u64),
        HumanCount(upgrades.len() as u64)
    ));
    lines
}

pub fn format_diagnostic_lines(
    diagnostics: &[BinaryDiagnostic],
    show_clean: bool,
    style: OutputStyle,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut with_findings = 0_u64;

    for diagnostic in diagnostics {
        if !diagnostic.has_issues() {
            if show_clean {
                lines.push(render_status_line(style, "ok", &format!("{}: ok", diagnostic.name)));
            }
            continue;
        }
        with_findings += 1;
        lines.push(render_status_line(
            style,
            "warn",
            &format!("{} ({})", diagnostic.name, diagnostic.full_path.display()),
        ));
        lines.extend(finding_lines(diagnostic));
    }

    lines.push(format!(
        "{} of {} binaries have findings",
        HumanCount(with_findings),
        HumanCount(diagnostics.len() as u64)
    ));
    lines
}

fn finding_lines(diagnostic: &BinaryDiagnostic) -> Vec<String> {
    let mut lines = Vec::new();
    if diagnostic.not_built_with_go_modules {
        lines.push("  - built without module support; nothing else can be checked".to_string());
        return lines;
    }
    if diagnostic.not_in_path {
        lines.push("  - not reachable via PATH".to_string());
    }
    if !diagnostic.duplicates_in_path.is_empty() {
        let paths: Vec<String> = diagnostic
            .duplicates_in_path
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        lines.push(format!("  - shadowed on PATH: {}", paths.join(", ")));
    }
    if diagnostic.not_managed {
        lines.push("  - not managed; run `gokeep migrate` to adopt it".to_string());
    }
    if diagnostic.is_pseudo_version {
        lines.push("  - built from a pseudo-version, not a release".to_string());
    }
    if diagnostic.is_orphaned {
        lines.push("  - no module checksum; provenance cannot be verified".to_string());
    }
    if let Some(mismatch) = &diagnostic.go_version_mismatch {
        lines.push(format!("  - {mismatch}"));
    }
    if let Some(mismatch) = &diagnostic.platform_mismatch {
        lines.push(format!("  - {mismatch}"));
    }
    if let Some(rationale) = &diagnostic.retracted {
        lines.push(format!("  - version is retracted: {rationale}"));
    }
    if let Some(notice) = &diagnostic.deprecated {
        lines.push(format!("  - module is deprecated: {notice}"));
    }
    for vulnerability in &diagnostic.vulnerabilities {
        lines.push(format!(
            "  - {}: {} ({})",
            vulnerability.id, vulnerability.details, vulnerability.url
        ));
    }
    lines
}

/// Progress bar for a CLI-driven bulk loop. Hidden in plain mode so the
/// call sites stay uniform.
pub fn bulk_progress(style: OutputStyle, label: &str, total: u64) -> ProgressBar {
    if style == OutputStyle::Plain {
        return ProgressBar::hidden();
    }
    let progress_bar = ProgressBar::new(total.max(1));
    if let Ok(template) = ProgressStyle::with_template(
        "{spinner:.cyan.bold} {msg:<10} [{bar:20.cyan/blue}] {pos:>3}/{len:3}",
    ) {
        progress_bar.set_style(template.progress_chars("=>-"));
    }
    progress_bar.set_message(label.to_string());
    progress_bar.enable_steady_tick(Duration::from_millis(80));
    progress_bar
}
