use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use extpack_core::ExtensionMetadata;
use extpack_resolver::{DependencyPath, FailReason, LibChoice};
use semver::Version;
use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    output_style_for(
        std::io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    )
}

pub(crate) fn output_style_for(is_terminal: bool, no_color: bool) -> OutputStyle {
    if is_terminal && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("[{}] {message}", status.to_ascii_uppercase()),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResolveReport<'a> {
    pub(crate) id: &'a str,
    pub(crate) version: &'a Version,
    pub(crate) resolved: bool,
    pub(crate) results: &'a [DependencyPath],
    pub(crate) fail_reasons: &'a [FailReason],
    pub(crate) catalog_messages: &'a [String],
}

pub(crate) fn format_resolve_lines(style: OutputStyle, report: &ResolveReport<'_>) -> Vec<String> {
    let request = format!("{}@{}", report.id, report.version);
    let mut lines = Vec::new();

    if report.results.is_empty() {
        lines.push(render_status_line(
            style,
            "error",
            &format!("no installable plan for {request}"),
        ));
    } else if report.results.iter().all(DependencyPath::is_empty) {
        lines.push(render_status_line(
            style,
            "ok",
            &format!("{request} is already installed"),
        ));
    } else {
        lines.push(render_status_line(
            style,
            "ok",
            &format!("{} plan(s) for {request}", report.results.len()),
        ));
        for (index, path) in report.results.iter().enumerate() {
            lines.extend(format_plan_lines(style, index + 1, path));
        }
    }

    if !report.fail_reasons.is_empty() {
        lines.push(section_header(style, "rejected branches"));
        lines.extend(
            report
                .fail_reasons
                .iter()
                .map(|reason| format!("  - {reason}")),
        );
    }

    for message in report.catalog_messages {
        lines.push(render_status_line(
            style,
            "warn",
            &format!("skipped catalog entry: {message}"),
        ));
    }

    lines
}

pub(crate) fn format_plan_lines(
    style: OutputStyle,
    number: usize,
    path: &DependencyPath,
) -> Vec<String> {
    let mut lines = vec![section_header(style, &format!("plan {number}"))];

    lines.extend(path.nodes.iter().map(|node| format!("  {node}")));
    if !path.install_order.is_empty() {
        lines.push(format!("  install order: {}", path.install_order.join(", ")));
    }
    for choice in &path.lib_choices {
        lines.push(format_lib_choice_line(style, choice));
    }
    lines
}

fn format_lib_choice_line(style: OutputStyle, choice: &LibChoice) -> String {
    let line = format!("  lib {choice}");
    if !choice.conflict {
        return line;
    }
    match style {
        OutputStyle::Plain => format!("{line} (conflict)"),
        OutputStyle::Rich => colorize(conflict_style(), &format!("{line} (conflict)")),
    }
}

pub(crate) fn format_info_lines(id: &str, versions: &[Version]) -> Vec<String> {
    let mut lines = vec![format!("Extension: {id}")];
    lines.extend(versions.iter().map(|version| format!("- {version}")));
    lines
}

pub(crate) fn format_installed_lines(extensions: &[ExtensionMetadata]) -> Vec<String> {
    extensions
        .iter()
        .map(|extension| {
            let mut line = format!("{} {}", extension.id, extension.version);
            if let Some(platform) = &extension.platform {
                line.push_str(&format!(" (platform {platform})"));
            }
            line
        })
        .collect()
}

fn section_header(style: OutputStyle, title: &str) -> String {
    match style {
        OutputStyle::Plain => format!("{title}:"),
        OutputStyle::Rich => colorize(section_style(), &format!("== {title} ==")),
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn conflict_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Yellow.into()))
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
