use std::io::IsTerminal;

use crossterm::style::Stylize;
use humansize::{format_size, BINARY};

use super::{OperationStats, Severity};

const WIDTH: usize = 80;

/// Presentation capability used by the report.
///
/// The report layout is identical for every renderer; only decoration differs.
pub trait Renderer {
    /// Decorate a section heading.
    fn heading(&self, text: &str) -> String;

    /// Decorate a log line for the given severity.
    fn entry(&self, severity: Severity, text: &str) -> String;

    /// Decorate the error banner.
    fn alert(&self, text: &str) -> String;
}

/// Plain text, no escape codes. Always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn heading(&self, text: &str) -> String {
        text.to_string()
    }

    fn entry(&self, _severity: Severity, text: &str) -> String {
        text.to_string()
    }

    fn alert(&self, text: &str) -> String {
        text.to_string()
    }
}

/// ANSI-coloured output for terminals.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyledRenderer;

impl Renderer for StyledRenderer {
    fn heading(&self, text: &str) -> String {
        text.bold().cyan().to_string()
    }

    fn entry(&self, severity: Severity, text: &str) -> String {
        match severity {
            Severity::Info => text.to_string(),
            Severity::Warning => text.yellow().to_string(),
            Severity::Error => text.red().bold().to_string(),
            Severity::Success => text.green().to_string(),
            Severity::Operation => text.blue().to_string(),
        }
    }

    fn alert(&self, text: &str) -> String {
        text.red().bold().to_string()
    }
}

/// Pick the styled renderer only when colour is wanted and stdout is a terminal.
pub fn select_renderer(color: bool) -> Box<dyn Renderer> {
    let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    if color && !no_color_env && std::io::stdout().is_terminal() {
        Box::new(StyledRenderer)
    } else {
        Box::new(PlainRenderer)
    }
}

/// Percentage of `part` over `whole`, or `N/A` when `whole` is zero.
pub fn rate(part: usize, whole: usize) -> String {
    if whole == 0 {
        "N/A".to_string()
    } else {
        format!("{:.1}%", part as f64 / whole as f64 * 100.0)
    }
}

pub(super) fn render(stats: &OperationStats, verbosity: u8, renderer: &dyn Renderer) -> String {
    if verbosity == 0 {
        return String::new();
    }

    let mut out = String::new();
    out.push('\n');
    out.push_str(&"=".repeat(WIDTH));
    out.push('\n');
    out.push_str(&renderer.heading(&center("PROCESSING SUMMARY", WIDTH, ' ')));
    out.push('\n');
    out.push_str(&"=".repeat(WIDTH));
    out.push('\n');

    let sections: [(&str, Vec<(&str, String)>); 3] = [
        (
            "ZIP PROCESSING",
            vec![
                ("Archives Found", stats.archives_seen.to_string()),
                ("Successful", stats.archives_succeeded.to_string()),
                ("Skipped", stats.archives_skipped.to_string()),
                ("Failed", stats.archives_failed.to_string()),
                (
                    "Success Rate",
                    rate(stats.archives_succeeded, stats.archives_seen),
                ),
                ("Data Extracted", format_size(stats.bytes_extracted, BINARY)),
            ],
        ),
        (
            "CLEANING",
            vec![
                ("Files Removed", stats.files_removed.to_string()),
                ("Directories Removed", stats.dirs_removed.to_string()),
                (
                    "Total Cleaned",
                    (stats.files_removed + stats.dirs_removed).to_string(),
                ),
            ],
        ),
        (
            "REORGANIZATION",
            vec![
                ("Examined", stats.dirs_examined.to_string()),
                ("Reorganized", stats.dirs_reorganized.to_string()),
                ("Ignored", stats.dirs_ignored.to_string()),
                ("Reorg Rate", rate(stats.dirs_reorganized, stats.dirs_examined)),
            ],
        ),
    ];

    for (title, rows) in &sections {
        out.push('\n');
        out.push_str(&renderer.heading(title));
        out.push('\n');
        out.push_str(&format_table(rows));
    }

    let errors = stats.error_count();
    if errors > 0 {
        out.push('\n');
        out.push_str(&renderer.heading("ERRORS"));
        out.push('\n');
        for entry in stats.entries(Severity::Error) {
            out.push_str(&renderer.entry(Severity::Error, &format_entry_line(entry)));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&renderer.alert(&"!".repeat(WIDTH)));
        out.push('\n');
        let noun = if errors == 1 { "ERROR" } else { "ERRORS" };
        out.push_str(&renderer.alert(&center(
            &format!("  {} {} ENCOUNTERED  ", errors, noun),
            WIDTH,
            '!',
        )));
        out.push('\n');
        out.push_str(&renderer.alert(&"!".repeat(WIDTH)));
        out.push('\n');
    }

    if verbosity >= 2 {
        if !stats.logs.is_empty() {
            out.push('\n');
            out.push_str(&"-".repeat(WIDTH));
            out.push('\n');
            out.push_str(&renderer.heading(&center("DETAILED OPERATION LOGS", WIDTH, ' ')));
            out.push('\n');
            out.push_str(&"-".repeat(WIDTH));
            out.push('\n');
            for entry in &stats.logs {
                out.push_str(&renderer.entry(entry.severity, &format_entry_line(entry)));
                out.push('\n');
            }
        }

        if !stats.removed.is_empty() {
            out.push('\n');
            out.push_str(&renderer.heading("REMOVED PATHS"));
            out.push('\n');
            for removed in &stats.removed {
                let kind = if removed.is_dir { "dir " } else { "file" };
                out.push_str(&format!("  {}  {}\n", kind, removed.path.display()));
            }
        }
    }

    out
}

fn format_entry_line(entry: &super::LogEntry) -> String {
    match &entry.path {
        Some(path) => format!(
            "{} {} ({})",
            entry.severity.label(),
            entry.message,
            path.display()
        ),
        None => format!("{} {}", entry.severity.label(), entry.message),
    }
}

fn format_table(rows: &[(&str, String)]) -> String {
    let key_width = rows.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    let value_width = rows
        .iter()
        .map(|(_, v)| v.chars().count())
        .max()
        .unwrap_or(0);

    let divider = format!(
        "+{}+{}+\n",
        "-".repeat(key_width + 2),
        "-".repeat(value_width + 2)
    );

    let mut out = divider.clone();
    for (key, value) in rows {
        out.push_str(&format!(
            "| {:<kw$} | {:>vw$} |\n",
            key,
            value,
            kw = key_width,
            vw = value_width
        ));
    }
    out.push_str(&divider);
    out
}

fn center(text: &str, width: usize, fill: char) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!(
        "{}{}{}",
        fill.to_string().repeat(left),
        text,
        fill.to_string().repeat(right)
    )
}
