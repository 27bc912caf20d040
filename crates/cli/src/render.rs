//! Diagnostic output for the `scpi` binary.
//!
//! Every analysis subcommand takes a single command string as its source,
//! so reports are rendered against that one line under a fixed origin.
//! Pretty output (ariadne) goes to stderr and keeps the structured result
//! on stdout clean; JSON output is an array on stdout.

use std::io::{self, IsTerminal};

use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use scpi_toolchain_diagnostics::{Diagnostic, Severity};

/// Origin name shown in reports; the source is always a CLI argument.
const ORIGIN: &str = "<command>";

/// Output format, selected with `--output` or inferred from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Coloured, source-annotated output (ariadne).
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Resolve an explicit `--output` value, defaulting to pretty on a TTY
    /// and JSON on a pipe.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ if io::stdout().is_terminal() => Format::Pretty,
            _ => Format::Json,
        }
    }
}

fn styling(severity: Severity) -> (ReportKind<'static>, Color) {
    match severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warn => (ReportKind::Warning, Color::Yellow),
        Severity::Info => (ReportKind::Advice, Color::Blue),
    }
}

/// Render the advisory diagnostics of one command string.
pub(crate) fn render_diagnostics(command: &str, diagnostics: &[Diagnostic], format: Format) {
    if diagnostics.is_empty() {
        return;
    }
    match format {
        Format::Json => {
            if let Ok(json) = serde_json::to_string_pretty(diagnostics) {
                println!("{json}");
            }
        }
        Format::Pretty => {
            for diag in diagnostics {
                render_one(command, diag);
            }
        }
    }
}

fn render_one(command: &str, diag: &Diagnostic) {
    let (kind, color) = styling(diag.severity);
    let note = diag
        .context
        .as_ref()
        .filter(|ctx| !ctx.is_empty())
        .map(|ctx| {
            ctx.iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ")
        });

    let Some(span) = &diag.span else {
        // No span to underline; plain message form.
        eprintln!("{diag}");
        if let Some(note) = &note {
            eprintln!("  = note: {note}");
        }
        if let Some(help) = diag.explain() {
            eprintln!("  = help: {help}");
        }
        return;
    };

    // Mid-edit input can carry spans past the trimmed source end.
    let start = span.start.min(command.len());
    let end = span.end.clamp(start, command.len());

    let mut report = Report::build(kind, (ORIGIN, start..end))
        .with_code(diag.id.as_ref())
        .with_message(&diag.message)
        .with_label(
            Label::new((ORIGIN, start..end))
                .with_message(note.as_deref().unwrap_or(&diag.message))
                .with_color(color),
        );
    if let Some(help) = diag.explain() {
        report = report.with_help(help);
    }
    report
        .finish()
        .eprint((ORIGIN, Source::from(command)))
        .ok();
}

/// One-line severity tally after the reports, e.g. `1 warning, 2 info`.
pub(crate) fn print_summary(diagnostics: &[Diagnostic]) {
    let count =
        |s: Severity| diagnostics.iter().filter(|d| d.severity == s).count();
    let buckets = [
        (count(Severity::Error), "error", "errors", Color::Red),
        (count(Severity::Warn), "warning", "warnings", Color::Yellow),
        (count(Severity::Info), "info", "info", Color::Blue),
    ];

    let parts: Vec<String> = buckets
        .into_iter()
        .filter(|(n, ..)| *n > 0)
        .map(|(n, one, many, color)| {
            let word = if n == 1 { one } else { many };
            format!("{}", format!("{n} {word}").fg(color))
        })
        .collect();
    if !parts.is_empty() {
        eprintln!("{}", parts.join(", "));
    }
}
