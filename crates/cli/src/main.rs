mod render;

use std::fs;

use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scpi_toolchain_catalog::CommandCatalog;
use scpi_toolchain_compiler::{DeviceRegistry, Program, compile};
use scpi_toolchain_core::{
    Dialect, TreeMethod, detect_parameters, from_tree_path, parse, parse_with_dialect,
    to_tree_path,
};
use scpi_toolchain_diagnostics::{self as diag, Diagnostic, Severity};

use crate::render::{Format, print_summary, render_diagnostics};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "scpi",
    version,
    about = "SCPI toolchain — parse instrument commands and compile block programs to Python"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile a block-program JSON file into a Python automation script.
    Compile {
        /// Path to the program JSON (as exported by the editor).
        program: String,
        /// Path to the device registry JSON.
        #[arg(long)]
        devices: String,
        /// Write the script to a file instead of stdout.
        #[arg(long, short)]
        out: Option<String>,
    },

    // ── Command analysis (parse → params → tree) ────────────────────
    /// Parse one SCPI command string and print its structure.
    Parse {
        command: String,
        /// Argument-separation dialect of the instrument family.
        #[arg(long, value_enum, default_value_t = DialectArg::Space)]
        dialect: DialectArg,
    },

    /// Detect the editable parameters of one SCPI command.
    Params {
        command: String,
        /// Path to a command-catalog JSON for enumeration option lists.
        #[arg(long)]
        catalog: Option<String>,
    },

    /// Map one SCPI command onto its command-tree path.
    Tree { command: String },

    /// Map a dotted command-tree path back to a flat SCPI command.
    FromTree {
        path: String,
        #[arg(long, value_enum, default_value_t = Method::Query)]
        method: Method,
        /// Carried value for write methods.
        #[arg(long)]
        value: Option<String>,
    },

    /// Explain a diagnostic ID (e.g. SCPI2101).
    Explain { id: String },
}

/// Tree access method for the `from-tree` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Method {
    Write,
    Query,
    Verify,
}

/// Argument-separation dialect for the `parse` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DialectArg {
    /// Header separated by whitespace, arguments by commas (conventional).
    Space,
    /// Header separated from arguments by the first comma (legacy).
    Comma,
}

impl From<DialectArg> for Dialect {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Space => Dialect::SpaceThenComma,
            DialectArg::Comma => Dialect::CommaOnly,
        }
    }
}

impl From<Method> for TreeMethod {
    fn from(m: Method) -> Self {
        match m {
            Method::Write => TreeMethod::Write,
            Method::Query => TreeMethod::Query,
            Method::Verify => TreeMethod::Verify,
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match cli.cmd {
        Cmd::Compile {
            program,
            devices,
            out,
        } => cmd_compile(&program, &devices, out.as_deref(), format)?,
        Cmd::Parse { command, dialect } => cmd_parse(&command, dialect.into(), format)?,
        Cmd::Params { command, catalog } => cmd_params(&command, catalog.as_deref(), format)?,
        Cmd::Tree { command } => cmd_tree(&command, format)?,
        Cmd::FromTree {
            path,
            method,
            value,
        } => cmd_from_tree(&path, method, value.as_deref()),
        Cmd::Explain { id } => cmd_explain(&id, format)?,
    }

    Ok(())
}

// ── Commands ────────────────────────────────────────────────────────────

fn cmd_compile(
    program_path: &str,
    devices_path: &str,
    out: Option<&str>,
    format: Format,
) -> Result<()> {
    let program_text = fs::read_to_string(program_path)
        .with_context(|| format!("failed to read program file '{program_path}'"))?;
    let devices_text = fs::read_to_string(devices_path)
        .with_context(|| format!("failed to read device registry '{devices_path}'"))?;
    let program = Program::from_json(&program_text).context("invalid program JSON")?;
    let registry = DeviceRegistry::from_json(&devices_text).context("invalid device registry JSON")?;

    match compile(&program, &registry) {
        Ok(script) => match out {
            Some(path) => {
                fs::write(path, &script)
                    .with_context(|| format!("failed to write '{path}'"))?;
                eprintln!("wrote {path}");
            }
            None => print!("{script}"),
        },
        Err(err) => {
            let code = err.code();
            match format {
                Format::Json => {
                    let out = serde_json::json!({
                        "ok": false,
                        "code": code,
                        "error": err.to_string(),
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                Format::Pretty => {
                    eprintln!("error[{code}]: {err}");
                    if let Some(explanation) = diag::explain(code) {
                        eprintln!("  = help: {explanation}");
                    }
                }
            }
            process::exit(1);
        }
    }
    Ok(())
}

fn cmd_parse(command: &str, dialect: Dialect, format: Format) -> Result<()> {
    let res = parse_with_dialect(command, dialect);

    match format {
        Format::Json => {
            // Single valid JSON object to stdout.
            let out = serde_json::json!({
                "command": res.command,
                "diagnostics": res.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // Structure to stdout, diagnostics to stderr.
            println!("{}", serde_json::to_string_pretty(&res.command)?);
            if !res.diagnostics.is_empty() {
                render_diagnostics(command, &res.diagnostics, format);
                print_summary(&res.diagnostics);
            }
        }
    }

    exit_on_errors(&res.diagnostics);
    Ok(())
}

fn cmd_params(command: &str, catalog_path: Option<&str>, format: Format) -> Result<()> {
    let catalog = match catalog_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog file '{path}'"))?;
            Some(CommandCatalog::from_json(&text).context("invalid catalog JSON")?)
        }
        None => None,
    };

    let res = parse(command);
    let params = detect_parameters(&res.command, catalog.as_ref());

    match format {
        Format::Json => {
            let out = serde_json::json!({
                "parameters": params,
                "diagnostics": res.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            for p in &params {
                println!("{:?} {} '{}' options={:?}", p.position, p.kind, p.value, p.options);
            }
            if !res.diagnostics.is_empty() {
                render_diagnostics(command, &res.diagnostics, format);
                print_summary(&res.diagnostics);
            }
        }
    }

    exit_on_errors(&res.diagnostics);
    Ok(())
}

fn cmd_tree(command: &str, format: Format) -> Result<()> {
    let res = parse(command);
    let path = to_tree_path(&res.command);

    match format {
        Format::Json => {
            let out = serde_json::json!({
                "dotted": path.dotted(),
                "path": path,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            let dotted = path.dotted();
            match (&path.method, &path.value) {
                (TreeMethod::Write, Some(v)) => println!("commands.{dotted}.write(\"{v}\")"),
                _ => println!("commands.{dotted}.query()"),
            }
        }
    }

    exit_on_errors(&res.diagnostics);
    Ok(())
}

fn cmd_from_tree(path: &str, method: Method, value: Option<&str>) {
    println!("{}", from_tree_path(path, method.into(), value));
}

fn cmd_explain(id: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let text = diag::explain(id);
            let out = serde_json::json!({
                "id": id,
                "explanation": text,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            // Explanation is the expected output — write to stdout, not stderr.
            if let Some(text) = diag::explain(id) {
                use ariadne::Fmt;
                println!("{}: {}", id.fg(ariadne::Color::Cyan), text);
            } else {
                println!("{id}: (no explanation available)");
            }
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Exit with code 1 if any diagnostic is an error.
/// Warnings and info do not cause a non-zero exit.
fn exit_on_errors(diagnostics: &[Diagnostic]) {
    if diagnostics
        .iter()
        .any(|d| matches!(d.severity, Severity::Error))
    {
        process::exit(1);
    }
}
