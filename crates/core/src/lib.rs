//! SCPI toolchain core library.
//!
//! Provides the three building blocks the program compiler depends on:
//! structural parsing of SCPI command strings ([`command`]), classification
//! of mnemonics and arguments into editable parameters ([`params`]), and
//! bidirectional conversion between flat command strings and hierarchical
//! command-tree paths ([`tree`]).
//!
//! The parse and detect entry points are also consumed directly by the
//! command-browsing UI for live parameter editing; that path never writes
//! shared state and never fails on malformed input.

#![warn(missing_docs)]

/// SCPI command structure: lexer, parser, and the parsed-command model.
pub mod command;
/// Mnemonic and argument parameter detection with domain-typed option sets.
pub mod params;
/// Flat command ⇄ hierarchical command-tree path conversion.
pub mod tree;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

// Parser
pub use command::parser::{Dialect, ParseOutcome, parse, parse_with_dialect};

// Parsed-command model
pub use command::ast::{ArgKind, Argument, Mnemonic, ParsedCommand};

// Parameter detection
pub use params::detect::{EditableParameter, ParamPosition, detect_parameters, substitute};
pub use params::kind::ParamKind;

// Command tree
pub use tree::{CommandTreePath, TreeMethod, TreeSegment, from_tree_path, to_tree_path};

// Diagnostics (re-exported from the diagnostics crate)
pub use scpi_toolchain_diagnostics::{Diagnostic, Severity, Span, codes};
