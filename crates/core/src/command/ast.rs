use serde::{Deserialize, Serialize};
use scpi_toolchain_diagnostics::Span;

/// Classification of a command argument, inferred during parsing.
///
/// Classification is attempted in fixed priority order: quoted string →
/// indexed mnemonic → number → enumeration → unknown. Malformed tokens
/// degrade to [`ArgKind::Unknown`] instead of failing the parse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    /// A quoted string literal (`"FILE.CSV"`).
    Quoted,
    /// An indexed-mnemonic value used as an argument (`CH1`, `REF2`).
    Mnemonic,
    /// A numeric value, including scientific notation (`2.5E-3`).
    Number,
    /// A bare-word enumeration value (`ON`, `RUNSTop`).
    Enumeration,
    /// Anything that could not be classified (often a mid-edit fragment).
    Unknown,
}

/// A single command argument with its inferred kind and source span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Argument {
    /// Raw argument text, quotes included for [`ArgKind::Quoted`].
    pub value: String,
    /// Inferred classification.
    pub kind: ArgKind,
    /// Byte span of this argument in the original command string.
    pub span: Span,
}

/// One colon-separated header segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mnemonic {
    /// Mnemonic text as written (`ACQuire`, `CH1`).
    pub text: String,
    /// Byte span of this mnemonic in the original command string.
    pub span: Span,
}

/// A structurally parsed SCPI command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The full header (mnemonics joined by `:`), without the query `?` and
    /// without a leading colon.
    pub header: String,
    /// Ordered header mnemonics with spans.
    pub mnemonics: Vec<Mnemonic>,
    /// Ordered arguments with spans.
    pub args: Vec<Argument>,
    /// `true` when the command ended in `?`.
    pub query: bool,
    /// `true` when the command started with `:` (absolute path form).
    pub leading_colon: bool,
}

impl ParsedCommand {
    /// Rebuild a command string from the parsed structure.
    ///
    /// Header and argument remainder are space-joined; multiple arguments
    /// are comma-joined, matching the conventional SCPI layout. For
    /// commands parsed from that layout this is an exact inverse.
    pub fn reconstruct(&self) -> String {
        let mut out = String::new();
        if self.leading_colon {
            out.push(':');
        }
        out.push_str(&self.header);
        if self.query {
            out.push('?');
        }
        if !self.args.is_empty() {
            out.push(' ');
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&arg.value);
            }
        }
        out
    }
}

impl std::fmt::Display for ParsedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reconstruct())
    }
}
