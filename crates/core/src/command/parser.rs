use super::ast::{ArgKind, Argument, Mnemonic, ParsedCommand};
use super::lexer::{find_unquoted, tokenize_args};
use crate::params::rules::looks_indexed;
use scpi_toolchain_diagnostics::{Diagnostic, Span, codes};

/// Shorthand for building a `BTreeMap<String, String>` context from key-value pairs.
macro_rules! ctx {
    ($($k:expr => $v:expr),+ $(,)?) => {
        std::collections::BTreeMap::from([$(($k.into(), $v.into())),+])
    };
}

/// Argument-separation dialect of the instrument family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// Header separated from arguments by the first unquoted whitespace,
    /// arguments comma-separated (conventional SCPI).
    #[default]
    SpaceThenComma,
    /// Header separated from arguments by the first unquoted comma (used by
    /// a handful of legacy single-line dialects).
    CommaOnly,
}

/// Result of structurally parsing one command string.
///
/// This path never fails: malformed or mid-edit input produces a best-effort
/// [`ParsedCommand`] plus advisory diagnostics.
#[derive(Debug, serde::Serialize)]
pub struct ParseOutcome {
    /// The parsed command structure.
    pub command: ParsedCommand,
    /// Advisory diagnostics (never above `Warn` severity).
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a command string using the conventional SCPI dialect.
pub fn parse(input: &str) -> ParseOutcome {
    parse_with_dialect(input, Dialect::default())
}

/// Parse a command string with an explicit separation dialect.
pub fn parse_with_dialect(input: &str, dialect: Dialect) -> ParseOutcome {
    let mut diagnostics = Vec::new();

    // Work on a whitespace-trimmed view; spans stay valid against `input`
    // because the leading offset is tracked explicitly.
    let trimmed_len = input.trim_end().len();
    let lead = trimmed_len - input[..trimmed_len].trim_start().len();
    let body = &input[lead..trimmed_len];

    // Query flag: a trailing `?` on the whole command.
    let (body, query_at_end) = match body.strip_suffix('?') {
        Some(rest) => (rest, true),
        None => (body, false),
    };

    // Leading colon marks an absolute header path.
    let (body, leading_colon) = match body.strip_prefix(':') {
        Some(rest) => (rest, true),
        None => (body, false),
    };
    let head_start = lead + usize::from(leading_colon);

    // Split header from the argument remainder.
    let split = match dialect {
        Dialect::SpaceThenComma => find_unquoted(body, |c| c.is_ascii_whitespace()),
        Dialect::CommaOnly => find_unquoted(body, |c| c == ','),
    };
    let (head, rest, rest_offset) = match split {
        Some(at) => (&body[..at], &body[at + 1..], head_start + at + 1),
        None => (body, "", head_start + body.len()),
    };

    // A `?` glued to the header also marks a query, even when arguments
    // follow (frequent while a query is being edited into a setter).
    let (head, query) = match head.strip_suffix('?') {
        Some(h) => (h, true),
        None => (head, query_at_end),
    };

    let mnemonics = split_mnemonics(head, head_start);
    if mnemonics.is_empty() {
        diagnostics.push(Diagnostic::info(
            codes::PARSE_EMPTY_HEADER,
            "command has no header mnemonics",
            Some(Span::new(0, trimmed_len)),
        ));
    }
    let header = mnemonics
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join(":");

    let args = classify_args(rest, rest_offset, &mut diagnostics);

    ParseOutcome {
        command: ParsedCommand {
            header,
            mnemonics,
            args,
            query,
            leading_colon,
        },
        diagnostics,
    }
}

/// Split a header on `:` into spanned mnemonics, skipping empty segments
/// produced by doubled or trailing colons.
fn split_mnemonics(head: &str, base: usize) -> Vec<Mnemonic> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    for seg in head.split(':') {
        if !seg.is_empty() {
            out.push(Mnemonic {
                text: seg.to_string(),
                span: Span::new(base + offset, base + offset + seg.len()),
            });
        }
        offset += seg.len() + 1;
    }
    out
}

/// Tokenize and classify the argument remainder.
///
/// Classification priority: quoted string → indexed mnemonic → number →
/// bare-word enumeration → unknown fallback.
fn classify_args(rest: &str, base: usize, diagnostics: &mut Vec<Diagnostic>) -> Vec<Argument> {
    let mut args = Vec::new();
    for tok in tokenize_args(rest, base) {
        let span = Span::new(tok.start, tok.end);
        let kind = if tok.quoted {
            if !tok.terminated {
                diagnostics.push(
                    Diagnostic::warn(
                        codes::PARSE_UNTERMINATED_STRING,
                        "quoted argument is missing its closing quote",
                        Some(span),
                    )
                    .with_context(ctx!("value" => tok.text)),
                );
            }
            ArgKind::Quoted
        } else if looks_indexed(tok.text) {
            ArgKind::Mnemonic
        } else if is_numeric(tok.text) {
            ArgKind::Number
        } else if is_bare_word(tok.text) {
            ArgKind::Enumeration
        } else {
            diagnostics.push(
                Diagnostic::info(
                    codes::PARSE_UNKNOWN_TOKEN,
                    format!("could not classify argument '{}'", tok.text),
                    Some(span),
                )
                .with_context(ctx!("value" => tok.text)),
            );
            ArgKind::Unknown
        };
        args.push(Argument {
            value: tok.text.to_string(),
            kind,
            span,
        });
    }
    args
}

/// Numeric test covering integers, decimals, and scientific notation.
///
/// The first character must look numeric so words `f64` happens to accept
/// (`inf`, `NaN`) stay classified as enumerations.
fn is_numeric(s: &str) -> bool {
    let starts_numeric = s
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == '.');
    starts_numeric && s.parse::<f64>().is_ok()
}

fn is_bare_word(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
