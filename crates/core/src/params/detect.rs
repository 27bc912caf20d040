use super::kind::ParamKind;
use super::rules::{PLACEHOLDER, RuleMatch, match_mnemonic};
use crate::command::ast::{ArgKind, ParsedCommand};
use scpi_toolchain_catalog::{CommandCatalog, options_from_template};
use scpi_toolchain_diagnostics::Span;
use serde::Serialize;

/// Where an editable parameter sits within its command.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "at", content = "index")]
pub enum ParamPosition {
    /// The i-th header mnemonic.
    Mnemonic(usize),
    /// The i-th argument.
    Argument(usize),
}

/// An editable parameter detected in a parsed command.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EditableParameter {
    /// Position of the parameter within the command.
    pub position: ParamPosition,
    /// Domain kind.
    pub kind: ParamKind,
    /// Current value. For a placeholder token this is the kind's default
    /// option; otherwise the token text as written.
    pub value: String,
    /// Generated valid options. Empty for [`ParamKind::Numeric`].
    pub options: Vec<String>,
    /// Byte span of the token in the original command string, used for
    /// in-place substitution.
    pub span: Span,
}

/// Detect all editable parameters of a parsed command.
///
/// Every mnemonic and every argument is tried against the ordered rule
/// table; the first matching rule classifies the token and synthesizes its
/// option range. Enumeration arguments additionally pull their option list
/// from the catalog's syntax template when a catalog is supplied and knows
/// the command. Quoted and unknown arguments are not editable.
pub fn detect_parameters(
    cmd: &ParsedCommand,
    catalog: Option<&CommandCatalog>,
) -> Vec<EditableParameter> {
    let mut params = Vec::new();

    for (i, mnemonic) in cmd.mnemonics.iter().enumerate() {
        if let Some(m) = match_mnemonic(&mnemonic.text) {
            params.push(from_match(
                ParamPosition::Mnemonic(i),
                &m,
                &mnemonic.text,
                mnemonic.span,
            ));
        }
    }

    for (i, arg) in cmd.args.iter().enumerate() {
        let position = ParamPosition::Argument(i);
        match arg.kind {
            ArgKind::Mnemonic => {
                if let Some(m) = match_mnemonic(&arg.value) {
                    params.push(from_match(position, &m, &arg.value, arg.span));
                }
            }
            ArgKind::Number => params.push(EditableParameter {
                position,
                kind: ParamKind::Numeric,
                value: arg.value.clone(),
                options: Vec::new(),
                span: arg.span,
            }),
            ArgKind::Enumeration => {
                let options = catalog
                    .and_then(|c| c.spec_for_header(&cmd.header))
                    .and_then(|spec| spec.template.as_deref())
                    .map(options_from_template)
                    .filter(|opts| !opts.is_empty())
                    .unwrap_or_else(|| vec![arg.value.clone()]);
                params.push(EditableParameter {
                    position,
                    kind: ParamKind::Enumeration,
                    value: arg.value.clone(),
                    options,
                    span: arg.span,
                });
            }
            ArgKind::Quoted | ArgKind::Unknown => {}
        }
    }

    params
}

fn from_match(
    position: ParamPosition,
    m: &RuleMatch,
    token: &str,
    span: Span,
) -> EditableParameter {
    let value = if m.is_placeholder() {
        m.default_option()
    } else {
        token.to_string()
    };
    EditableParameter {
        position,
        kind: m.rule.kind,
        value,
        options: m.options(),
        span,
    }
}

/// Rewrite one parameter in place within the original command string.
///
/// Only the token's original span is replaced; the rest of the string is
/// byte-identical. Works for placeholder and already-concrete tokens
/// alike, including compound tokens where the edited index sits mid-token,
/// because options always carry the full replacement text.
pub fn substitute(input: &str, param: &EditableParameter, new_value: &str) -> String {
    let start = param.span.start.min(input.len());
    let end = param.span.end.min(input.len()).max(start);
    let mut out = String::with_capacity(input.len() - (end - start) + new_value.len());
    out.push_str(&input[..start]);
    out.push_str(new_value);
    out.push_str(&input[end..]);
    out
}

/// `true` when a token still carries the generic `<x>` wildcard marker.
pub fn is_placeholder_token(token: &str) -> bool {
    token.to_ascii_lowercase().contains(PLACEHOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::parser::parse;

    #[test]
    fn substitute_rewrites_only_the_span() {
        let input = "DISplay:WAVEView1:CH<x>:STATE ON";
        let outcome = parse(input);
        let params = detect_parameters(&outcome.command, None);
        let ch = params
            .iter()
            .find(|p| p.kind == ParamKind::Channel)
            .unwrap();
        assert_eq!(ch.value, "CH1");
        let rewritten = substitute(input, ch, "CH3");
        assert_eq!(rewritten, "DISplay:WAVEView1:CH3:STATE ON");
    }

    #[test]
    fn substitute_mid_token_compound() {
        let input = "BUS:B1:SOUrce CH1_D4";
        let outcome = parse(input);
        let params = detect_parameters(&outcome.command, None);
        let compound = params
            .iter()
            .find(|p| matches!(p.position, ParamPosition::Argument(_)))
            .unwrap();
        assert_eq!(compound.kind, ParamKind::Channel);
        assert_eq!(compound.options.len(), 8);
        let rewritten = substitute(input, compound, "CH1_D7");
        assert_eq!(rewritten, "BUS:B1:SOUrce CH1_D7");
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder_token("CH<x>"));
        assert!(is_placeholder_token("MEAS<X>"));
        assert!(!is_placeholder_token("CH2"));
    }
}
