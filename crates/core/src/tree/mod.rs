//! Flat command ⇄ hierarchical command-tree conversion.
//!
//! Command-tree backends expose an instrument as a nested object tree
//! (`device.commands.acquire.state`) instead of accepting raw strings.
//! [`to_tree_path`] maps a parsed flat command onto that tree;
//! [`from_tree_path`] maps a dotted path back to a flat command string. The
//! two directions are structurally inverse for commands without ambiguous
//! casing.

use crate::command::ast::ParsedCommand;
use serde::Serialize;

/// Access method resolved for a command-tree path.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TreeMethod {
    /// Write the carried value.
    Write,
    /// Read back the current value. Commands without an argument value are
    /// modeled as getters, so this also covers argument-less non-queries.
    Query,
    /// Write the carried value, then read back and compare.
    Verify,
}

/// One path segment: a plain name or an indexed access.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", untagged)]
pub enum TreeSegment {
    /// Plain attribute access (`acquire`).
    Name(String),
    /// Indexed attribute access (`ch[1]`).
    Indexed {
        /// Attribute name (`ch`).
        name: String,
        /// Index value (`1`).
        index: u32,
    },
}

impl std::fmt::Display for TreeSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeSegment::Name(n) => write!(f, "{n}"),
            TreeSegment::Indexed { name, index } => write!(f, "{name}[{index}]"),
        }
    }
}

/// A command resolved onto the hierarchical object tree.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommandTreePath {
    /// Ordered path segments, root first.
    pub segments: Vec<TreeSegment>,
    /// Resolved access method.
    pub method: TreeMethod,
    /// Carried value for write/verify methods.
    pub value: Option<String>,
}

impl CommandTreePath {
    /// Dotted attribute path (`"acquire.state"`, `"ch[1].scale"`).
    pub fn dotted(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Convert a parsed flat command to its command-tree path.
///
/// Every header segment is lower-cased; segments of the shape
/// letters-then-digits become indexed accesses (`CH1` → `ch[1]`). The method
/// is `Query` for `?` commands and for argument-less commands (getters),
/// `Write` otherwise, with multiple arguments re-joined by commas into one
/// carried value.
pub fn to_tree_path(cmd: &ParsedCommand) -> CommandTreePath {
    let segments = cmd
        .mnemonics
        .iter()
        .map(|m| to_segment(&m.text))
        .collect::<Vec<_>>();

    let value = if cmd.args.is_empty() {
        None
    } else {
        Some(
            cmd.args
                .iter()
                .map(|a| a.value.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    };

    let (method, value) = if cmd.query {
        (TreeMethod::Query, None)
    } else {
        match value {
            Some(v) => (TreeMethod::Write, Some(v)),
            None => (TreeMethod::Query, None),
        }
    };

    CommandTreePath {
        segments,
        method,
        value,
    }
}

fn to_segment(mnemonic: &str) -> TreeSegment {
    let lower = mnemonic.to_ascii_lowercase();
    let digit_at = lower.find(|c: char| c.is_ascii_digit());
    if let Some(at) = digit_at
        && at > 0
        && lower[..at].chars().all(|c| c.is_ascii_alphabetic())
        && lower[at..].chars().all(|c| c.is_ascii_digit())
        && let Ok(index) = lower[at..].parse::<u32>()
    {
        return TreeSegment::Indexed {
            name: lower[..at].to_string(),
            index,
        };
    }
    TreeSegment::Name(lower)
}

/// Convert a dotted tree path back to a flat command string.
///
/// `path` may carry a tree-root prefix (`"commands."`), which is stripped.
/// Segments are upper-cased and indexed accesses collapse back to
/// letters+digits (`ch[1]` → `CH1`). Query and verify methods append `?`;
/// write methods append the value after a space.
pub fn from_tree_path(path: &str, method: TreeMethod, value: Option<&str>) -> String {
    let path = path.strip_prefix("commands.").unwrap_or(path);
    let header = path
        .split('.')
        .filter(|s| !s.is_empty())
        .map(segment_to_mnemonic)
        .collect::<Vec<_>>()
        .join(":");

    match method {
        TreeMethod::Query | TreeMethod::Verify => format!("{header}?"),
        TreeMethod::Write => match value {
            Some(v) => format!("{header} {v}"),
            None => header,
        },
    }
}

fn segment_to_mnemonic(segment: &str) -> String {
    let upper = segment.to_ascii_uppercase();
    if let Some(open) = upper.find('[')
        && let Some(stripped) = upper.strip_suffix(']')
    {
        let (name, index) = stripped.split_at(open);
        return format!("{name}{}", &index[1..]);
    }
    upper
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::parser::parse;

    #[test]
    fn write_command_maps_to_tree_write() {
        let cmd = parse("ACQuire:STATE ON").command;
        let path = to_tree_path(&cmd);
        assert_eq!(path.dotted(), "acquire.state");
        assert_eq!(path.method, TreeMethod::Write);
        assert_eq!(path.value.as_deref(), Some("ON"));
    }

    #[test]
    fn query_command_maps_to_tree_query() {
        let cmd = parse("MEASUrement:MEAS1:VALue?").command;
        let path = to_tree_path(&cmd);
        assert_eq!(path.dotted(), "measurement.meas[1].value");
        assert_eq!(path.method, TreeMethod::Query);
        assert!(path.value.is_none());
    }

    #[test]
    fn argument_less_command_is_a_getter() {
        let cmd = parse("ACQuire:STATE").command;
        let path = to_tree_path(&cmd);
        assert_eq!(path.method, TreeMethod::Query);
    }

    #[test]
    fn indexed_segment_notation() {
        let cmd = parse("CH1:SCAle 0.5").command;
        let path = to_tree_path(&cmd);
        assert_eq!(path.dotted(), "ch[1].scale");
        assert_eq!(path.value.as_deref(), Some("0.5"));
    }

    #[test]
    fn reverse_write() {
        assert_eq!(
            from_tree_path("commands.acquire.state", TreeMethod::Write, Some("ON")),
            "ACQUIRE:STATE ON"
        );
    }

    #[test]
    fn reverse_query_and_verify_append_question_mark() {
        assert_eq!(
            from_tree_path("ch[2].scale", TreeMethod::Query, None),
            "CH2:SCALE?"
        );
        assert_eq!(
            from_tree_path("ch[2].scale", TreeMethod::Verify, Some("0.5")),
            "CH2:SCALE?"
        );
    }

    #[test]
    fn directions_are_inverse_for_unambiguous_casing() {
        let original = "ACQUIRE:STATE ON";
        let cmd = parse(original).command;
        let path = to_tree_path(&cmd);
        let back = from_tree_path(&path.dotted(), path.method, path.value.as_deref());
        assert_eq!(back, original);

        let query = "CH3:SCALE?";
        let cmd = parse(query).command;
        let path = to_tree_path(&cmd);
        let back = from_tree_path(&path.dotted(), path.method, path.value.as_deref());
        assert_eq!(back, query);
    }
}
