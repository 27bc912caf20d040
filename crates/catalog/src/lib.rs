//! SCPI command metadata catalog.
//!
//! Defines the data structures for per-command metadata extracted offline
//! from programmer manuals: header string, declared syntax template with
//! option braces, argument descriptors, and command group. The catalog is
//! deserialized from JSON and consumed by the structural parser, the
//! parameter detector, and the UI-facing parameter-extraction helper.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Current format version for the catalog JSON schema.
pub const CATALOG_FORMAT_VERSION: &str = "0.2.0";

/// Functional group a command belongs to, as declared in the manual.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum CommandGroup {
    /// Waveform acquisition control.
    Acquisition,
    /// Trigger system configuration.
    Trigger,
    /// Automatic measurement subsystem.
    Measurement,
    /// Vertical (channel) settings.
    Vertical,
    /// Horizontal/timebase settings.
    Horizontal,
    /// Display and annotation settings.
    Display,
    /// Cursor readouts.
    Cursor,
    /// Source output configuration (SMU/PSU).
    Source,
    /// Output relay/state control.
    Output,
    /// Measurement sense configuration (SMU/DMM).
    Sense,
    /// Status and event reporting.
    Status,
    /// Instrument-wide system commands.
    System,
    /// Anything the extractor could not categorize.
    Misc,
}

impl std::fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CommandGroup::Acquisition => "acquisition",
            CommandGroup::Trigger => "trigger",
            CommandGroup::Measurement => "measurement",
            CommandGroup::Vertical => "vertical",
            CommandGroup::Horizontal => "horizontal",
            CommandGroup::Display => "display",
            CommandGroup::Cursor => "cursor",
            CommandGroup::Source => "source",
            CommandGroup::Output => "output",
            CommandGroup::Sense => "sense",
            CommandGroup::Status => "status",
            CommandGroup::System => "system",
            CommandGroup::Misc => "misc",
        };
        write!(f, "{s}")
    }
}

/// Descriptor for a single command argument, as declared in the manual.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgDescriptor {
    /// Parameter name from the syntax template (e.g., `"NR1"`, `"QString"`).
    pub name: String,
    /// Declared type keyword (`"enum"`, `"number"`, `"string"`, ...).
    #[serde(rename = "type")]
    pub arg_type: String,
    /// Free-text description, when the extractor captured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Catalog entry for one command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    /// Canonical header in manual casing (e.g., `"ACQuire:STATE"`).
    pub header: String,
    /// Declared syntax template including option braces, e.g.
    /// `"ACQuire:STATE {OFF|ON|RUN|STOP|<NR1>}"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Command group from the manual's chapter structure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<CommandGroup>,
    /// Ordered argument descriptors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgDescriptor>,
}

/// Top-level container for all command metadata.
///
/// Deserialized from the JSON produced by the offline extraction pipeline.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandCatalog {
    /// Catalog schema version (e.g., `"0.2.0"`).
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// All known command entries.
    pub commands: Vec<CommandSpec>,

    /// Lazily-built header index. Headers are stored under their normalized
    /// form so `CH1:SCAle`, `CH2:SCALE`, and the template `CH<x>:SCAle` all
    /// resolve to the same entry.
    #[serde(skip)]
    header_index: OnceLock<HashMap<String, usize>>,
}

fn default_format_version() -> String {
    CATALOG_FORMAT_VERSION.to_string()
}

impl CommandCatalog {
    /// Build a catalog from parts (mostly used by tests).
    pub fn new(commands: Vec<CommandSpec>) -> Self {
        Self {
            format_version: default_format_version(),
            commands,
            header_index: OnceLock::new(),
        }
    }

    /// Parse a catalog from its JSON serialization.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Look up the catalog entry for a command header, if present.
    ///
    /// Matching is case-insensitive and ignores per-mnemonic index digits
    /// and `<x>` placeholders, so a concrete header from a live command
    /// matches the templated header in the manual.
    pub fn spec_for_header(&self, header: &str) -> Option<&CommandSpec> {
        let idx = self.header_index.get_or_init(|| {
            let mut map = HashMap::with_capacity(self.commands.len());
            for (i, spec) in self.commands.iter().enumerate() {
                map.entry(normalize_header(&spec.header)).or_insert(i);
            }
            map
        });
        idx.get(&normalize_header(header))
            .map(|&i| &self.commands[i])
    }

    /// Number of entries in the catalog.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// `true` when the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Clone for CommandCatalog {
    fn clone(&self) -> Self {
        Self {
            format_version: self.format_version.clone(),
            commands: self.commands.clone(),
            header_index: OnceLock::new(),
        }
    }
}

/// Normalize a header for index lookup: uppercase every mnemonic and strip
/// trailing index digits and wildcard markers (`CH1` → `CH`, `CH<x>` → `CH`).
pub fn normalize_header(header: &str) -> String {
    header
        .split(':')
        .map(normalize_mnemonic)
        .collect::<Vec<_>>()
        .join(":")
}

fn normalize_mnemonic(mnemonic: &str) -> String {
    let upper = mnemonic.to_ascii_uppercase();
    let trimmed = upper.trim_end_matches("<X>");
    let trimmed = trimmed.trim_end_matches(|c: char| c.is_ascii_digit());
    trimmed.to_string()
}

/// Expand the option braces of a syntax template into a concrete option list.
///
/// `"{OFF|ON|RUN|STOP|<NR1>}"` yields `["OFF", "ON", "RUN", "STOP"]`:
/// angle-bracketed numeric placeholders are not enumerable options and are
/// dropped. Returns an empty list when the template carries no braces.
pub fn options_from_template(template: &str) -> Vec<String> {
    let Some(open) = template.find('{') else {
        return Vec::new();
    };
    let Some(close) = template[open..].find('}') else {
        return Vec::new();
    };
    template[open + 1..open + close]
        .split('|')
        .map(str::trim)
        .filter(|opt| !opt.is_empty() && !opt.starts_with('<'))
        .map(str::to_string)
        .collect()
}
