//! Compile passes that surround code synthesis.
//!
//! Validation runs in a fixed order: the capability pre-pass walks the whole
//! tree before a single line is emitted, synthesis performs its inline checks
//! (resource collisions, device resolution, class mismatches), and the usage
//! passes run over the finished session state. Any failure aborts the whole
//! compile.

use crate::error::CompileError;
use crate::ir::{BlockNode, NodeIndex, NodeKind, Program};
use crate::registry::{DeviceClass, DeviceRegistry};
use crate::session::ContextCursor;
use scpi_toolchain_core::parse;

/// Structural facts gathered while walking the tree, consumed by the
/// emitter's prologue.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Facts {
    /// At least one delay block: `import time` is needed.
    pub uses_time: bool,
    /// At least one connect to a raw-protocol backend.
    pub any_raw: bool,
    /// At least one connect to a command-tree backend.
    pub any_tree: bool,
}

/// Walk the program before emission and reject blocks the resolved backend
/// cannot execute. Also collects [`Facts`] so the prologue knows which
/// imports and managers to emit.
pub(crate) fn check_capabilities(
    program: &Program,
    registry: &DeviceRegistry,
    index: &NodeIndex<'_>,
) -> Result<Facts, CompileError> {
    let mut facts = Facts::default();
    let mut cursor = ContextCursor::new(index);
    if let Some(body) = &program.body {
        check_list(body, registry, &mut cursor, &mut facts)?;
    }
    Ok(facts)
}

fn check_list(
    head: &BlockNode,
    registry: &DeviceRegistry,
    cursor: &mut ContextCursor<'_>,
    facts: &mut Facts,
) -> Result<(), CompileError> {
    for node in head.iter_list() {
        check_node(node, registry, cursor, facts)?;
        cursor.observe(node);
        for slot in node.statements.values() {
            check_list(slot, registry, cursor, facts)?;
        }
    }
    Ok(())
}

fn check_node(
    node: &BlockNode,
    registry: &DeviceRegistry,
    cursor: &mut ContextCursor<'_>,
    facts: &mut Facts,
) -> Result<(), CompileError> {
    match node.kind {
        NodeKind::Delay => facts.uses_time = true,
        NodeKind::Connect => {
            if let Some(binding) = node.field("NAME").and_then(|n| registry.get(n)) {
                if binding.backend.is_tree() {
                    facts.any_tree = true;
                } else {
                    facts.any_raw = true;
                }
            }
        }
        _ => {}
    }

    let query_shape = match node.kind {
        NodeKind::QueryInto => Some("query block"),
        NodeKind::WaitComplete => Some("wait-for-complete block"),
        // Parse rather than string-match: a `?` glued to the header is a
        // query even when arguments follow, and the emitter will send it
        // through the read path.
        NodeKind::Command => node
            .field("COMMAND")
            .filter(|c| parse(c).command.query)
            .map(|_| "query command"),
        _ => None,
    };
    let Some(shape) = query_shape else {
        return Ok(());
    };

    // Unknown aliases and missing contexts are reported by synthesis; this
    // pass only rules on backends it can actually resolve.
    let Some(alias) = cursor.resolve(node) else {
        return Ok(());
    };
    if let Some(binding) = registry.get(&alias)
        && !binding.backend.supports_query()
    {
        return Err(CompileError::CapabilityViolation {
            node: shape.to_string(),
            alias: binding.alias.clone(),
            backend: binding.backend,
        });
    }
    Ok(())
}

/// Instrument classes a subsystem prefix is compatible with. The first
/// entry is the representative class used in error messages.
struct ImpliedRule {
    prefixes: &'static [&'static str],
    classes: &'static [DeviceClass],
}

const IMPLIED_RULES: &[ImpliedRule] = &[
    ImpliedRule {
        prefixes: &[
            "MEASU", "ACQ", "CURS", "HOR", "DISP", "CH", "MATH", "REF", "BUS", "ZOO", "SEAR",
            "MASK", "HIS",
        ],
        classes: &[DeviceClass::Oscilloscope],
    },
    ImpliedRule {
        prefixes: &["SOUR", "SENS"],
        classes: &[
            DeviceClass::SourceMeasureUnit,
            DeviceClass::PowerSupply,
            DeviceClass::FunctionGenerator,
            DeviceClass::ArbitraryWaveformGenerator,
        ],
    },
    ImpliedRule {
        prefixes: &["OUTP"],
        classes: &[
            DeviceClass::SourceMeasureUnit,
            DeviceClass::PowerSupply,
            DeviceClass::FunctionGenerator,
            DeviceClass::ArbitraryWaveformGenerator,
        ],
    },
];

/// Classes compatible with a command, judged from its first header mnemonic.
/// Common-command headers (`*IDN?`, `*OPC?`, …) and unrecognized subsystems
/// imply nothing.
pub(crate) fn implied_classes(first_mnemonic: &str) -> Option<&'static [DeviceClass]> {
    let upper = first_mnemonic.trim().to_ascii_uppercase();
    if upper.starts_with('*') {
        return None;
    }
    let stem = upper.trim_end_matches(|c: char| c.is_ascii_digit());
    IMPLIED_RULES
        .iter()
        .find(|rule| rule.prefixes.iter().any(|p| stem.starts_with(p)))
        .map(|rule| rule.classes)
}

/// Every assigned variable must be read somewhere, loop induction variables
/// excepted.
pub(crate) fn check_variable_usage(session: &crate::session::Session) -> Result<(), CompileError> {
    for name in &session.assigned_vars {
        if session.loop_vars.contains(name) {
            continue;
        }
        if !session.used_vars.contains(name) {
            return Err(CompileError::UnusedVariable { name: name.clone() });
        }
    }
    Ok(())
}

/// Every connected device must be targeted by at least one operation.
pub(crate) fn check_device_usage(session: &crate::session::Session) -> Result<(), CompileError> {
    for alias in &session.connected {
        if !session.used_devices.contains(&alias.to_ascii_lowercase()) {
            return Err(CompileError::UnusedDevice {
                alias: alias.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[test]
    fn implied_class_table() {
        assert_eq!(
            implied_classes("MEASUrement").unwrap()[0],
            DeviceClass::Oscilloscope
        );
        assert_eq!(
            implied_classes("CH1").unwrap()[0],
            DeviceClass::Oscilloscope
        );
        assert_eq!(
            implied_classes("SOURce").unwrap()[0],
            DeviceClass::SourceMeasureUnit
        );
        assert!(implied_classes("*IDN?").is_none());
        assert!(implied_classes("SYSTem").is_none());
    }

    #[test]
    fn output_prefix_is_compatible_with_supplies() {
        let classes = implied_classes("OUTPut").unwrap();
        assert!(classes.contains(&DeviceClass::PowerSupply));
        assert!(!classes.contains(&DeviceClass::Oscilloscope));
    }

    #[test]
    fn loop_variables_are_exempt() {
        let mut s = Session::default();
        s.note_assignment("i", true);
        assert!(check_variable_usage(&s).is_ok());
        s.note_assignment("level", false);
        assert!(matches!(
            check_variable_usage(&s),
            Err(CompileError::UnusedVariable { name }) if name == "level"
        ));
    }

    #[test]
    fn unused_device_is_reported() {
        let mut s = Session::default();
        s.note_connected(
            "scope",
            crate::registry::Backend::Visa,
            DeviceClass::Oscilloscope,
        );
        assert!(matches!(
            check_device_usage(&s),
            Err(CompileError::UnusedDevice { alias }) if alias == "scope"
        ));
        s.note_device_use("SCOPE");
        assert!(check_device_usage(&s).is_ok());
    }
}
