//! Per-compile session state.
//!
//! Everything the traversal accumulates lives in one [`Session`] value,
//! constructed at the start of a compile call and discarded at its end.
//! There are no globals and no cross-call leakage; concurrent compiles get
//! independent sessions.

use crate::ir::{BlockNode, NodeIndex, NodeKind};
use crate::registry::{Backend, DeviceClass};
use std::collections::{HashMap, HashSet};

/// A start-acquisition block folded into a downstream wait block.
pub(crate) struct PendingFusion {
    /// Resolved `ACQuire:STOPAfter` argument of the deferred start block.
    pub stop_after: &'static str,
}

/// Mutable state threaded through one compile call.
#[derive(Default)]
pub(crate) struct Session {
    /// Device alias (lowercase) → backend and class, populated at connect
    /// nodes and consulted by every instrument operation.
    pub backends: HashMap<String, (Backend, DeviceClass)>,
    /// Canonical resource → alias that claimed it first.
    pub claimed: HashMap<String, String>,
    /// Aliases in connect order (display casing), deduplicated. Drives
    /// teardown synthesis and keeps output deterministic.
    pub connected: Vec<String>,
    /// Lowercase aliases referenced by at least one operation.
    pub used_devices: HashSet<String>,
    /// Variables in assignment order, deduplicated.
    pub assigned_vars: Vec<String>,
    /// Loop induction variables, exempt from the must-be-read rule.
    pub loop_vars: HashSet<String>,
    /// Variables read at least once.
    pub used_vars: HashSet<String>,
    /// Fusions pending emission, keyed by the wait node's id. The matched
    /// start node is skipped at its own turn; the wait emits the combined
    /// block.
    pub fused: HashMap<String, PendingFusion>,
    /// Last globally seen device context (lowercase alias).
    pub current_device: Option<String>,
}

impl Session {
    pub(crate) fn note_connected(
        &mut self,
        alias: &str,
        backend: Backend,
        class: DeviceClass,
    ) {
        let key = alias.to_ascii_lowercase();
        if !self.backends.contains_key(&key) {
            self.connected.push(alias.to_string());
        }
        self.backends.insert(key.clone(), (backend, class));
        self.current_device = Some(key);
    }

    pub(crate) fn note_device_use(&mut self, alias: &str) {
        self.used_devices.insert(alias.to_ascii_lowercase());
    }

    pub(crate) fn note_assignment(&mut self, name: &str, is_loop_var: bool) {
        if !self.assigned_vars.iter().any(|v| v == name) {
            self.assigned_vars.push(name.to_string());
        }
        if is_loop_var {
            self.loop_vars.insert(name.to_string());
        }
    }

    pub(crate) fn note_var_use(&mut self, name: &str) {
        self.used_vars.insert(name.to_string());
    }

    /// Register every declared variable appearing as a whole word in
    /// free-form text as a read.
    pub(crate) fn scan_var_uses(&mut self, text: &str, declared: &[String]) {
        for word in identifier_words(text) {
            if declared.iter().any(|v| v == word)
                || self.assigned_vars.iter().any(|v| v == word)
            {
                self.used_vars.insert(word.to_string());
            }
        }
    }

    /// Register every known device alias appearing as a whole word in
    /// free-form code as a device use.
    pub(crate) fn scan_device_uses(&mut self, text: &str, aliases: &[String]) {
        for word in identifier_words(text) {
            if let Some(alias) = aliases.iter().find(|a| {
                a.eq_ignore_ascii_case(word)
                    || crate::registry::sanitize_ident(a) == word
            }) {
                self.note_device_use(alias);
            }
        }
    }
}

/// Iterate maximal identifier-shaped words (`[A-Za-z_][A-Za-z0-9_]*`).
fn identifier_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| {
            !w.is_empty() && w.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        })
}

/// Resolver for the device context of a node.
///
/// Precedence is fixed: an explicit per-node device field wins; otherwise
/// the most recent connect/switch node among previous siblings and
/// ancestor scopes (via the per-traversal [`NodeIndex`]); failing that, the
/// last globally seen context.
pub(crate) struct ContextCursor<'p> {
    index: &'p NodeIndex<'p>,
    last_seen: Option<String>,
}

/// Sentinel field value meaning "no explicit device on this block".
const DEFAULT_SENTINEL: &str = "DEFAULT";

impl<'p> ContextCursor<'p> {
    pub(crate) fn new(index: &'p NodeIndex<'p>) -> Self {
        Self {
            index,
            last_seen: None,
        }
    }

    /// Record a context-setting node as the traversal passes it.
    pub(crate) fn observe(&mut self, node: &BlockNode) {
        if matches!(node.kind, NodeKind::Connect | NodeKind::UseDevice)
            && let Some(name) = node.field("NAME")
        {
            self.last_seen = Some(name.to_ascii_lowercase());
        }
    }

    /// Resolve the device context (lowercase alias) for an operation node.
    pub(crate) fn resolve(&self, node: &BlockNode) -> Option<String> {
        if let Some(explicit) = node.field("DEVICE")
            && !explicit.eq_ignore_ascii_case(DEFAULT_SENTINEL)
        {
            return Some(explicit.to_ascii_lowercase());
        }

        let mut cur = node;
        loop {
            if let Some(prev) = self.index.prev_sibling(cur) {
                cur = prev;
            } else if let Some(parent) = self.index.parent(cur) {
                cur = parent;
            } else {
                break;
            }
            if matches!(cur.kind, NodeKind::Connect | NodeKind::UseDevice)
                && let Some(name) = cur.field("NAME")
            {
                return Some(name.to_ascii_lowercase());
            }
        }

        self.last_seen.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_words_split() {
        let words: Vec<&str> = identifier_words("level = scope.query('x') + offset2").collect();
        assert_eq!(words, vec!["level", "scope", "query", "x", "offset2"]);
    }

    #[test]
    fn connect_dedup_keeps_first_order() {
        let mut s = Session::default();
        s.note_connected("scope", Backend::Visa, DeviceClass::Oscilloscope);
        s.note_connected("smu", Backend::Tree, DeviceClass::SourceMeasureUnit);
        s.note_connected("SCOPE", Backend::Visa, DeviceClass::Oscilloscope);
        assert_eq!(s.connected, vec!["scope", "smu"]);
        assert_eq!(s.current_device.as_deref(), Some("scope"));
    }

    #[test]
    fn scan_var_uses_whole_words_only() {
        let mut s = Session::default();
        let declared = vec!["level".to_string()];
        s.scan_var_uses("high_level = level2", &declared);
        assert!(!s.used_vars.contains("level"));
        s.scan_var_uses("print(level)", &declared);
        assert!(s.used_vars.contains("level"));
    }
}
