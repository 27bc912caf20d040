//! Python script synthesis.
//!
//! The emitter walks the program tree once, in statement order, translating
//! each block through the backend table: raw-protocol devices get VISA
//! session calls, command-tree devices get device-manager attribute paths.
//! Setup (imports, managers) and teardown (one close per connection) are
//! synthesized around the body rather than translated from blocks.

use crate::error::CompileError;
use crate::ir::{BlockNode, NodeIndex, NodeKind, Program};
use crate::passes::{Facts, implied_classes};
use crate::registry::{Backend, DeviceClass, DeviceRegistry};
use crate::session::{ContextCursor, PendingFusion, Session};
use scpi_toolchain_core::{ParsedCommand, TreeMethod, parse, to_tree_path};

const INDENT: &str = "    ";

/// Line-oriented Python writer with indent tracking.
struct PyWriter {
    out: String,
    depth: usize,
    emitted: usize,
    last_blank: bool,
}

impl PyWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
            emitted: 0,
            last_blank: true,
        }
    }

    fn line(&mut self, s: &str) {
        if s.trim().is_empty() {
            self.blank();
            return;
        }
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(s);
        self.out.push('\n');
        self.emitted += 1;
        self.last_blank = false;
    }

    /// Emit a separator line; consecutive blanks collapse.
    fn blank(&mut self) {
        if !self.out.is_empty() && !self.last_blank {
            self.out.push('\n');
            self.last_blank = true;
        }
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn emitted(&self) -> usize {
        self.emitted
    }

    fn finish(self) -> String {
        self.out
    }
}

/// A resolved operation target.
struct Target {
    alias: String,
    ident: String,
    backend: Backend,
    class: DeviceClass,
}

/// One-shot script emitter. Construct, call [`Emitter::synthesize`], done.
pub(crate) struct Emitter<'p> {
    program: &'p Program,
    registry: &'p DeviceRegistry,
    session: Session,
    cursor: ContextCursor<'p>,
    w: PyWriter,
    facts: Facts,
    aliases: Vec<String>,
}

impl<'p> Emitter<'p> {
    pub(crate) fn new(
        program: &'p Program,
        registry: &'p DeviceRegistry,
        index: &'p NodeIndex<'p>,
        facts: Facts,
    ) -> Self {
        Self {
            program,
            registry,
            session: Session::default(),
            cursor: ContextCursor::new(index),
            w: PyWriter::new(),
            facts,
            aliases: registry.devices.iter().map(|d| d.alias.clone()).collect(),
        }
    }

    /// Emit the complete script. Returns the script text and the finished
    /// session so the usage passes can run over it.
    pub(crate) fn synthesize(mut self) -> Result<(String, Session), CompileError> {
        self.emit_prologue();
        if let Some(body) = &self.program.body {
            self.emit_list(body)?;
        }
        self.emit_teardown();
        Ok((self.w.finish(), self.session))
    }

    fn emit_prologue(&mut self) {
        self.w.line("#!/usr/bin/env python3");
        self.w
            .line("\"\"\"Auto-generated instrument automation script.\"\"\"");

        if self.facts.uses_time {
            self.w.blank();
            self.w.line("import time");
        }
        if self.facts.any_raw || self.facts.any_tree {
            self.w.blank();
            if self.facts.any_raw {
                self.w.line("import pyvisa");
            }
            if self.facts.any_tree {
                self.w.line("from tm_devices import DeviceManager");
            }
            self.w.blank();
            if self.facts.any_raw {
                self.w.line("resource_manager = pyvisa.ResourceManager()");
            }
            if self.facts.any_tree {
                self.w.line("device_manager = DeviceManager()");
            }
        }
    }

    fn emit_list(&mut self, head: &'p BlockNode) -> Result<(), CompileError> {
        for node in head.iter_list() {
            self.emit_node(node)?;
            self.cursor.observe(node);
        }
        Ok(())
    }

    fn emit_node(&mut self, node: &'p BlockNode) -> Result<(), CompileError> {
        match node.kind {
            NodeKind::Connect => self.emit_connect(node),
            // Teardown is synthesized once per connection at the end of the
            // script; an explicit disconnect block adds nothing.
            NodeKind::Disconnect => Ok(()),
            // Context switching is resolved at compile time.
            NodeKind::UseDevice => Ok(()),
            NodeKind::Command => self.emit_command(node),
            NodeKind::QueryInto => self.emit_query_into(node),
            NodeKind::StartAcquisition => self.emit_start_acquisition(node),
            NodeKind::WaitComplete => self.emit_wait(node),
            NodeKind::Delay => {
                let amount = match node.inputs.get("VALUE") {
                    Some(v) => self.emit_expr(Some(v)),
                    None => {
                        let raw = node.field("SECONDS").unwrap_or("1");
                        if raw.parse::<f64>().is_ok() {
                            raw.to_string()
                        } else {
                            "1".to_string()
                        }
                    }
                };
                self.w.line(&format!("time.sleep({amount})"));
                Ok(())
            }
            NodeKind::SetVariable => {
                let Some(var) = node.field("VAR") else {
                    return Ok(());
                };
                let var = var.to_string();
                let value = self.emit_expr(node.inputs.get("VALUE"));
                self.w.line(&format!("{var} = {value}"));
                self.session.note_assignment(&var, false);
                Ok(())
            }
            NodeKind::Print => {
                let value = self.emit_expr(node.inputs.get("VALUE"));
                self.w.line(&format!("print({value})"));
                Ok(())
            }
            NodeKind::RawCode => {
                let Some(code) = node.field("CODE") else {
                    return Ok(());
                };
                self.session.scan_var_uses(code, &self.program.variables);
                self.session.scan_device_uses(code, &self.aliases);
                for line in code.lines() {
                    self.w.line(line.trim_end_matches('\r'));
                }
                Ok(())
            }
            NodeKind::Comment => {
                let text = node.field("TEXT").unwrap_or("");
                self.w.line(&format!("# {text}"));
                Ok(())
            }
            NodeKind::Repeat => self.emit_repeat(node),
            NodeKind::IfElse => self.emit_if_else(node),
            // Value blocks contribute nothing as statements.
            NodeKind::Number
            | NodeKind::Text
            | NodeKind::GetVariable
            | NodeKind::Compare => Ok(()),
        }
    }

    fn emit_connect(&mut self, node: &BlockNode) -> Result<(), CompileError> {
        let Some(alias) = node.field("NAME") else {
            return Err(CompileError::UnresolvedDeviceConfig {
                alias: "(unnamed)".to_string(),
                reason: "connect block has no device name".to_string(),
            });
        };
        let binding =
            self.registry
                .get(alias)
                .ok_or_else(|| CompileError::UnresolvedDeviceConfig {
                    alias: alias.to_string(),
                    reason: "no device with this alias is configured".to_string(),
                })?;
        let canonical =
            binding
                .canonical_resource()
                .ok_or_else(|| CompileError::UnresolvedDeviceConfig {
                    alias: binding.alias.clone(),
                    reason: "neither an address nor a resource string is set".to_string(),
                })?;

        if let Some(first) = self.session.claimed.get(&canonical) {
            if !first.eq_ignore_ascii_case(&binding.alias) {
                return Err(CompileError::ResourceCollision {
                    first: first.clone(),
                    second: binding.alias.clone(),
                    resource: canonical,
                });
            }
        } else {
            self.session
                .claimed
                .insert(canonical, binding.alias.clone());
        }

        let reconnect = self
            .session
            .backends
            .contains_key(&binding.alias.to_ascii_lowercase());
        self.session
            .note_connected(&binding.alias, binding.backend, binding.class);

        let ident = binding.py_ident();
        // The device manager holds one session per device, so a repeat
        // connect to a tree backend is a context switch, not a new session.
        if reconnect && binding.backend.is_tree() {
            return Ok(());
        }
        self.w.blank();
        if binding.backend.is_tree() {
            let endpoint =
                binding
                    .manager_endpoint()
                    .ok_or_else(|| CompileError::UnresolvedDeviceConfig {
                        alias: binding.alias.clone(),
                        reason: "neither an address nor a resource string is set".to_string(),
                    })?;
            self.w.line(&format!(
                "{ident} = device_manager.{}(\"{endpoint}\")",
                binding.class.add_method()
            ));
        } else {
            // Rebinding the identifier would leak the first session.
            if reconnect {
                self.w.line(&format!("{ident}.close()"));
            }
            let resource =
                binding
                    .visa_resource()
                    .ok_or_else(|| CompileError::UnresolvedDeviceConfig {
                        alias: binding.alias.clone(),
                        reason: "neither an address nor a resource string is set".to_string(),
                    })?;
            self.w
                .line(&format!("{ident} = resource_manager.open_resource(\"{resource}\")"));
        }
        Ok(())
    }

    fn emit_command(&mut self, node: &BlockNode) -> Result<(), CompileError> {
        let Some(raw) = node.field("COMMAND") else {
            return Ok(());
        };
        let raw = raw.to_string();
        let target = self.device_for(node, "command block")?;
        let parsed = parse(&raw).command;
        self.check_class(&raw, &parsed, &target)?;

        if target.backend.is_tree() {
            let path = to_tree_path(&parsed);
            let dotted = path.dotted();
            let ident = &target.ident;
            match path.method {
                TreeMethod::Query | TreeMethod::Verify => {
                    self.w.line(&format!("{ident}.commands.{dotted}.query()"));
                }
                TreeMethod::Write => {
                    let value = path.value.unwrap_or_default();
                    let rendered = self.py_string(&value);
                    self.w
                        .line(&format!("{}.commands.{dotted}.write({rendered})", target.ident));
                }
            }
        } else {
            let rendered = self.py_string(raw.trim());
            let method = if parsed.query { "query" } else { "write" };
            self.w
                .line(&format!("{}.{method}({rendered})", target.ident));
        }
        Ok(())
    }

    fn emit_query_into(&mut self, node: &BlockNode) -> Result<(), CompileError> {
        let Some(var) = node.field("VAR") else {
            return Ok(());
        };
        let Some(raw) = node.field("COMMAND") else {
            return Ok(());
        };
        let (var, raw) = (var.to_string(), raw.to_string());
        let target = self.device_for(node, "query block")?;
        let parsed = parse(&raw).command;
        self.check_class(&raw, &parsed, &target)?;

        if target.backend.is_tree() {
            let dotted = to_tree_path(&parsed).dotted();
            self.w
                .line(&format!("{var} = {}.commands.{dotted}.query()", target.ident));
        } else {
            let mut command = raw.trim().to_string();
            if !command.ends_with('?') {
                command.push('?');
            }
            let rendered = self.py_string(&command);
            self.w
                .line(&format!("{var} = {}.query({rendered})", target.ident));
        }
        self.session.note_assignment(&var, false);
        Ok(())
    }

    fn emit_start_acquisition(&mut self, node: &'p BlockNode) -> Result<(), CompileError> {
        let target = self.device_for(node, "start-acquisition block")?;
        let single = !node
            .field("MODE")
            .is_some_and(|m| m.eq_ignore_ascii_case("continuous"));
        let stop_after = if single { "SEQuence" } else { "RUNSTop" };

        // Fusion: if a wait block for the same device follows (only
        // delays, device switches, comments, or disconnects in between),
        // defer this block. The wait emits the combined group and the
        // match is recorded by node identity, so field edits on either
        // block cannot de-synchronize the pair.
        if let Some(wait_id) = self.peek_fused_wait(node, &target.alias) {
            self.session
                .fused
                .insert(wait_id, PendingFusion { stop_after });
            return Ok(());
        }

        let ident = &target.ident;
        if target.backend.is_tree() {
            self.w
                .line(&format!("{ident}.commands.acquire.stopafter.write(\"{stop_after}\")"));
            self.w
                .line(&format!("{ident}.commands.acquire.state.write(\"ON\")"));
        } else {
            self.w
                .line(&format!("{ident}.write(\"ACQuire:STOPAfter {stop_after}\")"));
            self.w.line(&format!("{ident}.write(\"ACQuire:STATE ON\")"));
        }
        Ok(())
    }

    /// Look ahead from a start-acquisition block for a wait block that
    /// resolves to the same device. Delay, device-switch, comment, and
    /// disconnect blocks in between are stepped over (they still emit at
    /// their own turns); any other block breaks the pair.
    fn peek_fused_wait(&self, node: &'p BlockNode, alias: &str) -> Option<String> {
        let mut cur = node.next.as_deref();
        while let Some(n) = cur {
            match n.kind {
                NodeKind::Delay
                | NodeKind::UseDevice
                | NodeKind::Comment
                | NodeKind::Disconnect => cur = n.next.as_deref(),
                NodeKind::WaitComplete => {
                    let wait_alias = self
                        .cursor
                        .resolve(n)
                        .unwrap_or_else(|| alias.to_string());
                    return wait_alias.eq_ignore_ascii_case(alias).then(|| n.id.clone());
                }
                _ => return None,
            }
        }
        None
    }

    fn emit_wait(&mut self, node: &BlockNode) -> Result<(), CompileError> {
        let target = self.device_for(node, "wait-for-complete block")?;
        let ident = &target.ident;

        if let Some(fusion) = self.session.fused.remove(&node.id) {
            let stop_after = fusion.stop_after;
            self.w
                .line("# arm the acquisition and block until it completes");
            if target.backend.is_tree() {
                self.w
                    .line(&format!("{ident}.commands.acquire.stopafter.write(\"{stop_after}\")"));
                self.w
                    .line(&format!("{ident}.commands.acquire.state.write(\"ON\")"));
                self.w.line(&format!("{ident}.commands.opc.query()"));
            } else {
                self.w
                    .line(&format!("{ident}.write(\"ACQuire:STOPAfter {stop_after}\")"));
                self.w.line(&format!("{ident}.write(\"ACQuire:STATE ON\")"));
                self.w.line(&format!("{ident}.query(\"*OPC?\")"));
            }
            return Ok(());
        }

        if target.backend.is_tree() {
            self.w.line(&format!("{ident}.commands.opc.query()"));
        } else {
            self.w.line(&format!("{ident}.query(\"*OPC?\")"));
        }
        Ok(())
    }

    fn emit_repeat(&mut self, node: &'p BlockNode) -> Result<(), CompileError> {
        let var = node.field("VAR").unwrap_or("i").to_string();
        let times = match node.inputs.get("TIMES") {
            Some(t) => self.emit_expr(Some(t)),
            None => node
                .field("TIMES")
                .and_then(|t| t.parse::<i64>().ok())
                .unwrap_or(1)
                .to_string(),
        };
        self.session.note_assignment(&var, true);
        self.w.line(&format!("for {var} in range({times}):"));
        self.emit_body(node.statements.get("DO"))
    }

    fn emit_if_else(&mut self, node: &'p BlockNode) -> Result<(), CompileError> {
        let cond = self.emit_expr(node.inputs.get("COND"));
        self.w.line(&format!("if {cond}:"));
        self.emit_body(node.statements.get("THEN"))?;
        if let Some(else_arm) = node.statements.get("ELSE") {
            self.w.line("else:");
            self.emit_body(Some(else_arm))?;
        }
        Ok(())
    }

    /// Emit a nested statement list one level deeper, padding with `pass`
    /// when the list produces no lines (e.g. only disconnect blocks).
    fn emit_body(&mut self, body: Option<&'p BlockNode>) -> Result<(), CompileError> {
        self.w.indent();
        let before = self.w.emitted();
        if let Some(head) = body {
            self.emit_list(head)?;
        }
        if self.w.emitted() == before {
            self.w.line("pass");
        }
        self.w.dedent();
        Ok(())
    }

    fn emit_teardown(&mut self) {
        if self.session.connected.is_empty() {
            return;
        }
        self.w.blank();
        let connected = self.session.connected.clone();
        let mut any_tree = false;
        for alias in connected {
            let Some(binding) = self.registry.get(&alias) else {
                continue;
            };
            if binding.backend.is_tree() {
                any_tree = true;
            } else {
                self.w.line(&format!("{}.close()", binding.py_ident()));
            }
        }
        if any_tree {
            self.w.line("device_manager.close()");
        }
    }

    /// Render a value-input expression, registering variable reads as a
    /// side effect. A missing input renders as `None`.
    fn emit_expr(&mut self, node: Option<&'p BlockNode>) -> String {
        let Some(node) = node else {
            return "None".to_string();
        };
        match node.kind {
            NodeKind::Number => node
                .field("NUM")
                .filter(|v| v.parse::<f64>().is_ok())
                .unwrap_or("0")
                .to_string(),
            NodeKind::Text => {
                let text = node.field("TEXT").unwrap_or("").to_string();
                self.py_string(&text)
            }
            NodeKind::GetVariable => match node.field("VAR") {
                Some(var) => {
                    self.session.note_var_use(var);
                    var.to_string()
                }
                None => "None".to_string(),
            },
            NodeKind::Compare => {
                // Query responses are strings; coerce the non-literal side
                // when comparing against a numeric literal.
                let numeric = [node.inputs.get("A"), node.inputs.get("B")]
                    .iter()
                    .any(|n| n.is_some_and(|n| n.kind == NodeKind::Number));
                let a = self.emit_compare_side(node.inputs.get("A"), numeric);
                let b = self.emit_compare_side(node.inputs.get("B"), numeric);
                let op = match node.field("OP").map(str::to_ascii_uppercase).as_deref() {
                    Some("NEQ") => "!=",
                    Some("LT") => "<",
                    Some("LTE") => "<=",
                    Some("GT") => ">",
                    Some("GTE") => ">=",
                    _ => "==",
                };
                format!("({a} {op} {b})")
            }
            _ => "None".to_string(),
        }
    }

    fn emit_compare_side(&mut self, side: Option<&'p BlockNode>, numeric: bool) -> String {
        let rendered = self.emit_expr(side);
        if numeric && side.is_some_and(|n| n.kind == NodeKind::GetVariable) {
            format!("float({rendered})")
        } else {
            rendered
        }
    }

    /// Render a Python string literal, switching to an f-string when the
    /// text interpolates a known variable.
    fn py_string(&mut self, s: &str) -> String {
        let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
        if self.register_interpolations(s) {
            format!("f\"{escaped}\"")
        } else {
            format!("\"{escaped}\"")
        }
    }

    /// Mark `{name}` interpolations of known variables as reads. Returns
    /// whether any were found.
    fn register_interpolations(&mut self, s: &str) -> bool {
        let mut found = false;
        let mut rest = s;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                break;
            };
            let name = &after[..close];
            if is_py_ident(name)
                && (self.program.variables.iter().any(|v| v == name)
                    || self.session.assigned_vars.iter().any(|v| v == name))
            {
                self.session.note_var_use(name);
                found = true;
            }
            rest = &after[close + 1..];
        }
        found
    }

    fn device_for(&mut self, node: &BlockNode, what: &str) -> Result<Target, CompileError> {
        let alias = self
            .cursor
            .resolve(node)
            .ok_or_else(|| CompileError::NoDeviceContext {
                node: what.to_string(),
            })?;
        let binding =
            self.registry
                .get(&alias)
                .ok_or_else(|| CompileError::UnresolvedDeviceConfig {
                    alias: alias.clone(),
                    reason: "no device with this alias is configured".to_string(),
                })?;
        self.session.note_device_use(&binding.alias);
        Ok(Target {
            alias: binding.alias.clone(),
            ident: binding.py_ident(),
            backend: binding.backend,
            class: binding.class,
        })
    }

    fn check_class(
        &self,
        raw: &str,
        parsed: &ParsedCommand,
        target: &Target,
    ) -> Result<(), CompileError> {
        let Some(first) = parsed.mnemonics.first() else {
            return Ok(());
        };
        if let Some(classes) = implied_classes(&first.text)
            && !classes.contains(&target.class)
        {
            return Err(CompileError::CommandDeviceMismatch {
                command: raw.trim().to_string(),
                implied: classes[0],
                alias: target.alias.clone(),
                actual: target.class,
            });
        }
        Ok(())
    }
}

fn is_py_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_indents_and_collapses_blanks() {
        let mut w = PyWriter::new();
        w.line("for i in range(3):");
        w.indent();
        w.line("print(i)");
        w.dedent();
        w.blank();
        w.blank();
        w.line("done = True");
        assert_eq!(
            w.finish(),
            "for i in range(3):\n    print(i)\n\ndone = True\n"
        );
    }

    #[test]
    fn py_ident_shapes() {
        assert!(is_py_ident("level"));
        assert!(is_py_ident("_x2"));
        assert!(!is_py_ident("2x"));
        assert!(!is_py_ident("a-b"));
        assert!(!is_py_ident(""));
    }
}
