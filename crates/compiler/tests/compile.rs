//! End-to-end compile tests: block-program JSON in, Python script (or a
//! fatal error) out.

use scpi_toolchain_compiler::{CompileError, DeviceRegistry, Program, compile};

fn registry(json: &str) -> DeviceRegistry {
    DeviceRegistry::from_json(json).expect("registry fixture")
}

fn program(json: &str) -> Program {
    Program::from_json(json).expect("program fixture")
}

const SCOPE_VISA: &str = r#"{"devices": [
    {"alias": "scope", "address": "10.0.0.5", "backend": "visa", "class": "scope"}
]}"#;

const SCOPE_TREE: &str = r#"{"devices": [
    {"alias": "scope", "address": "10.0.0.5", "backend": "tree", "class": "scope"}
]}"#;

#[test]
fn empty_program_compiles_to_header_only() {
    let script = compile(&program(r#"{"variables": []}"#), &registry(SCOPE_VISA)).unwrap();
    assert!(script.starts_with("#!/usr/bin/env python3"));
    assert!(!script.contains("pyvisa"));
    assert!(!script.contains("DeviceManager"));
}

#[test]
fn raw_backend_emits_visa_session_calls() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k", "type": "command", "fields": {"COMMAND": "ACQuire:STATE ON"}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert!(script.contains("import pyvisa"));
    assert!(script.contains("resource_manager = pyvisa.ResourceManager()"));
    assert!(script.contains("scope = resource_manager.open_resource(\"TCPIP0::10.0.0.5::INSTR\")"));
    assert!(script.contains("scope.write(\"ACQuire:STATE ON\")"));
    assert!(script.contains("scope.close()"));
}

// Same program, command-tree backend: the command must route through the
// object tree and never be sent as a raw string.
#[test]
fn tree_backend_routes_through_command_tree() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k", "type": "command", "fields": {"COMMAND": "ACQuire:STATE ON"}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_TREE)).unwrap();
    assert!(script.contains("from tm_devices import DeviceManager"));
    assert!(script.contains("scope = device_manager.add_scope(\"10.0.0.5\")"));
    assert!(script.contains("scope.commands.acquire.state.write(\"ON\")"));
    assert!(!script.contains("scope.write(\"ACQuire"));
    assert!(script.contains("device_manager.close()"));
}

// Two aliases, same physical endpoint through different resource notations.
#[test]
fn resource_collision_names_both_devices() {
    let reg = registry(
        r#"{"devices": [
            {"alias": "scope", "address": "10.0.0.5", "backend": "visa", "class": "scope"},
            {"alias": "smu", "resource": "TCPIP0::10.0.0.5::INSTR", "backend": "visa", "class": "smu"}
        ]}"#,
    );
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c1", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "c2", "type": "connect", "fields": {"NAME": "smu"}}
        }}"#,
    );
    let err = compile(&prog, &reg).unwrap_err();
    match err {
        CompileError::ResourceCollision {
            first,
            second,
            resource,
        } => {
            assert_eq!(first, "scope");
            assert_eq!(second, "smu");
            assert_eq!(resource, "10.0.0.5");
        }
        other => panic!("expected ResourceCollision, got {other:?}"),
    }
}

#[test]
fn start_acquisition_fuses_adjacent_wait() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "a", "type": "start_acquisition",
                "next": {"id": "w", "type": "wait_complete"}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert!(script.contains("scope.write(\"ACQuire:STOPAfter SEQuence\")"));
    assert!(script.contains("scope.write(\"ACQuire:STATE ON\")"));
    // The wait is folded into the acquisition group, not emitted twice.
    assert_eq!(script.matches("*OPC?").count(), 1);
}

// A delay between the pair still fuses; the sleep keeps its place ahead
// of the arm-and-wait group.
#[test]
fn fusion_steps_over_an_intervening_delay() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "a", "type": "start_acquisition",
                "next": {"id": "d", "type": "delay", "fields": {"SECONDS": "2"},
                "next": {"id": "w", "type": "wait_complete"}}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert_eq!(script.matches("*OPC?").count(), 1);
    let sleep = script.find("time.sleep(2)").expect("delay emitted");
    let arm = script.find("ACQuire:STATE ON").expect("acquisition armed");
    assert!(sleep < arm);
}

#[test]
fn standalone_wait_emits_its_own_sync() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k", "type": "command", "fields": {"COMMAND": "ACQuire:STATE ON"},
                "next": {"id": "w", "type": "wait_complete"}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert!(script.contains("scope.query(\"*OPC?\")"));
}

// Teardown is symmetric in connections, not in disconnect blocks: three
// explicit disconnects still close each device exactly once.
#[test]
fn teardown_closes_each_connection_exactly_once() {
    let reg = registry(
        r#"{"devices": [
            {"alias": "scope", "address": "10.0.0.5", "backend": "visa", "class": "scope"},
            {"alias": "psu", "address": "10.0.0.6", "backend": "visa", "class": "psu"}
        ]}"#,
    );
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c1", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k1", "type": "command", "fields": {"COMMAND": "ACQuire:STATE ON"},
            "next": {"id": "c2", "type": "connect", "fields": {"NAME": "psu"},
            "next": {"id": "k2", "type": "command", "fields": {"COMMAND": "OUTPut:STATE ON"},
            "next": {"id": "d1", "type": "disconnect",
            "next": {"id": "d2", "type": "disconnect",
            "next": {"id": "d3", "type": "disconnect"}}}}}}
        }}"#,
    );
    let script = compile(&prog, &reg).unwrap();
    assert_eq!(script.matches("scope.close()").count(), 1);
    assert_eq!(script.matches("psu.close()").count(), 1);
    assert_eq!(script.matches(".close()").count(), 2);
}

// Reconnecting an alias re-opens the session; the first one is closed
// before the identifier is rebound so it cannot leak.
#[test]
fn reconnect_closes_the_previous_session_first() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c1", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k1", "type": "command", "fields": {"COMMAND": "ACQuire:STATE ON"},
            "next": {"id": "c2", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k2", "type": "command", "fields": {"COMMAND": "ACQuire:STATE OFF"}}}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert_eq!(script.matches("resource_manager.open_resource").count(), 2);
    assert_eq!(script.matches("scope.close()").count(), 2);
    let reopen = script.rfind("resource_manager.open_resource").unwrap();
    let close = script.find("scope.close()").unwrap();
    assert!(close < reopen, "first session closed before rebinding");
}

#[test]
fn compile_is_deterministic() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "a", "type": "start_acquisition",
                "next": {"id": "w", "type": "wait_complete"}}
        }}"#,
    );
    let reg = registry(SCOPE_VISA);
    assert_eq!(compile(&prog, &reg).unwrap(), compile(&prog, &reg).unwrap());
}

#[test]
fn assigned_but_never_read_variable_is_fatal() {
    let prog = program(
        r#"{"variables": ["level"], "body": {
            "id": "s", "type": "set_variable", "fields": {"VAR": "level"},
            "inputs": {"VALUE": {"id": "n", "type": "number", "fields": {"NUM": "5"}}}
        }}"#,
    );
    let err = compile(&prog, &registry(SCOPE_VISA)).unwrap_err();
    assert!(matches!(err, CompileError::UnusedVariable { name } if name == "level"));
}

#[test]
fn loop_induction_variable_is_exempt() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "r", "type": "repeat", "fields": {"VAR": "i", "TIMES": "3"},
            "statements": {"DO": {"id": "d", "type": "delay", "fields": {"SECONDS": "1"}}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert!(script.contains("import time"));
    assert!(script.contains("for i in range(3):"));
    assert!(script.contains("    time.sleep(1)"));
}

#[test]
fn connected_but_unused_device_is_fatal() {
    let prog = program(
        r#"{"variables": [], "body": {"id": "c", "type": "connect", "fields": {"NAME": "scope"}}}"#,
    );
    let err = compile(&prog, &registry(SCOPE_VISA)).unwrap_err();
    assert!(matches!(err, CompileError::UnusedDevice { alias } if alias == "scope"));
}

#[test]
fn operation_before_any_connect_is_fatal() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "k", "type": "command", "fields": {"COMMAND": "ACQuire:STATE ON"}
        }}"#,
    );
    let err = compile(&prog, &registry(SCOPE_VISA)).unwrap_err();
    assert!(matches!(err, CompileError::NoDeviceContext { .. }));
}

#[test]
fn query_on_write_only_backend_is_fatal() {
    let reg = registry(
        r#"{"devices": [
            {"alias": "scope", "address": "10.0.0.5", "backend": "socket", "class": "scope"}
        ]}"#,
    );
    let prog = program(
        r#"{"variables": ["idn"], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "q", "type": "query_into",
                "fields": {"VAR": "idn", "COMMAND": "*IDN?"}}
        }}"#,
    );
    let err = compile(&prog, &reg).unwrap_err();
    assert!(matches!(
        err,
        CompileError::CapabilityViolation { alias, .. } if alias == "scope"
    ));
}

// A `?` glued to the header is a query even with arguments after it, and
// must be rejected before any output is produced.
#[test]
fn query_with_arguments_on_write_only_backend_is_fatal() {
    let reg = registry(
        r#"{"devices": [
            {"alias": "scope", "address": "10.0.0.5", "backend": "socket", "class": "scope"}
        ]}"#,
    );
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k", "type": "command",
                "fields": {"COMMAND": "MEASUrement:MEAS1:VALue? CH1"}}
        }}"#,
    );
    let err = compile(&prog, &reg).unwrap_err();
    assert!(matches!(
        err,
        CompileError::CapabilityViolation { node, .. } if node == "query command"
    ));
}

#[test]
fn plain_writes_are_fine_on_write_only_backend() {
    let reg = registry(
        r#"{"devices": [
            {"alias": "scope", "address": "10.0.0.5", "backend": "socket", "class": "scope"}
        ]}"#,
    );
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k", "type": "command", "fields": {"COMMAND": "ACQuire:STATE ON"}}
        }}"#,
    );
    let script = compile(&prog, &reg).unwrap();
    assert!(script.contains("TCPIP0::10.0.0.5::4000::SOCKET"));
    assert!(script.contains("scope.write(\"ACQuire:STATE ON\")"));
}

#[test]
fn command_class_mismatch_is_fatal() {
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "k", "type": "command", "fields": {"COMMAND": "SOURce:VOLTage 1.0"}}
        }}"#,
    );
    let err = compile(&prog, &registry(SCOPE_VISA)).unwrap_err();
    assert!(matches!(err, CompileError::CommandDeviceMismatch { .. }));
}

#[test]
fn query_result_flows_into_interpolated_print() {
    let prog = program(
        r#"{"variables": ["level"], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "q", "type": "query_into",
                "fields": {"VAR": "level", "COMMAND": "MEASUrement:MEAS1:VALue?"},
            "next": {"id": "p", "type": "print",
                "inputs": {"VALUE": {"id": "t", "type": "text",
                    "fields": {"TEXT": "level = {level}"}}}}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert!(script.contains("level = scope.query(\"MEASUrement:MEAS1:VALue?\")"));
    assert!(script.contains("print(f\"level = {level}\")"));
}

#[test]
fn compare_against_number_coerces_the_variable() {
    let prog = program(
        r#"{"variables": ["level"], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "q", "type": "query_into",
                "fields": {"VAR": "level", "COMMAND": "MEASUrement:MEAS1:VALue?"},
            "next": {"id": "f", "type": "if_else",
                "inputs": {"COND": {"id": "cmp", "type": "compare", "fields": {"OP": "GT"},
                    "inputs": {
                        "A": {"id": "g", "type": "get_variable", "fields": {"VAR": "level"}},
                        "B": {"id": "n", "type": "number", "fields": {"NUM": "2.5"}}}}},
                "statements": {"THEN": {"id": "k", "type": "command",
                    "fields": {"COMMAND": "ACQuire:STATE ON"}}}}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert!(script.contains("if (float(level) > 2.5):"));
    assert!(script.contains("    scope.write(\"ACQuire:STATE ON\")"));
}

// Explicit device switches and per-block device fields both override the
// most-recent-connect default.
#[test]
fn device_context_switching() {
    let reg = registry(
        r#"{"devices": [
            {"alias": "scope", "address": "10.0.0.5", "backend": "visa", "class": "scope"},
            {"alias": "smu", "address": "10.0.0.6", "backend": "visa", "class": "smu"}
        ]}"#,
    );
    let prog = program(
        r#"{"variables": [], "body": {
            "id": "c1", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "c2", "type": "connect", "fields": {"NAME": "smu"},
            "next": {"id": "u", "type": "use_device", "fields": {"NAME": "scope"},
            "next": {"id": "k1", "type": "command", "fields": {"COMMAND": "ACQuire:STATE ON"},
            "next": {"id": "k2", "type": "command",
                "fields": {"COMMAND": "SOURce:VOLTage 1.0", "DEVICE": "smu"}}}}}
        }}"#,
    );
    let script = compile(&prog, &reg).unwrap();
    assert!(script.contains("scope.write(\"ACQuire:STATE ON\")"));
    assert!(script.contains("smu.write(\"SOURce:VOLTage 1.0\")"));
}

#[test]
fn raw_code_lines_are_spliced_and_count_as_uses() {
    let prog = program(
        r#"{"variables": ["level"], "body": {
            "id": "c", "type": "connect", "fields": {"NAME": "scope"},
            "next": {"id": "q", "type": "query_into",
                "fields": {"VAR": "level", "COMMAND": "MEASUrement:MEAS1:VALue?"},
            "next": {"id": "r", "type": "raw_code",
                "fields": {"CODE": "threshold = float(level) * 2\nprint(threshold)"}}}
        }}"#,
    );
    let script = compile(&prog, &registry(SCOPE_VISA)).unwrap();
    assert!(script.contains("threshold = float(level) * 2\nprint(threshold)\n"));
}
