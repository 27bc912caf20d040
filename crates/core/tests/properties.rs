//! Cross-module behavior: parse/reconstruct round-trips, in-place
//! substitution, and option defaulting on realistic command strings.

use scpi_toolchain_core::{
    ArgKind, ParamKind, ParamPosition, detect_parameters, parse, substitute,
};

// Commands written in the conventional layout (one space before the
// argument remainder, commas without spaces) must reconstruct byte-for-byte.
#[test]
fn parse_reconstruct_round_trip() {
    let inputs = [
        "ACQuire:STATE ON",
        ":MEASUrement:MEAS1:VALue?",
        "CH1:SCAle 0.5",
        "TRIGger:A:EDGE:SOUrce CH2",
        "SAVe:WAVEform \"ch1.wfm\",REF1",
        "MEASUrement:MEAS1:VALue? CH1",
        "HORizontal:SCAle 2.5E-3",
        "*IDN?",
    ];
    for input in inputs {
        let outcome = parse(input);
        assert_eq!(outcome.command.reconstruct(), input, "round trip failed");
    }
}

// Leading whitespace (common while a command is being typed) must not
// shift the header split; spans still index into the original string.
#[test]
fn leading_whitespace_is_ignored() {
    let outcome = parse("  ACQuire:STATE ON");
    assert_eq!(outcome.command.header, "ACQuire:STATE");
    assert_eq!(outcome.command.args.len(), 1);
    assert_eq!(outcome.command.args[0].value, "ON");
    assert_eq!(outcome.command.mnemonics[0].span.start, 2);

    let outcome = parse("  :CH1:SCAle 0.5");
    assert!(outcome.command.leading_colon);
    assert_eq!(outcome.command.header, "CH1:SCAle");
    assert_eq!(outcome.command.mnemonics[0].span.start, 3);
}

#[test]
fn malformed_input_still_parses() {
    // Mid-edit fragments must never fail, only degrade.
    let outcome = parse("MEASU:MEAS1: \"unterminated");
    assert!(!outcome.diagnostics.is_empty());
    assert_eq!(outcome.command.args.len(), 1);
    assert_eq!(outcome.command.args[0].kind, ArgKind::Quoted);
}

// Substituting a parameter with its own current value is the identity.
#[test]
fn substitution_is_idempotent() {
    let input = "DISplay:WAVEView1:CH2:STATE ON";
    let outcome = parse(input);
    let params = detect_parameters(&outcome.command, None);
    for p in &params {
        assert_eq!(substitute(input, p, &p.value), input);
    }
}

#[test]
fn substitution_then_redetection_converges() {
    let input = "MEASUrement:MEAS<x>:SOUrce CH<x>";
    let outcome = parse(input);
    let params = detect_parameters(&outcome.command, None);
    let meas = params
        .iter()
        .find(|p| p.kind == ParamKind::Measurement)
        .expect("measurement slot detected");
    assert_eq!(meas.value, "MEAS1");

    let rewritten = substitute(input, meas, "MEAS3");
    let outcome = parse(&rewritten);
    let params = detect_parameters(&outcome.command, None);
    let meas = params
        .iter()
        .find(|p| p.kind == ParamKind::Measurement)
        .expect("measurement slot still detected");
    assert_eq!(meas.value, "MEAS3");
    assert_eq!(meas.options.len(), 8);
}

#[test]
fn option_counts_per_kind() {
    let cases = [
        ("CH<x>:SCAle 0.5", ParamKind::Channel, 4),
        ("CURSor:CURSOR<x>:STATE ON", ParamKind::Cursor, 2),
        ("ZOOM:ZOOM<x>:STATE ON", ParamKind::Zoom, 1),
        ("SEARCH:SEARCH<x>:STATE ON", ParamKind::Search, 8),
    ];
    for (input, kind, count) in cases {
        let outcome = parse(input);
        let params = detect_parameters(&outcome.command, None);
        let p = params
            .iter()
            .find(|p| p.kind == kind)
            .unwrap_or_else(|| panic!("no {kind} parameter in '{input}'"));
        assert_eq!(p.options.len(), count, "option count for '{input}'");
    }
}

// A channel argument with a digital-bit suffix expands to the eight bit
// lines of that channel, not to the four analog channels.
#[test]
fn digital_group_suffix_expands_to_bits() {
    let outcome = parse("BUS:B1:SOUrce CH2_D<x>");
    let params = detect_parameters(&outcome.command, None);
    let compound = params
        .iter()
        .find(|p| matches!(p.position, ParamPosition::Argument(_)))
        .expect("compound argument detected");
    assert_eq!(compound.kind, ParamKind::Channel);
    assert_eq!(compound.options.len(), 8);
    assert!(compound.options.contains(&"CH2_D0".to_string()));
    assert!(compound.options.contains(&"CH2_D7".to_string()));
}

// Bus slots accept both notations; options stay in the notation written.
#[test]
fn bus_aliases_keep_their_notation() {
    let outcome = parse("BUS:B<x>:SOUrce CH1");
    let params = detect_parameters(&outcome.command, None);
    let bus = params
        .iter()
        .find(|p| p.kind == ParamKind::Bus)
        .expect("bus slot detected");
    assert_eq!(bus.value, "B1");
    assert_eq!(bus.options.len(), 8);
    assert!(bus.options.contains(&"B8".to_string()));
}
