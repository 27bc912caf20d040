//! Stable diagnostic ID constants for the SCPI toolchain.
//!
//! `SCPI1xxx` codes come from the structural parser and parameter detector
//! (never fatal — the parse path degrades instead of failing). `SCPI2xxx`
//! codes come from the program compiler and are always fatal.

/// Argument or mnemonic could not be classified; degraded to `unknown`.
pub const PARSE_UNKNOWN_TOKEN: &str = "SCPI1101";
/// Command header was empty after stripping the query flag and leading colon.
pub const PARSE_EMPTY_HEADER: &str = "SCPI1102";
/// A quoted string argument was not terminated before end of input.
pub const PARSE_UNTERMINATED_STRING: &str = "SCPI1103";
/// Catalog lookup failed for the command header; detection fell back to
/// pattern-only rules.
pub const PARSE_UNKNOWN_COMMAND: &str = "SCPI1201";
/// A substitution targeted a parameter position that does not exist.
pub const PARAM_POSITION_OUT_OF_RANGE: &str = "SCPI1202";

/// Two device bindings resolve to the same canonical connection resource.
pub const COMPILE_RESOURCE_COLLISION: &str = "SCPI2101";
/// A program node is not supported on the resolved device backend.
pub const COMPILE_CAPABILITY_VIOLATION: &str = "SCPI2102";
/// A command's implied device class disagrees with the resolved device.
pub const COMPILE_COMMAND_DEVICE_MISMATCH: &str = "SCPI2103";
/// A variable was assigned but never read.
pub const COMPILE_UNUSED_VARIABLE: &str = "SCPI2104";
/// A device was connected but never used by any operation.
pub const COMPILE_UNUSED_DEVICE: &str = "SCPI2105";
/// A device binding has no resolvable connection endpoint.
pub const COMPILE_UNRESOLVED_DEVICE: &str = "SCPI2106";
/// An operation node could not be resolved to any device context.
pub const COMPILE_NO_DEVICE_CONTEXT: &str = "SCPI2107";

/// Returns the human-readable explanation for a diagnostic code, if known.
pub fn explain(id: &str) -> Option<&'static str> {
    Some(match id {
        PARSE_UNKNOWN_TOKEN => {
            "A token in the command could not be classified as a quoted string, \
             indexed mnemonic, number, or enumeration. Mid-edit commands commonly \
             trigger this; the token is kept with an `unknown` kind."
        }
        PARSE_EMPTY_HEADER => {
            "The command contained no header mnemonics. Check for a stray `?` or \
             a command consisting only of a leading colon."
        }
        PARSE_UNTERMINATED_STRING => {
            "A double-quoted argument ran to the end of the command without a \
             closing quote. The parser keeps the partial content."
        }
        PARSE_UNKNOWN_COMMAND => {
            "The command header is not present in the loaded command catalog. \
             Parameter detection still runs on mnemonic patterns alone."
        }
        PARAM_POSITION_OUT_OF_RANGE => {
            "An in-place parameter substitution referenced a mnemonic or argument \
             index beyond what the command actually contains."
        }
        COMPILE_RESOURCE_COLLISION => {
            "Two device aliases resolve to the same physical connection endpoint. \
             Each instrument needs its own address; give one of the devices a \
             different address or remove the duplicate connect block."
        }
        COMPILE_CAPABILITY_VIOLATION => {
            "The program uses a block that the device's backend cannot execute, \
             for example a query on a write-only socket transport. Move the block \
             to a device on a capable backend or change the device's backend."
        }
        COMPILE_COMMAND_DEVICE_MISMATCH => {
            "The command's subsystem prefix implies a different instrument class \
             than the device it would be sent to. Insert a device-switch block so \
             the command targets the right instrument."
        }
        COMPILE_UNUSED_VARIABLE => {
            "A variable is assigned but never read anywhere in the program. \
             Remove the assignment or add a block that reads the variable."
        }
        COMPILE_UNUSED_DEVICE => {
            "A device is connected but no block ever sends a command to it. \
             Remove the connect block or add an operation targeting the device."
        }
        COMPILE_UNRESOLVED_DEVICE => {
            "A device binding has neither an address nor an explicit resource \
             string, so no connection code can be generated for it."
        }
        COMPILE_NO_DEVICE_CONTEXT => {
            "An instrument operation appears before any connect or device-switch \
             block, so there is no device to send the command to."
        }
        _ => return None,
    })
}
