//! Mnemonic parameter detection.
//!
//! Classifies indexed mnemonics and enumerable arguments of a parsed
//! command into domain-typed editable parameters, each with a generated
//! valid-option set and the source span needed for in-place substitution.

pub mod detect;
pub mod kind;
pub mod rules;
