//! SCPI command structure.
//!
//! [`lexer`] splits an argument remainder into spanned tokens, [`parser`]
//! assembles a [`ast::ParsedCommand`] out of header, mnemonics, and
//! classified arguments. Every token keeps its byte span in the original
//! string so editable parameters can be rewritten in place.

pub mod ast;
pub mod lexer;
pub mod parser;
