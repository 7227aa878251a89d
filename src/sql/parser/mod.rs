//! Parses raw SQL SELECT strings into a structured Abstract Syntax Tree.

pub mod ast;
mod parser;
mod scanner;

pub use parser::Parser;
pub use scanner::{Scanner, Token, TokenKind, Value};
