//! Markup tokenization shared by the table-of-contents and topic parsers.

mod entities;
mod lexer;

pub use entities::decode_entities;
pub use lexer::{MarkupLexer, Token};
