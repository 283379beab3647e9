//! PDF object syntax.
//!
//! - `lexer`: byte-level tokenizer
//! - `pdf_parser`: object parser and indirect object reader

pub mod lexer;
pub mod pdf_parser;

pub use lexer::{Keyword, Lexer, Token};
pub use pdf_parser::{PDFParser, parse_indirect_object};
