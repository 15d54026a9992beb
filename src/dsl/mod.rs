//! Language front end: source text → tokens → AST.

pub mod ast;
pub mod error;
pub mod input;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Program;
pub use error::{ErrorKind, SyntaxError};
pub use lexer::Tokenizer;
pub use parser::Parser;

/// Parse source text into a [`Program`].
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    Parser::new(Tokenizer::new(source)).parse()
}
