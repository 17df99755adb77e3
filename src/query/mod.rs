//! # Query language front end
//!
//! Text → tokens → [`PathPattern`]. Pure functions; no graph access.
//!
//! ```text
//! MATCH (a:Person {name: "Alice"})-[r:KNOWS]->(b)
//! WHERE b.age >= ${min_age}
//! RETURN DISTINCT b.name AS friend, COUNT(*)
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::parse_path_pattern;

use crate::Result;

/// Tokenize and parse a query.
pub fn parse(query: &str) -> Result<PathPattern> {
    let tokens = tokenize(query)?;
    parse_path_pattern(&tokens)
}
