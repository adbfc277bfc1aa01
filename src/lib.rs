/// The lexer takes the choreography source, mapping it into a sequence of
/// tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, resolving names as it goes and
/// producing the symbol table of declarations.
pub mod parser;

/// The projector unrolls the root global type into one local protocol per
/// participant instance.
pub mod projector;

/// The validator checks a program against the projected local protocols.
pub mod validator;

pub mod arith;
pub mod ast;
pub mod error;
pub mod model;
pub mod projection;
pub mod symbol_table;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

use error::PchorError;
use projection::Projection;
use symbol_table::SymbolTable;

/// Parses `src` and projects its root global type.
pub fn compile(src: &str) -> Result<(SymbolTable, Projection), PchorError> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    let table = parser::parse_choreography(src, &mut tokens)?;
    let projection = projector::project(&table)?;
    Ok((table, projection))
}
