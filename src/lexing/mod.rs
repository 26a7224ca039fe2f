//! The lexer: a finite-state scanner that turns source bytes into a flat
//! stream of [`Token`]s (`spec.md` §4.1). It understands literal syntax and
//! comment/string boundaries but nothing about transforms, scope, or the
//! text-filter pipeline — those live in later stages.

pub mod lexer;
pub mod source;
pub mod token;

pub use lexer::{Error, ErrorDescription, Lexer};
pub use token::{LexedToken, Token};

use crate::common::Position;

/// Lexes the whole of `text` eagerly into a flat token vector, terminated
/// by a single trailing `Token::Eof`. The pipeline is synchronous end to
/// end (`spec.md` §5), so there is no benefit in streaming tokens lazily
/// here; callers that want a cursor should use the returned `Vec` with
/// `common::peekable_buffer::PeekableBuffer`.
pub fn lex_all(text: &str) -> Result<Vec<LexedToken>, Error> {
    let mut lexer = Lexer::new(text);
    let mut tokens = Vec::new();
    loop {
        let lexed = lexer.lex_next()?;
        let is_eof = lexed.token == Token::Eof;
        tokens.push(lexed);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[derive(Debug)]
pub struct PositionedError {
    pub position: Position,
    pub description: ErrorDescription,
}
