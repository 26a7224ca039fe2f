//! The flat token vocabulary the lexer produces. Tokens carry just enough
//! structure for the parser to work from; literal *validation* (suffix
//! legality, escape decoding) mostly happens in [`crate::strings`] and in
//! the parser, not here, so that the lexer stays a small finite-state
//! scanner as `spec.md` §4.1 describes.

use crate::common::Position;

#[derive(Clone, Debug, PartialEq)]
pub enum IntegerSuffix {
    I32,
    I64,
    U64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntegerLiteral {
    /// The literal digits as written, sign included, before suffix removal.
    /// Kept as text because overflow checking depends on which suffix is
    /// attached, which the lexer has already seen by the time this is
    /// built.
    pub text: String,
    pub is_hex: bool,
    pub suffix: Option<IntegerSuffix>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloatLiteral {
    pub text: String,
    pub suffix: Option<FloatSuffix>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FloatSuffix {
    F32,
    F64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StringToken {
    /// Raw text between (and including) the quotes, unescaped, as it
    /// appeared in source. Decoding happens in `crate::strings`.
    pub raw: String,
    pub quote: char,
    pub suffix: Option<String>,
    pub is_raw: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Identifier(String),
    SlashPath(String),
    Integer(IntegerLiteral),
    Float(FloatLiteral),
    Bool(bool),
    String(StringToken),

    // Punctuation and operators. The text-filter pipeline is expected to
    // have already rewritten binary/unary operators into canonical calls
    // wherever the `operators` filter is active; these tokens exist so the
    // lexer can still scan source where it is not, and so the parser can
    // reject it with a precise "unexpected token" message rather than a
    // lexical one.
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    LeftAngle,
    RightAngle,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Or,
    And,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    Bang,
    Amp,
    PlusPlus,
    MinusMinus,

    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LexedToken {
    pub token: Token,
    pub position: Position,
}
