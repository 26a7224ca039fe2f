//! The lexer proper. Each `lex_*` method is a reentrant sub-lexer for a
//! particular subcontext of the source; callers higher up have already
//! peeked enough to know which sub-lexer to dispatch to.

use std::fmt;

use crate::common::Position;
use crate::lexing::source::Source;
use crate::lexing::token::{
    FloatLiteral, FloatSuffix, IntegerLiteral, IntegerSuffix, LexedToken, StringToken, Token,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDescription {
    InvalidCharacter(char),
    UnterminatedBlockComment,
    UnterminatedString,
    MissingLiteralSuffix,
    UnknownLiteralSuffix(String),
    IntegerOutOfRange(String),
    MalformedFloat(String),
    PrematureEof,
    Expected(char),
    MalformedStringLiteral(String),
}

impl fmt::Display for ErrorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDescription::InvalidCharacter(c) => write!(f, "invalid character '{}'", c),
            ErrorDescription::UnterminatedBlockComment => write!(f, "unterminated block comment"),
            ErrorDescription::UnterminatedString => write!(f, "unterminated string literal"),
            ErrorDescription::MissingLiteralSuffix => write!(f, "literal is missing its suffix"),
            ErrorDescription::UnknownLiteralSuffix(s) => {
                write!(f, "unknown literal suffix '{}'", s)
            }
            ErrorDescription::IntegerOutOfRange(s) => {
                write!(f, "integer literal out of range: {}", s)
            }
            ErrorDescription::MalformedFloat(s) => write!(f, "malformed float literal: {}", s),
            ErrorDescription::PrematureEof => write!(f, "unexpected end of file"),
            ErrorDescription::Expected(c) => write!(f, "expected '{}'", c),
            ErrorDescription::MalformedStringLiteral(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub position: Position,
    pub description: ErrorDescription,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.description, self.position)
    }
}

impl std::error::Error for Error {}

type TokenResult = Result<Token, Error>;

pub struct Lexer {
    source: Source,
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Lexer {
    pub fn new(text: &str) -> Self {
        Self {
            source: Source::new(text),
        }
    }

    fn fail<T>(&self, description: ErrorDescription) -> Result<T, Error> {
        Err(Error {
            position: self.source.position,
            description,
        })
    }

    fn premature_eof(&self) -> Error {
        Error {
            position: self.source.position,
            description: ErrorDescription::PrematureEof,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), Error> {
        loop {
            match self.source.peek() {
                Some(c) if c.is_whitespace() => {
                    self.source.discard();
                }
                Some('/') if self.source.nth_is(1, '/') => {
                    self.skip_line_comment();
                }
                Some('/') if self.source.nth_is(1, '*') => {
                    self.skip_block_comment()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        self.source.discard_many(2);
        loop {
            match self.source.peek() {
                None | Some('\n') => break,
                Some('\r') if self.source.nth_is(1, '\n') => break,
                Some('\r') => break,
                _ => {
                    self.source.discard();
                }
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), Error> {
        self.source.discard_many(2);
        let mut nesting: usize = 1;
        while nesting >= 1 {
            match self.source.peek() {
                Some('/') if self.source.nth_is(1, '*') => {
                    self.source.discard_many(2);
                    nesting += 1;
                }
                Some('*') if self.source.nth_is(1, '/') => {
                    self.source.discard_many(2);
                    nesting -= 1;
                }
                Some(_) => {
                    self.source.discard();
                }
                None => return self.fail(ErrorDescription::UnterminatedBlockComment),
            }
        }
        Ok(())
    }

    fn lex_identifier_text(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.source.peek() {
            if is_identifier_continue(c) {
                word.push(c);
                self.source.discard();
            } else {
                break;
            }
        }
        word
    }

    fn lex_identifier_or_bool(&mut self) -> Token {
        let word = self.lex_identifier_text();
        match word.as_str() {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            _ => Token::Identifier(word),
        }
    }

    /// `/` immediately followed by an identifier-start character begins a
    /// slash-path; otherwise `/` is the divide punctuation token.
    fn lex_slash_or_path(&mut self) -> Token {
        if self.source.peek_nth(1).map_or(false, is_identifier_start) {
            let mut path = String::new();
            while self.source.next_is('/') && self.source.peek_nth(1).map_or(false, is_identifier_start) {
                path.push('/');
                self.source.discard();
                path.push_str(&self.lex_identifier_text());
            }
            Token::SlashPath(path)
        } else {
            self.source.discard();
            Token::Slash
        }
    }

    fn lex_integer_suffix(&mut self) -> Result<Option<IntegerSuffix>, Error> {
        let mut letters = String::new();
        while self.source.peek().map_or(false, |c| c.is_ascii_alphanumeric()) {
            letters.push(self.source.read().unwrap());
        }
        match letters.as_str() {
            "" => Ok(None),
            "i32" => Ok(Some(IntegerSuffix::I32)),
            "i64" => Ok(Some(IntegerSuffix::I64)),
            "u64" => Ok(Some(IntegerSuffix::U64)),
            other => self.fail(ErrorDescription::UnknownLiteralSuffix(other.to_owned())),
        }
    }

    fn lex_float_suffix(&mut self) -> Result<Option<FloatSuffix>, Error> {
        let mut letters = String::new();
        while self.source.peek().map_or(false, |c| c.is_ascii_alphanumeric()) {
            letters.push(self.source.read().unwrap());
        }
        match letters.as_str() {
            "" => Ok(None),
            "f32" => Ok(Some(FloatSuffix::F32)),
            "f64" => Ok(Some(FloatSuffix::F64)),
            other => self.fail(ErrorDescription::UnknownLiteralSuffix(other.to_owned())),
        }
    }

    fn check_integer_range(&self, text: &str, is_hex: bool, suffix: &IntegerSuffix) -> Result<(), Error> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let magnitude = if is_hex {
            let hex_digits = digits.strip_prefix("0x").unwrap_or(digits);
            u128::from_str_radix(hex_digits, 16)
        } else {
            digits.parse::<u128>()
        }
        .map_err(|_| Error {
            position: self.source.position,
            description: ErrorDescription::IntegerOutOfRange(text.to_owned()),
        })?;

        let in_range = match suffix {
            IntegerSuffix::I32 => {
                if negative {
                    magnitude <= 1u128 << 31
                } else {
                    magnitude <= (1u128 << 31) - 1
                }
            }
            IntegerSuffix::I64 => {
                if negative {
                    magnitude <= 1u128 << 63
                } else {
                    magnitude <= (1u128 << 63) - 1
                }
            }
            IntegerSuffix::U64 => !negative && magnitude <= u64::MAX as u128,
        };

        if in_range {
            Ok(())
        } else {
            self.fail(ErrorDescription::IntegerOutOfRange(text.to_owned()))
        }
    }

    /// Lexes a decimal or hex integer, or a float if a `.` or exponent is
    /// present. A leading `-`/`+` immediately against the digits is fused
    /// into the literal itself (not left for a later `negate` call) so that
    /// e.g. `i32::MIN` is representable as a single token.
    fn lex_number(&mut self) -> TokenResult {
        let mut text = String::new();
        if matches!(self.source.peek(), Some('-') | Some('+')) {
            let sign = self.source.read().unwrap();
            if sign == '-' {
                text.push('-');
            }
        }

        let is_hex = self.source.peek() == Some('0') && self.source.nth_is(1, 'x');
        if is_hex {
            text.push_str("0x");
            self.source.discard_many(2);
            while self.source.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
                text.push(self.source.read().unwrap());
            }
            let suffix = self.lex_integer_suffix()?;
            let suffix = suffix.ok_or_else(|| Error {
                position: self.source.position,
                description: ErrorDescription::MissingLiteralSuffix,
            })?;
            self.check_integer_range(&text, true, &suffix)?;
            return Ok(Token::Integer(IntegerLiteral {
                text,
                is_hex: true,
                suffix: Some(suffix),
            }));
        }

        while self.source.peek().map_or(false, |c| c.is_ascii_digit()) {
            text.push(self.source.read().unwrap());
        }

        let mut is_float = false;
        if self.source.peek() == Some('.') && self.source.peek_nth(1).map_or(false, |c| c.is_ascii_digit())
        {
            is_float = true;
            text.push(self.source.read().unwrap());
            while self.source.peek().map_or(false, |c| c.is_ascii_digit()) {
                text.push(self.source.read().unwrap());
            }
        }

        if matches!(self.source.peek(), Some('e') | Some('E')) {
            let exponent_start = text.len();
            let mut exponent = String::new();
            exponent.push(self.source.read().unwrap());
            if matches!(self.source.peek(), Some('+') | Some('-')) {
                exponent.push(self.source.read().unwrap());
            }
            let mut digits = 0;
            while self.source.peek().map_or(false, |c| c.is_ascii_digit()) {
                exponent.push(self.source.read().unwrap());
                digits += 1;
            }
            if digits == 0 {
                return self.fail(ErrorDescription::MalformedFloat(format!(
                    "{}{} (exponent has no digits)",
                    text, exponent
                )));
            }
            is_float = true;
            text.push_str(&exponent);
            let _ = exponent_start;
        }

        if is_float {
            let suffix = self.lex_float_suffix()?;
            Ok(Token::Float(FloatLiteral { text, suffix }))
        } else {
            let suffix = self.lex_integer_suffix()?;
            let suffix = suffix.ok_or_else(|| Error {
                position: self.source.position,
                description: ErrorDescription::MissingLiteralSuffix,
            })?;
            self.check_integer_range(&text, false, &suffix)?;
            Ok(Token::Integer(IntegerLiteral {
                text,
                is_hex: false,
                suffix: Some(suffix),
            }))
        }
    }

    /// Lexes a quoted string (or raw string after the leading `r`/`R` has
    /// already been consumed by the caller), including its trailing suffix,
    /// then runs `crate::strings::decode` immediately so a malformed escape,
    /// unknown suffix, or non-ASCII byte in an ascii-suffixed literal
    /// surfaces as a lexical error rather than a syntax error from the
    /// parser stage above.
    fn lex_string(&mut self, is_raw: bool) -> TokenResult {
        let start = self.source.position;
        let quote = self.source.read().ok_or_else(|| self.premature_eof())?;
        let mut raw = String::new();
        loop {
            match self.source.peek() {
                None => return self.fail(ErrorDescription::UnterminatedString),
                Some(c) if c == quote => {
                    self.source.discard();
                    break;
                }
                Some('\\') if !is_raw => {
                    raw.push(self.source.read().unwrap());
                    match self.source.read() {
                        Some(escaped) => raw.push(escaped),
                        None => return self.fail(ErrorDescription::UnterminatedString),
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.source.discard();
                }
            }
        }

        let mut suffix_text = String::new();
        while self
            .source
            .peek()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            suffix_text.push(self.source.read().unwrap());
        }

        let token = StringToken {
            raw,
            quote,
            suffix: if suffix_text.is_empty() {
                None
            } else {
                Some(suffix_text)
            },
            is_raw,
        };
        if let Err(e) = crate::strings::decode(&token) {
            return Err(Error {
                position: start,
                description: ErrorDescription::MalformedStringLiteral(e.to_string()),
            });
        }
        Ok(Token::String(token))
    }

    fn lex_symbolic(&mut self) -> TokenResult {
        let c = self.source.read().ok_or_else(|| self.premature_eof())?;
        let token = match c {
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '{' => Token::OpenBrace,
            '}' => Token::CloseBrace,
            '[' => Token::OpenBracket,
            ']' => Token::CloseBracket,
            ',' => Token::Comma,
            '.' => Token::Dot,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '+' if self.source.next_is('+') => {
                self.source.discard();
                Token::PlusPlus
            }
            '+' => Token::Plus,
            '-' if self.source.next_is('-') => {
                self.source.discard();
                Token::MinusMinus
            }
            '-' => Token::Minus,
            '*' => Token::Star,
            '=' if self.source.next_is('=') => {
                self.source.discard();
                Token::EqEq
            }
            '=' => Token::Assign,
            '!' if self.source.next_is('=') => {
                self.source.discard();
                Token::NotEq
            }
            '!' => Token::Bang,
            '<' if self.source.next_is('=') => {
                self.source.discard();
                Token::LtEq
            }
            '<' => Token::LeftAngle,
            '>' if self.source.next_is('=') => {
                self.source.discard();
                Token::GtEq
            }
            '>' => Token::RightAngle,
            '|' if self.source.next_is('|') => {
                self.source.discard();
                Token::Or
            }
            '&' if self.source.next_is('&') => {
                self.source.discard();
                Token::And
            }
            '&' => Token::Amp,
            other => return self.fail(ErrorDescription::InvalidCharacter(other)),
        };
        Ok(token)
    }

    fn lex_non_trivia(&mut self) -> TokenResult {
        match self.source.peek() {
            None => Ok(Token::Eof),
            Some(c) if c == '"' || c == '\'' => self.lex_string(false),
            Some('r') if matches!(self.source.peek_nth(1), Some('"') | Some('\'')) => {
                self.source.discard();
                self.lex_string(true)
            }
            Some('/') => Ok(self.lex_slash_or_path()),
            Some(c) if is_identifier_start(c) => Ok(self.lex_identifier_or_bool()),
            Some(c)
                if c.is_ascii_digit()
                    || ((c == '-' || c == '+') && self.source.peek_nth(1).map_or(false, |n| n.is_ascii_digit())) =>
            {
                self.lex_number()
            }
            Some(c) if c.is_ascii() => self.lex_symbolic(),
            Some(c) => self.fail(ErrorDescription::InvalidCharacter(c)),
        }
    }

    pub fn lex_next(&mut self) -> Result<LexedToken, Error> {
        self.skip_trivia()?;
        let position = self.source.position;
        let token = self.lex_non_trivia()?;
        Ok(LexedToken { token, position })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(s: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(s);
        let mut out = Vec::new();
        loop {
            let t = lexer.lex_next().unwrap();
            let done = t.token == Token::Eof;
            out.push(t.token);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_identifiers_and_booleans() {
        assert_eq!(
            tokens_of("foo true bar_2 false"),
            vec![
                Token::Identifier("foo".into()),
                Token::Bool(true),
                Token::Identifier("bar_2".into()),
                Token::Bool(false),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_slash_paths_distinct_from_divide() {
        assert_eq!(
            tokens_of("/demo/widget"),
            vec![Token::SlashPath("/demo/widget".into()), Token::Eof]
        );
        assert_eq!(tokens_of("/ 2"), vec![Token::Slash, Token::Eof]);
    }

    #[test]
    fn integer_literal_requires_suffix() {
        let err = Lexer::new("1").lex_next().unwrap_err();
        assert_eq!(err.description, ErrorDescription::MissingLiteralSuffix);
    }

    #[test]
    fn i32_boundary_values() {
        assert!(matches!(
            tokens_of("-2147483648i32")[0],
            Token::Integer(ref i) if i.text == "-2147483648"
        ));
        let err = Lexer::new("2147483648i32").lex_next().unwrap_err();
        assert!(matches!(err.description, ErrorDescription::IntegerOutOfRange(_)));
    }

    #[test]
    fn hex_i32_boundary_values() {
        assert!(Lexer::new("-0x80000000i32").lex_next().is_ok());
        let err = Lexer::new("0x80000000i32").lex_next().unwrap_err();
        assert!(matches!(err.description, ErrorDescription::IntegerOutOfRange(_)));
    }

    #[test]
    fn negative_u64_rejected() {
        let err = Lexer::new("-1u64").lex_next().unwrap_err();
        assert!(matches!(err.description, ErrorDescription::IntegerOutOfRange(_)));
    }

    #[test]
    fn float_requires_exponent_digits() {
        let err = Lexer::new("1.0e").lex_next().unwrap_err();
        assert!(matches!(err.description, ErrorDescription::MalformedFloat(_)));
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = Lexer::new("/* never closes").lex_next().unwrap_err();
        assert_eq!(err.description, ErrorDescription::UnterminatedBlockComment);
    }

    #[test]
    fn nested_block_comments_are_supported() {
        assert_eq!(tokens_of("/* outer /* inner */ still outer */"), vec![Token::Eof]);
    }

    #[test]
    fn non_ascii_identifier_byte_rejected() {
        // 'h' lexes as an identifier; the following 'é' is then its own
        // invalid-character token on the next call.
        let mut lexer = Lexer::new("héllo");
        let first = lexer.lex_next().unwrap();
        assert_eq!(first.token, Token::Identifier("h".into()));
        let second = lexer.lex_next().unwrap_err();
        assert!(matches!(second.description, ErrorDescription::InvalidCharacter('é')));
    }
}
