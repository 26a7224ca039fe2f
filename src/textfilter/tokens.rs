//! A loose tokenizer over the sentinel-substituted source used only by the
//! text-filter pipeline. Deliberately more permissive than
//! `crate::lexing::Lexer`: integer literals need no suffix yet (that is
//! `implicit-i32`'s job), and the multi-char operator tokens the compiler
//! lexer rejects (`+`, `-`, `&&`, …) are exactly what `operators` rewrites.

use super::mask::SENTINEL;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Ident,
    Number,
    Sentinel,
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
    Eq,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    Amp,
    PlusPlus,
    MinusMinus,
    Other,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tok {
    pub kind: Kind,
    /// Whitespace (and any other skipped trivia) preceding this token,
    /// reproduced verbatim so untouched regions keep their formatting.
    pub trivia: String,
    pub text: String,
}

pub fn tokenize(source: &str) -> Vec<Tok> {
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0usize;
    let mut out = Vec::new();

    loop {
        let trivia_start = i;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        let trivia: String = chars[trivia_start..i].iter().collect();

        if i >= chars.len() {
            out.push(Tok {
                kind: Kind::Eof,
                trivia,
                text: String::new(),
            });
            break;
        }

        let c = chars[i];
        let two = |a: char, b: char| i + 1 < chars.len() && chars[i] == a && chars[i + 1] == b;

        let (kind, len) = if c == SENTINEL {
            (Kind::Sentinel, 1)
        } else if c.is_ascii_digit() {
            let start = i;
            let mut j = i;
            while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '.' || chars[j] == '_') {
                // stop a trailing '.' that isn't followed by a digit (method call on a literal is
                // not meaningful here, but guards against swallowing a following `.` token).
                if chars[j] == '.' && !matches!(chars.get(j + 1), Some(d) if d.is_ascii_digit()) {
                    break;
                }
                j += 1;
            }
            (Kind::Number, j - start)
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            let mut j = i;
            while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
            (Kind::Ident, j - start)
        } else if two('|', '|') {
            (Kind::Or, 2)
        } else if two('&', '&') {
            (Kind::And, 2)
        } else if two('=', '=') {
            (Kind::EqEq, 2)
        } else if two('!', '=') {
            (Kind::NotEq, 2)
        } else if two('<', '=') {
            (Kind::LtEq, 2)
        } else if two('>', '=') {
            (Kind::GtEq, 2)
        } else if two('+', '+') {
            (Kind::PlusPlus, 2)
        } else if two('-', '-') {
            (Kind::MinusMinus, 2)
        } else {
            let kind = match c {
                '(' => Kind::OpenParen,
                ')' => Kind::CloseParen,
                '{' => Kind::OpenBrace,
                '}' => Kind::CloseBrace,
                '[' => Kind::OpenBracket,
                ']' => Kind::CloseBracket,
                '<' => Kind::LeftAngle,
                '>' => Kind::RightAngle,
                ',' => Kind::Comma,
                '.' => Kind::Dot,
                ':' => Kind::Colon,
                ';' => Kind::Semicolon,
                '=' => Kind::Eq,
                '+' => Kind::Plus,
                '-' => Kind::Minus,
                '*' => Kind::Star,
                '/' => Kind::Slash,
                '!' => Kind::Bang,
                '&' => Kind::Amp,
                _ => Kind::Other,
            };
            (kind, 1)
        };

        let text: String = chars[i..i + len].iter().collect();
        i += len;
        out.push(Tok { kind, trivia, text });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_multi_char_operators_greedily() {
        let toks = tokenize("a == b && !c");
        let kinds: Vec<_> = toks.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::Ident,
                Kind::EqEq,
                Kind::Ident,
                Kind::And,
                Kind::Bang,
                Kind::Ident,
                Kind::Eof,
            ]
        );
    }

    #[test]
    fn number_without_suffix_is_a_single_token() {
        let toks = tokenize("42");
        assert_eq!(toks[0].kind, Kind::Number);
        assert_eq!(toks[0].text, "42");
    }
}
