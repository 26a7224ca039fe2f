//! The string-literal decoder (`spec.md` §4 "String-literal decoder"
//! component, ~3% of the system). Takes the raw quoted span and suffix the
//! lexer already isolated and produces a decoded `String` plus the
//! recognized [`StringKind`], enforcing suffix legality and the
//! ascii/raw content rules from `spec.md` §3's Invariants.

use std::fmt;

use crate::lexing::token::StringToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringKind {
    Utf8,
    Ascii,
    RawUtf8,
    RawAscii,
}

impl StringKind {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "utf8" => Some(StringKind::Utf8),
            "ascii" => Some(StringKind::Ascii),
            "raw_utf8" => Some(StringKind::RawUtf8),
            "raw_ascii" => Some(StringKind::RawAscii),
            _ => None,
        }
    }

    pub fn is_raw(self) -> bool {
        matches!(self, StringKind::RawUtf8 | StringKind::RawAscii)
    }

    pub fn is_ascii_only(self) -> bool {
        matches!(self, StringKind::Ascii | StringKind::RawAscii)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    MissingSuffix,
    UnknownSuffix(String),
    NonAsciiByte(char),
    QuoteInRawString,
    UnknownEscape(char),
    MalformedHexEscape,
    MalformedUnicodeEscape,
    InvalidUnicodeScalar(u32),
    TruncatedEscape,
    RawSuffixOnNonRawLiteral,
    NonRawSuffixOnRawLiteral,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MissingSuffix => write!(f, "string literal is missing its suffix"),
            DecodeError::UnknownSuffix(s) => write!(f, "unknown string suffix '{}'", s),
            DecodeError::NonAsciiByte(c) => {
                write!(f, "non-ASCII character '{}' in an ascii-suffixed string", c)
            }
            DecodeError::QuoteInRawString => {
                write!(f, "quote character in a raw-suffixed string")
            }
            DecodeError::UnknownEscape(c) => write!(f, "unknown escape sequence '\\{}'", c),
            DecodeError::MalformedHexEscape => write!(f, "malformed \\xHH escape"),
            DecodeError::MalformedUnicodeEscape => write!(f, "malformed \\uHHHH escape"),
            DecodeError::InvalidUnicodeScalar(v) => {
                write!(f, "\\u{{{:x}}} is not a valid Unicode scalar value", v)
            }
            DecodeError::TruncatedEscape => write!(f, "truncated escape sequence"),
            DecodeError::RawSuffixOnNonRawLiteral => {
                write!(f, "raw_utf8/raw_ascii suffix used on a non-raw string literal")
            }
            DecodeError::NonRawSuffixOnRawLiteral => {
                write!(f, "utf8/ascii suffix used on a raw (r\"...\") string literal")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedString {
    pub value: String,
    pub kind: StringKind,
}

/// Decodes a lexed string token: resolves the suffix, decodes escapes
/// (unless raw), and enforces the ascii/raw content invariants from
/// `spec.md` §3.
pub fn decode(token: &StringToken) -> Result<DecodedString, DecodeError> {
    let suffix = token
        .suffix
        .as_deref()
        .ok_or(DecodeError::MissingSuffix)?;
    let kind = StringKind::from_suffix(suffix).ok_or_else(|| DecodeError::UnknownSuffix(suffix.to_owned()))?;

    if kind.is_raw() && !token.is_raw {
        return Err(DecodeError::RawSuffixOnNonRawLiteral);
    }
    if !kind.is_raw() && token.is_raw {
        return Err(DecodeError::NonRawSuffixOnRawLiteral);
    }

    let value = if token.is_raw {
        if token.raw.contains(token.quote) {
            return Err(DecodeError::QuoteInRawString);
        }
        token.raw.clone()
    } else {
        decode_escapes(&token.raw)?
    };

    if kind.is_ascii_only() {
        if let Some(c) = value.chars().find(|c| !c.is_ascii()) {
            return Err(DecodeError::NonAsciiByte(c));
        }
    }

    Ok(DecodedString { value, kind })
}

fn decode_escapes(raw: &str) -> Result<String, DecodeError> {
    let mut chars = raw.chars().peekable();
    let mut out = String::with_capacity(raw.len());
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => return Err(DecodeError::TruncatedEscape),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('x') => {
                let hi = chars.next().ok_or(DecodeError::MalformedHexEscape)?;
                let lo = chars.next().ok_or(DecodeError::MalformedHexEscape)?;
                let byte = u8::from_str_radix(&format!("{}{}", hi, lo), 16)
                    .map_err(|_| DecodeError::MalformedHexEscape)?;
                out.push(byte as char);
            }
            Some('u') => {
                let mut digits = String::with_capacity(4);
                for _ in 0..4 {
                    digits.push(chars.next().ok_or(DecodeError::MalformedUnicodeEscape)?);
                }
                let scalar = u32::from_str_radix(&digits, 16)
                    .map_err(|_| DecodeError::MalformedUnicodeEscape)?;
                let c = char::from_u32(scalar).ok_or(DecodeError::InvalidUnicodeScalar(scalar))?;
                out.push(c);
            }
            Some(other) => return Err(DecodeError::UnknownEscape(other)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(raw: &str, suffix: Option<&str>, is_raw: bool) -> StringToken {
        StringToken {
            raw: raw.to_owned(),
            quote: '"',
            suffix: suffix.map(|s| s.to_owned()),
            is_raw,
        }
    }

    #[test]
    fn missing_suffix_rejected() {
        assert_eq!(decode(&token("hi", None, false)), Err(DecodeError::MissingSuffix));
    }

    #[test]
    fn non_ascii_rejected_under_ascii_suffix() {
        let err = decode(&token("héllo", Some("ascii"), false)).unwrap_err();
        assert!(matches!(err, DecodeError::NonAsciiByte('é')));
    }

    #[test]
    fn quote_in_raw_string_rejected() {
        let err = decode(&token("hi \"there", Some("raw_utf8"), true)).unwrap_err();
        assert_eq!(err, DecodeError::QuoteInRawString);
    }

    #[test]
    fn escapes_decode() {
        let decoded = decode(&token("a\\nb\\t\\x41", Some("utf8"), false)).unwrap();
        assert_eq!(decoded.value, "a\nb\tA");
    }

    #[test]
    fn unicode_escape_decodes() {
        let decoded = decode(&token("\\u0041", Some("utf8"), false)).unwrap();
        assert_eq!(decoded.value, "A");
    }

    #[test]
    fn implicit_utf8_idempotent_once_suffixed() {
        let a = decode(&token("hi", Some("utf8"), false)).unwrap();
        let b = decode(&token("hi", Some("utf8"), false)).unwrap();
        assert_eq!(a, b);
    }
}
