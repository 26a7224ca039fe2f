//! Masks out comments, string literal bodies, and `include<…>` payloads
//! before any filter walks the text (`spec.md` §4.3). Each masked span is
//! replaced by a single sentinel codepoint so the filters never need to
//! special-case bracket/operator characters that happen to appear inside a
//! string or comment; the original bytes are restored verbatim afterwards.

use crate::common::Position;

/// Private-use codepoint standing in for one masked span. Chosen because it
/// can never appear in valid source text and is never itself an identifier,
/// digit, or punctuation character a filter would look for.
pub const SENTINEL: char = '\u{E000}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskKind {
    Comment,
    StringLiteral { is_raw: bool },
    IncludePayload,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Masked {
    pub kind: MaskKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    UnterminatedComment(Position),
    UnterminatedString(Position),
    UnterminatedIncludePayload(Position),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnterminatedComment(p) => write!(f, "{}: unterminated comment", p),
            Error::UnterminatedString(p) => write!(f, "{}: unterminated string literal", p),
            Error::UnterminatedIncludePayload(p) => {
                write!(f, "{}: unterminated include<…> payload", p)
            }
        }
    }
}

impl std::error::Error for Error {}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    position: Position,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            position: Position::start(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        let next = self.peek_at(1);
        self.pos += 1;
        self.position.advance(c, next);
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }
}

/// Splits `source` into a sentinel-substituted string and the side-table of
/// masked spans, in left-to-right order matching the sentinel occurrences.
pub fn mask(source: &str) -> Result<(String, Vec<Masked>), Error> {
    let mut scanner = Scanner::new(source);
    scan(&mut scanner)
}

fn scan(scanner: &mut Scanner) -> Result<(String, Vec<Masked>), Error> {
    let mut out = String::with_capacity(scanner.chars.len());
    let mut masks = Vec::new();

    while let Some(c) = scanner.peek() {
        if scanner.starts_with("//") {
            let mut text = String::new();
            while let Some(c) = scanner.peek() {
                if c == '\n' {
                    break;
                }
                text.push(c);
                scanner.advance();
            }
            out.push(SENTINEL);
            masks.push(Masked {
                kind: MaskKind::Comment,
                text,
            });
        } else if scanner.starts_with("/*") {
            let start = scanner.position;
            let mut text = String::new();
            text.push(scanner.advance().unwrap());
            text.push(scanner.advance().unwrap());
            let mut depth = 1usize;
            loop {
                if scanner.peek().is_none() {
                    return Err(Error::UnterminatedComment(start));
                }
                if scanner.starts_with("/*") {
                    text.push(scanner.advance().unwrap());
                    text.push(scanner.advance().unwrap());
                    depth += 1;
                } else if scanner.starts_with("*/") {
                    text.push(scanner.advance().unwrap());
                    text.push(scanner.advance().unwrap());
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                } else {
                    text.push(scanner.advance().unwrap());
                }
            }
            out.push(SENTINEL);
            masks.push(Masked {
                kind: MaskKind::Comment,
                text,
            });
        } else if c == '"' || c == '\'' {
            let (text, is_raw) = scan_string(scanner, false)?;
            out.push(SENTINEL);
            masks.push(Masked {
                kind: MaskKind::StringLiteral { is_raw },
                text,
            });
        } else if (c == 'r' || c == 'R')
            && matches!(scanner.peek_at(1), Some('"') | Some('\''))
        {
            let (text, is_raw) = scan_string(scanner, true)?;
            out.push(SENTINEL);
            masks.push(Masked {
                kind: MaskKind::StringLiteral { is_raw },
                text,
            });
        } else if is_include_keyword_at(scanner) {
            // copy the "include" word itself through as ordinary code.
            for _ in 0.."include".len() {
                out.push(scanner.advance().unwrap());
            }
            while matches!(scanner.peek(), Some(c) if c.is_whitespace()) {
                out.push(scanner.advance().unwrap());
            }
            if scanner.peek() == Some('<') {
                let start = scanner.position;
                let mut text = String::new();
                text.push(scanner.advance().unwrap());
                let mut depth = 1usize;
                loop {
                    match scanner.peek() {
                        None => return Err(Error::UnterminatedIncludePayload(start)),
                        Some('/') if scanner.starts_with("/*") => {
                            // a nested comment can hide an embedded '>'.
                            text.push(scanner.advance().unwrap());
                            text.push(scanner.advance().unwrap());
                            loop {
                                if scanner.peek().is_none() {
                                    return Err(Error::UnterminatedComment(start));
                                }
                                if scanner.starts_with("*/") {
                                    text.push(scanner.advance().unwrap());
                                    text.push(scanner.advance().unwrap());
                                    break;
                                }
                                text.push(scanner.advance().unwrap());
                            }
                        }
                        Some('<') => {
                            depth += 1;
                            text.push(scanner.advance().unwrap());
                        }
                        Some('>') => {
                            depth -= 1;
                            text.push(scanner.advance().unwrap());
                            if depth == 0 {
                                break;
                            }
                        }
                        Some(_) => text.push(scanner.advance().unwrap()),
                    }
                }
                out.push(SENTINEL);
                masks.push(Masked {
                    kind: MaskKind::IncludePayload,
                    text,
                });
            }
        } else {
            out.push(scanner.advance().unwrap());
        }
    }

    Ok((out, masks))
}

fn is_include_keyword_at(scanner: &Scanner) -> bool {
    if !scanner.starts_with("include") {
        return false;
    }
    let before_is_ident = scanner.pos > 0
        && is_ident_continue(scanner.chars[scanner.pos - 1]);
    if before_is_ident {
        return false;
    }
    !matches!(scanner.peek_at("include".len()), Some(c) if is_ident_continue(c))
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn scan_string(scanner: &mut Scanner, is_raw_prefixed: bool) -> Result<(String, bool), Error> {
    let start = scanner.position;
    let mut text = String::new();
    if is_raw_prefixed {
        text.push(scanner.advance().unwrap());
    }
    let quote = scanner.advance().unwrap();
    text.push(quote);
    loop {
        match scanner.peek() {
            None => return Err(Error::UnterminatedString(start)),
            Some(c) if c == quote => {
                text.push(scanner.advance().unwrap());
                break;
            }
            Some('\\') if !is_raw_prefixed => {
                text.push(scanner.advance().unwrap());
                match scanner.advance() {
                    Some(c) => text.push(c),
                    None => return Err(Error::UnterminatedString(start)),
                }
            }
            Some(_) => text.push(scanner.advance().unwrap()),
        }
    }
    Ok((text, is_raw_prefixed))
}

/// Restores the original bytes for every sentinel in `text`, in order.
pub fn unmask(text: &str, masks: &[Masked]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut next = masks.iter();
    for c in text.chars() {
        if c == SENTINEL {
            if let Some(m) = next.next() {
                out.push_str(&m.text);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_line_and_block_comments() {
        let (masked, masks) = mask("a // b\nc /* d */ e").unwrap();
        assert_eq!(masked.matches(SENTINEL).count(), 2);
        assert_eq!(masks.len(), 2);
        assert_eq!(unmask(&masked, &masks), "a // b\nc /* d */ e");
    }

    #[test]
    fn masks_strings_and_flags_raw() {
        let (masked, masks) = mask(r#"f("hi", r"raw")"#).unwrap();
        assert_eq!(masks.len(), 2);
        assert!(!matches!(masks[0].kind, MaskKind::StringLiteral { is_raw: true }));
        assert!(matches!(masks[1].kind, MaskKind::StringLiteral { is_raw: true }));
        assert_eq!(unmask(&masked, &masks), r#"f("hi", r"raw")"#);
    }

    #[test]
    fn masks_include_payload_leaving_keyword_visible() {
        let (masked, masks) = mask("include</a/b>").unwrap();
        assert!(masked.starts_with("include"));
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].text, "</a/b>");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(mask("\"abc"), Err(Error::UnterminatedString(_))));
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        assert!(matches!(mask("/* abc"), Err(Error::UnterminatedComment(_))));
    }
}
