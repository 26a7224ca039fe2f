//! The `implicit-i32` and `implicit-utf8` filters (`spec.md` §4.3): bare
//! integer and string literals receive their default suffix.

use super::mask::{MaskKind, Masked, SENTINEL};

const STRING_SUFFIXES: &[&str] = &["utf8", "ascii", "raw_utf8", "raw_ascii"];

pub fn implicit_i32(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        let prev_is_ident = i > 0 && is_ident_continue(chars[i - 1]);
        if c.is_ascii_digit() && !prev_is_ident {
            let start = i;
            let mut is_hex = false;
            if c == '0' && matches!(chars.get(i + 1), Some('x') | Some('X')) {
                is_hex = true;
                i += 2;
                while i < chars.len() && (chars[i].is_ascii_hexdigit() || chars[i] == '_') {
                    i += 1;
                }
            } else {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                    i += 1;
                }
            }
            let mut is_float = false;
            if !is_hex {
                if chars.get(i) == Some(&'.') && matches!(chars.get(i + 1), Some(d) if d.is_ascii_digit())
                {
                    is_float = true;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if matches!(chars.get(i), Some('e') | Some('E')) {
                    let mut j = i + 1;
                    if matches!(chars.get(j), Some('+') | Some('-')) {
                        j += 1;
                    }
                    if matches!(chars.get(j), Some(d) if d.is_ascii_digit()) {
                        is_float = true;
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
            }
            let digits: String = chars[start..i].iter().collect();
            out.push_str(&digits);

            let suffix_start = i;
            let mut j = i;
            while j < chars.len() && is_ident_continue(chars[j]) {
                j += 1;
            }
            let existing_suffix: String = chars[suffix_start..j].iter().collect();
            if !is_float && existing_suffix.is_empty() {
                out.push_str("i32");
            }
            // Suffix (existing or absent) is copied through on the next
            // loop iteration(s) untouched.
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn implicit_utf8(source: &str, masks: &[Masked]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut mask_index = 0usize;
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c == SENTINEL {
            let m = masks.get(mask_index);
            mask_index += 1;
            out.push(SENTINEL);
            i += 1;
            if let Some(Masked {
                kind: MaskKind::StringLiteral { is_raw: false },
                ..
            }) = m
            {
                let has_suffix = matches!(chars.get(i), Some(c) if is_ident_continue(*c))
                    && STRING_SUFFIXES
                        .iter()
                        .any(|s| chars[i..].iter().collect::<String>().starts_with(s));
                if !has_suffix {
                    out.push_str("utf8");
                }
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textfilter::mask::mask;

    #[test]
    fn bare_integers_get_i32() {
        assert_eq!(implicit_i32("a(1, 2i64, 0x10)"), "a(1i32, 2i64, 0x10i32)");
    }

    #[test]
    fn floats_are_left_alone() {
        assert_eq!(implicit_i32("1.5 1e10"), "1.5 1e10");
    }

    #[test]
    fn bare_strings_get_utf8() {
        let (masked, masks) = mask(r#"f("hi", "already"utf8)"#).unwrap();
        let rewritten = implicit_utf8(&masked, &masks);
        let restored = super::super::mask::unmask(&rewritten, &masks);
        assert_eq!(restored, r#"f("hi"utf8, "already"utf8)"#);
    }
}
